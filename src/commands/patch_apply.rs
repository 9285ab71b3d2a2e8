use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::patch::{
    apply_rules, check_no_backups, check_sentinels, resolve_targets, write_with_backup,
    PatchError, TransformOutcome, DEFAULT_MAX_DIFF_LINES,
};
use crate::targets::{Profile, TargetFile, MUTTER_REPOSITORY};
use crate::utils::diff::DiffReport;
use crate::utils::version::{detect_version, is_compatible};

/// Knobs for a single run, built from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Validate and show diffs, but create no backups and write nothing
    pub dry_run: bool,
    pub max_diff_lines: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions {
            dry_run: false,
            max_diff_lines: DEFAULT_MAX_DIFF_LINES,
        }
    }
}

/// What happened to one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Patched {
        key: &'static str,
        path: PathBuf,
        backup: PathBuf,
        applied: Vec<&'static str>,
    },
    /// Dry run: the file validated and would have been rewritten
    WouldPatch {
        key: &'static str,
        path: PathBuf,
        applied: Vec<&'static str>,
    },
    AlreadyPatched { key: &'static str, path: PathBuf },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Patched { path, .. }
            | FileOutcome::WouldPatch { path, .. }
            | FileOutcome::AlreadyPatched { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplySummary {
    pub detected_version: Option<String>,
    pub files: Vec<FileOutcome>,
}

impl ApplySummary {
    pub fn patched(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|f| matches!(f, FileOutcome::Patched { .. }))
    }

    pub fn all_already_patched(&self) -> bool {
        self.files
            .iter()
            .all(|f| matches!(f, FileOutcome::AlreadyPatched { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressAction {
    Validating,
    Transforming,
    BackingUp,
    Previewing,
}

fn format_action(action: ProgressAction) -> &'static str {
    match action {
        ProgressAction::Validating => "Validating",
        ProgressAction::Transforming => "Transforming",
        ProgressAction::BackingUp => "Backing up",
        ProgressAction::Previewing => "Previewing",
    }
}

fn report(e: io::Error) -> PatchError {
    PatchError::Report {
        reason: e.to_string(),
    }
}

fn progress<W: Write>(
    out: &mut W,
    action: ProgressAction,
    index: usize,
    total: usize,
    file: &str,
) -> Result<(), PatchError> {
    writeln!(out, "{} [{}/{}]: {}", format_action(action), index + 1, total, file).map_err(report)
}

struct Prepared<'a> {
    target: &'a TargetFile,
    path: PathBuf,
    original: String,
}

/// Patch the source tree at `root` according to `profile`.
///
/// Workflow:
/// 1. Detect the checked-out version (advisory only)
/// 2. Check every target file exists
/// 3. Refuse to run if any backup already exists
/// 4. Read and validate sentinels for every file
/// 5. Transform every file
/// 6. Back up and write each changed file, printing its diff
///
/// Every check in steps 2-5 runs for all files before the first write. There is
/// no rollback if a write fails after an earlier file was written; the backups
/// are the recovery path.
pub fn run<W: Write>(
    root: &Path,
    profile: &Profile,
    options: &ApplyOptions,
    out: &mut W,
) -> Result<ApplySummary, PatchError> {
    let detected_version = detect_version(root);
    match &detected_version {
        Some(version) => {
            writeln!(out, "[info] Detected version: {}", version).map_err(report)?;
            if !is_compatible(version, profile) {
                warn!(detected = %version, expected = profile.version, "version mismatch");
                writeln!(
                    out,
                    "[WARN] This patcher targets {}, but detected {}",
                    profile.version, version
                )
                .map_err(report)?;
                writeln!(
                    out,
                    "       Proceeding anyway, but sentinels may fail if layout differs."
                )
                .map_err(report)?;
            }
        }
        None => info!("could not detect the source tree version"),
    }

    let paths = resolve_targets(root, profile)?;
    check_no_backups(&paths)?;

    let total = profile.targets.len();
    let mut prepared = Vec::with_capacity(total);
    for (index, (target, path)) in profile.targets.iter().zip(paths).enumerate() {
        progress(out, ProgressAction::Validating, index, total, target.relative_path)?;
        let original = fs::read_to_string(&path).map_err(|e| PatchError::ReadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        check_sentinels(&path, &original, target)?;
        prepared.push(Prepared {
            target,
            path,
            original,
        });
    }

    writeln!(
        out,
        "\n[OK] Source tree validated against mutter {} layout\n",
        profile.version
    )
    .map_err(report)?;

    let mut transformed: Vec<(Prepared<'_>, TransformOutcome)> = Vec::with_capacity(total);
    for (index, file) in prepared.into_iter().enumerate() {
        progress(out, ProgressAction::Transforming, index, total, file.target.relative_path)?;
        let outcome = apply_rules(&file.path, &file.original, file.target)?;
        info!(
            file = file.target.key,
            applied = ?outcome.applied,
            already_patched = outcome.already_patched,
            "transformed"
        );
        transformed.push((file, outcome));
    }

    let mut files = Vec::with_capacity(total);
    for (index, (file, outcome)) in transformed.into_iter().enumerate() {
        let key = file.target.key;
        if !outcome.changed() {
            writeln!(out, "[SKIP] {}: already patched", file.path.display()).map_err(report)?;
            files.push(FileOutcome::AlreadyPatched {
                key,
                path: file.path,
            });
            continue;
        }

        let label = file
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.target.relative_path.to_string());
        let diff = DiffReport::new(&label, &file.original, &outcome.content);

        if options.dry_run {
            progress(out, ProgressAction::Previewing, index, total, file.target.relative_path)?;
            writeln!(out, "[DRY RUN] Would patch {}", file.path.display()).map_err(report)?;
            diff.write_to(out, options.max_diff_lines).map_err(report)?;
            files.push(FileOutcome::WouldPatch {
                key,
                path: file.path,
                applied: outcome.applied,
            });
            continue;
        }

        progress(out, ProgressAction::BackingUp, index, total, file.target.relative_path)?;
        let backup = write_with_backup(&file.path, &outcome.content)?;
        writeln!(out, "[OK] Patched {}", file.path.display()).map_err(report)?;
        writeln!(out, "     Backup: {}", backup.display()).map_err(report)?;
        diff.write_to(out, options.max_diff_lines).map_err(report)?;
        files.push(FileOutcome::Patched {
            key,
            path: file.path,
            backup,
            applied: outcome.applied,
        });
    }

    Ok(ApplySummary {
        detected_version,
        files,
    })
}

/// Print the list of applied changes and the manual build/install steps.
pub fn write_completion<W: Write>(
    out: &mut W,
    profile: &Profile,
    root: &Path,
    summary: &ApplySummary,
) -> io::Result<()> {
    let banner = "=".repeat(80);
    writeln!(out)?;
    writeln!(out, "{}", banner)?;
    writeln!(out, "PATCHING COMPLETE")?;
    writeln!(out, "{}", banner)?;
    writeln!(out)?;
    writeln!(out, "Patches applied:")?;

    let mut number = 1;
    for file in summary.patched() {
        let FileOutcome::Patched { key, applied, .. } = file else {
            continue;
        };
        let Some(target) = profile.targets.iter().find(|t| t.key == *key) else {
            continue;
        };
        for name in applied {
            if let Some(rule) = target.rules.iter().find(|r| r.name() == *name) {
                writeln!(out, "  {}. {}", number, rule.summary())?;
                number += 1;
            }
        }
    }

    write!(
        out,
        "
Next steps:

1) Install build dependencies:
   sudo apt build-dep mutter

2) Build mutter:
   cd {root}
   meson setup build --prefix=/usr --buildtype=release
   ninja -C build

3) Install (backup your system first!):
   sudo ninja -C build install

4) Restart GNOME Shell:
   - Log out and log back in, OR
   - killall -3 gnome-shell (on X11), OR
   - Reboot

5) Prevent apt from overwriting your patched mutter:
   sudo apt-mark hold mutter mutter-common libmutter-14-0

To revert:
   sudo apt-mark unhold mutter mutter-common libmutter-14-0
   sudo apt install --reinstall mutter mutter-common libmutter-14-0

Upstream sources for comparison: {upstream}
",
        root = root.display(),
        upstream = profile.upstream,
    )
}

/// Print the closing report for a successful run.
///
/// An already-patched tree is reported as such even in a dry run. Otherwise a
/// dry run lists the files it would patch and a real run prints
/// [`write_completion`].
pub fn write_summary<W: Write>(
    out: &mut W,
    profile: &Profile,
    root: &Path,
    options: &ApplyOptions,
    summary: &ApplySummary,
) -> io::Result<()> {
    if summary.all_already_patched() {
        return writeln!(out, "\nNothing to do: all target files are already patched.");
    }
    if !options.dry_run {
        return write_completion(out, profile, root, summary);
    }

    writeln!(
        out,
        "\nDry run complete: nothing was written. Files that would be patched:"
    )?;
    for file in &summary.files {
        if matches!(file, FileOutcome::WouldPatch { .. }) {
            writeln!(out, "  - {}", file.path().display())?;
        }
    }
    Ok(())
}

/// Usage footer: where to get a matching source tree.
pub fn checkout_hint(profile: &Profile) -> String {
    format!(
        "This patcher targets mutter {version} specifically.\n\
         Clone and checkout:\n  \
         git clone {repo}.git\n  \
         cd mutter && git checkout {version}",
        version = profile.version,
        repo = MUTTER_REPOSITORY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{backup_path, PATCH_TAG};
    use crate::targets::test_support::{pristine, write_pristine_tree};
    use tempfile::tempdir;

    const DATA_DEVICE: &str = "src/wayland/meta-wayland-data-device.c";
    const DATA_DEVICE_PRIMARY: &str = "src/wayland/meta-wayland-data-device-primary.c";

    fn apply(root: &Path, options: &ApplyOptions) -> (Result<ApplySummary, PatchError>, String) {
        let profile = Profile::mutter_46_2().unwrap();
        let mut out = Vec::new();
        let result = run(root, &profile, options, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn snapshot(root: &Path) -> Vec<Vec<u8>> {
        [DATA_DEVICE, DATA_DEVICE_PRIMARY]
            .iter()
            .map(|p| fs::read(root.join(p)).unwrap())
            .collect()
    }

    fn no_backups(root: &Path) -> bool {
        [DATA_DEVICE, DATA_DEVICE_PRIMARY]
            .iter()
            .all(|p| !backup_path(&root.join(p)).exists())
    }

    #[test]
    fn patches_pristine_tree() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());

        let (result, output) = apply(dir.path(), &ApplyOptions::default());
        let summary = result.unwrap();

        assert_eq!(summary.detected_version.as_deref(), Some("46.2"));
        assert_eq!(summary.patched().count(), 2);
        let files = [
            (DATA_DEVICE, "data-device"),
            (DATA_DEVICE_PRIMARY, "data-device-primary"),
        ];
        for (relative, key) in files {
            let path = dir.path().join(relative);
            let backup = backup_path(&path);
            assert_eq!(fs::read_to_string(&backup).unwrap(), pristine(key));
            assert!(fs::read_to_string(&path).unwrap().contains(PATCH_TAG));
        }
        assert!(output.contains("[DIFF] meta-wayland-data-device.c:"));
        assert!(output.contains("[DIFF] meta-wayland-data-device-primary.c:"));
        assert!(output.contains("[OK] Source tree validated against mutter 46.2 layout"));
        assert!(output.contains(&format!("Validating [2/2]: {}", DATA_DEVICE_PRIMARY)));
    }

    #[test]
    fn second_run_refuses_existing_backups() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        apply(dir.path(), &ApplyOptions::default()).0.unwrap();
        let patched = snapshot(dir.path());
        let backups_before: Vec<_> = [DATA_DEVICE, DATA_DEVICE_PRIMARY]
            .iter()
            .map(|p| fs::read(backup_path(&dir.path().join(p))).unwrap())
            .collect();

        let (result, _) = apply(dir.path(), &ApplyOptions::default());

        match result {
            Err(PatchError::BackupsExist(backups)) => assert_eq!(backups.len(), 2),
            other => panic!("expected BackupsExist, got {:?}", other),
        }
        assert_eq!(snapshot(dir.path()), patched);
        let backups_after: Vec<_> = [DATA_DEVICE, DATA_DEVICE_PRIMARY]
            .iter()
            .map(|p| fs::read(backup_path(&dir.path().join(p))).unwrap())
            .collect();
        assert_eq!(backups_after, backups_before);
    }

    #[test]
    fn any_existing_backup_blocks_every_file() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let stray = backup_path(&dir.path().join(DATA_DEVICE_PRIMARY));
        fs::write(&stray, b"an older backup").unwrap();
        let before = snapshot(dir.path());

        let (result, _) = apply(dir.path(), &ApplyOptions::default());

        assert_eq!(result, Err(PatchError::BackupsExist(vec![stray.clone()])));
        assert_eq!(snapshot(dir.path()), before);
        assert!(!backup_path(&dir.path().join(DATA_DEVICE)).exists());
        assert_eq!(fs::read(&stray).unwrap(), b"an older backup");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_backup_symlink_blocks_every_file() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let stray = backup_path(&dir.path().join(DATA_DEVICE_PRIMARY));
        std::os::unix::fs::symlink(dir.path().join("nowhere.c"), &stray).unwrap();
        let before = snapshot(dir.path());

        let (result, _) = apply(dir.path(), &ApplyOptions::default());

        assert_eq!(result, Err(PatchError::BackupsExist(vec![stray])));
        assert_eq!(snapshot(dir.path()), before);
        assert!(fs::symlink_metadata(backup_path(&dir.path().join(DATA_DEVICE))).is_err());
    }

    #[test]
    fn missing_sentinel_aborts_before_any_write() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let primary = dir.path().join(DATA_DEVICE_PRIMARY);
        let drifted = pristine("data-device-primary").replace(
            "void\nmeta_wayland_data_device_primary_sync_focus (",
            "void\nmeta_wayland_data_device_primary_focus_changed (",
        );
        fs::write(&primary, drifted).unwrap();
        let before = snapshot(dir.path());

        let (result, _) = apply(dir.path(), &ApplyOptions::default());

        match result {
            Err(PatchError::SentinelNotFound { path, pattern, .. }) => {
                assert_eq!(path, primary);
                assert!(pattern.contains("meta_wayland_data_device_primary_sync_focus"));
            }
            other => panic!("expected SentinelNotFound, got {:?}", other),
        }
        assert_eq!(snapshot(dir.path()), before);
        assert!(no_backups(dir.path()));
    }

    #[test]
    fn unmatched_rule_aborts_before_any_write() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let primary = dir.path().join(DATA_DEVICE_PRIMARY);
        // sentinels still pass, but the notification loop no longer has the 46.2 shape
        let drifted = pristine("data-device-primary").replacen(
            "  if (!focus_client)\n    return;\n",
            "  if (focus_client == NULL)\n    return;\n",
            1,
        );
        fs::write(&primary, drifted).unwrap();
        let before = snapshot(dir.path());

        let (result, _) = apply(dir.path(), &ApplyOptions::default());

        match result {
            Err(PatchError::RuleNotMatched { path, rule, .. }) => {
                assert_eq!(path, primary);
                assert_eq!(rule, "notify-all-clients");
            }
            other => panic!("expected RuleNotMatched, got {:?}", other),
        }
        assert_eq!(snapshot(dir.path()), before);
        assert!(no_backups(dir.path()));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        fs::remove_file(dir.path().join(DATA_DEVICE)).unwrap();

        let (result, _) = apply(dir.path(), &ApplyOptions::default());

        assert!(matches!(result, Err(PatchError::MissingFile { .. })));
        assert!(no_backups(dir.path()));
    }

    #[test]
    fn already_patched_tree_is_skipped() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        apply(dir.path(), &ApplyOptions::default()).0.unwrap();
        for relative in [DATA_DEVICE, DATA_DEVICE_PRIMARY] {
            fs::remove_file(backup_path(&dir.path().join(relative))).unwrap();
        }
        let patched = snapshot(dir.path());

        let (result, output) = apply(dir.path(), &ApplyOptions::default());
        let summary = result.unwrap();

        assert!(summary.all_already_patched());
        assert_eq!(snapshot(dir.path()), patched);
        assert!(no_backups(dir.path()));
        assert!(output.contains(": already patched"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let before = snapshot(dir.path());
        let options = ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        };

        let (result, output) = apply(dir.path(), &options);
        let summary = result.unwrap();

        assert_eq!(snapshot(dir.path()), before);
        assert!(no_backups(dir.path()));
        assert!(summary
            .files
            .iter()
            .all(|f| matches!(f, FileOutcome::WouldPatch { .. })));
        assert!(output.contains("[DRY RUN] Would patch"));
        assert!(output.contains("+      /* Notify unfocused clients (resource_list) */"));
    }

    #[test]
    fn diff_output_is_truncated() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let options = ApplyOptions {
            dry_run: true,
            max_diff_lines: 5,
        };

        let (result, output) = apply(dir.path(), &options);

        result.unwrap();
        assert_eq!(output.matches("  ... (diff truncated)").count(), 2);
    }

    #[test]
    fn other_major_version_only_warns() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        fs::write(
            dir.path().join("meson.build"),
            "project('mutter', 'c', version: '45.0')\n",
        )
        .unwrap();

        let (result, output) = apply(dir.path(), &ApplyOptions::default());

        assert_eq!(result.unwrap().patched().count(), 2);
        assert!(output.contains("[WARN] This patcher targets 46.2, but detected 45.0"));
    }

    #[test]
    fn completion_lists_applied_changes() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let profile = Profile::mutter_46_2().unwrap();
        let mut out = Vec::new();
        let summary = run(dir.path(), &profile, &ApplyOptions::default(), &mut out).unwrap();

        let mut banner = Vec::new();
        write_completion(&mut banner, &profile, dir.path(), &summary).unwrap();
        let banner = String::from_utf8(banner).unwrap();

        assert!(banner.contains("PATCHING COMPLETE"));
        assert!(banner.contains("  1. data_device_set_selection(): removed focus check"));
        assert!(banner.contains("  4. owner_changed_cb() (primary): now notifies ALL clients"));
        assert!(banner.contains(&format!("   cd {}", dir.path().display())));
    }

    fn summary_text(root: &Path, options: &ApplyOptions, summary: &ApplySummary) -> String {
        let profile = Profile::mutter_46_2().unwrap();
        let mut out = Vec::new();
        write_summary(&mut out, &profile, root, options, summary).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn dry_run_summary_lists_pending_files() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        let options = ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        };
        let summary = apply(dir.path(), &options).0.unwrap();

        let text = summary_text(dir.path(), &options, &summary);

        assert!(text.contains("Files that would be patched:"));
        assert!(text.contains(&format!("  - {}", dir.path().join(DATA_DEVICE).display())));
        assert!(!text.contains("PATCHING COMPLETE"));
    }

    #[test]
    fn dry_run_on_patched_tree_has_nothing_to_do() {
        let dir = tempdir().unwrap();
        write_pristine_tree(dir.path());
        apply(dir.path(), &ApplyOptions::default()).0.unwrap();
        for relative in [DATA_DEVICE, DATA_DEVICE_PRIMARY] {
            fs::remove_file(backup_path(&dir.path().join(relative))).unwrap();
        }
        let options = ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        };
        let summary = apply(dir.path(), &options).0.unwrap();

        let text = summary_text(dir.path(), &options, &summary);

        assert_eq!(
            text,
            "\nNothing to do: all target files are already patched.\n"
        );
    }

    #[test]
    fn checkout_hint_names_version() {
        let profile = Profile::mutter_46_2().unwrap();
        let hint = checkout_hint(&profile);

        assert!(hint.contains("git clone https://gitlab.gnome.org/GNOME/mutter.git"));
        assert!(hint.contains("git checkout 46.2"));
    }
}
