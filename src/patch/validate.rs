use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::patch::backup::backup_path;
use crate::patch::error::PatchError;
use crate::targets::{Profile, TargetFile};

/// A pattern whose presence confirms a file matches the expected layout.
///
/// Compiled in multi-line mode so `^` anchors at the start of any line.
#[derive(Debug, Clone)]
pub struct Sentinel {
    pattern: &'static str,
    regex: Regex,
}

impl Sentinel {
    pub fn new(pattern: &'static str) -> Result<Self, PatchError> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|e| PatchError::InvalidPattern {
                name: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Sentinel { pattern, regex })
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    pub fn is_present(&self, content: &str) -> bool {
        self.regex.is_match(content)
    }
}

/// Verify every sentinel of `target` occurs in `content`.
///
/// Stops at the first missing sentinel.
pub fn check_sentinels(path: &Path, content: &str, target: &TargetFile) -> Result<(), PatchError> {
    for sentinel in &target.sentinels {
        if !sentinel.is_present(content) {
            return Err(PatchError::SentinelNotFound {
                path: path.to_path_buf(),
                pattern: sentinel.pattern().to_string(),
                reference: target.reference.clone(),
            });
        }
        debug!(file = target.key, pattern = sentinel.pattern(), "sentinel found");
    }
    Ok(())
}

/// Join every target's relative path onto `root` and check it is a regular file.
///
/// Returned paths are in profile order.
pub fn resolve_targets(root: &Path, profile: &Profile) -> Result<Vec<PathBuf>, PatchError> {
    let mut paths = Vec::with_capacity(profile.targets.len());
    for target in &profile.targets {
        let path = root.join(target.relative_path);
        if !path.is_file() {
            return Err(PatchError::MissingFile {
                path,
                reference: target.reference.clone(),
            });
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Fail if a backup artifact already exists for any of `paths`.
///
/// All paths are checked so the error lists every offending backup. Any
/// directory entry counts, dangling symlinks included, since the backup is
/// later opened with `create_new`.
pub fn check_no_backups(paths: &[PathBuf]) -> Result<(), PatchError> {
    let existing: Vec<PathBuf> = paths
        .iter()
        .map(|path| backup_path(path))
        .filter(|backup| fs::symlink_metadata(backup).is_ok())
        .collect();

    if existing.is_empty() {
        Ok(())
    } else {
        Err(PatchError::BackupsExist(existing))
    }
}
