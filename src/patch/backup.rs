//! Backup-then-write for a single target file.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::patch::constants::BACKUP_EXTENSION;
use crate::patch::error::PatchError;
use crate::utils::hash::{hash_bytes, hash_file};

/// Path of the backup artifact for `path` (`<path>.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_EXTENSION);
    PathBuf::from(name)
}

/// Back `path` up to `<path>.bak`, then overwrite it with `new_content`.
///
/// The backup is created exclusively: an existing backup is never replaced and
/// yields [`PatchError::BackupsExist`]. The backup is re-read and compared
/// against the original bytes before the original is touched.
///
/// Returns the backup path.
pub fn write_with_backup(path: &Path, new_content: &str) -> Result<PathBuf, PatchError> {
    let backup = backup_path(path);

    let original = fs::read(path).map_err(|e| PatchError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&backup)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => PatchError::BackupsExist(vec![backup.clone()]),
            _ => PatchError::BackupFailed {
                path: backup.clone(),
                reason: e.to_string(),
            },
        })?;

    let created = CreatedBackup::new(&backup);
    let backup_failed = |e: io::Error| PatchError::BackupFailed {
        path: backup.clone(),
        reason: e.to_string(),
    };
    file.write_all(&original).map_err(backup_failed)?;
    file.sync_all().map_err(backup_failed)?;
    drop(file);

    let permissions = fs::metadata(path).map_err(backup_failed)?.permissions();
    fs::set_permissions(&backup, permissions).map_err(backup_failed)?;

    let expected = hash_bytes(&original);
    let actual = hash_file(&backup).map_err(backup_failed)?;
    if expected != actual {
        return Err(PatchError::BackupMismatch {
            path: backup.clone(),
            expected,
            actual,
        });
    }
    created.keep();
    debug!(backup = %backup.display(), hash = %expected, "backup verified");

    fs::write(path, new_content).map_err(|e| PatchError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(backup)
}

/// A backup created by this run, removed on drop unless verified and kept.
struct CreatedBackup<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> CreatedBackup<'a> {
    fn new(path: &'a Path) -> Self {
        CreatedBackup { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for CreatedBackup<'_> {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => debug!(backup = %self.path.display(), "removed incomplete backup"),
            Err(e) => debug!(
                backup = %self.path.display(),
                error = %e,
                "could not remove incomplete backup"
            ),
        }
    }
}
