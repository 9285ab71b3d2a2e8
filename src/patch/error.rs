use std::fmt;
use std::path::PathBuf;

/// Error type for patch operations.
///
/// Every variant is fatal: the run stops at the first one and nothing after it
/// is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// A file declared by the profile is missing from the source tree
    MissingFile { path: PathBuf, reference: String },
    /// One or more backup artifacts already exist
    BackupsExist(Vec<PathBuf>),
    /// Reading a target file failed
    ReadFailed { path: PathBuf, reason: String },
    /// A sentinel pattern was not found in a target file
    SentinelNotFound {
        path: PathBuf,
        pattern: String,
        reference: String,
    },
    /// A transform rule matched nothing
    RuleNotMatched {
        path: PathBuf,
        rule: &'static str,
        location: String,
        reference: String,
    },
    /// A sentinel or rule pattern failed to compile
    InvalidPattern { name: String, reason: String },
    /// A rule's replacement does not carry the patch marker
    MissingMarker { rule: &'static str },
    /// Creating the backup artifact failed
    BackupFailed { path: PathBuf, reason: String },
    /// The backup artifact does not match the original bytes
    BackupMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    /// Writing the patched content failed
    WriteFailed { path: PathBuf, reason: String },
    /// Writing the console report failed
    Report { reason: String },
}

impl PatchError {
    /// Upstream link to compare the expected layout against, if the error is
    /// tied to a particular target file.
    pub fn reference(&self) -> Option<&str> {
        match self {
            PatchError::MissingFile { reference, .. }
            | PatchError::SentinelNotFound { reference, .. }
            | PatchError::RuleNotMatched { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::MissingFile { path, .. } => {
                write!(f, "missing required file: {}", path.display())
            }
            PatchError::BackupsExist(backups) => {
                writeln!(f, "refusing to proceed because backups already exist:")?;
                for backup in backups {
                    writeln!(f, "  - {}", backup.display())?;
                }
                write!(f, "Move/rename these .bak files and re-run.")
            }
            PatchError::ReadFailed { path, reason } => {
                write!(f, "failed to read '{}': {}", path.display(), reason)
            }
            PatchError::SentinelNotFound { path, pattern, .. } => {
                write!(
                    f,
                    "sentinel not found in {}:\n  pattern: {}\n\
                     File does not match the expected layout.",
                    path.display(),
                    pattern
                )
            }
            PatchError::RuleNotMatched {
                path,
                rule,
                location,
                ..
            } => {
                write!(
                    f,
                    "rule '{}' found nothing to patch in {}\nExpected pattern at {}",
                    rule,
                    path.display(),
                    location
                )
            }
            PatchError::InvalidPattern { name, reason } => {
                write!(f, "invalid pattern '{}': {}", name, reason)
            }
            PatchError::MissingMarker { rule } => {
                write!(f, "replacement for rule '{}' does not embed the patch marker", rule)
            }
            PatchError::BackupFailed { path, reason } => {
                write!(f, "backup failed for '{}': {}", path.display(), reason)
            }
            PatchError::BackupMismatch {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "backup verification failed for '{}': expected hash {}, got {}",
                    path.display(),
                    expected,
                    actual
                )
            }
            PatchError::WriteFailed { path, reason } => {
                write!(f, "failed to write patched file '{}': {}", path.display(), reason)
            }
            PatchError::Report { reason } => {
                write!(f, "failed to write report: {}", reason)
            }
        }
    }
}

impl std::error::Error for PatchError {}
