pub mod backup;
mod constants;
mod error;
pub mod transform;
pub mod validate;

// Re-export public items
pub use backup::{backup_path, write_with_backup};
pub use constants::{
    BACKUP_EXTENSION, DEFAULT_MAX_DIFF_LINES, PATCH_TAG, VERSION_PROBE_POLL,
    VERSION_PROBE_TIMEOUT,
};
pub use error::PatchError;
pub use transform::{apply_rules, RuleSpec, TransformOutcome, TransformRule};
pub use validate::{check_no_backups, check_sentinels, resolve_targets, Sentinel};
