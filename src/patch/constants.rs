use std::time::Duration;

/// Token embedded in every replacement block; its presence means "already patched"
pub const PATCH_TAG: &str = "VMWARE_CLIPBOARD_PATCH";
/// Suffix appended to a target's file name to form its backup path
pub const BACKUP_EXTENSION: &str = ".bak";
/// Diff lines shown per file before the output is truncated
pub const DEFAULT_MAX_DIFF_LINES: usize = 100;
/// Upper bound on the `git describe` version probe
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Interval between exit checks while the version probe runs
pub const VERSION_PROBE_POLL: Duration = Duration::from_millis(50);
