//! Per-version tables of target files, sentinels and rules.
//!
//! A [`Profile`] is built once at startup and passed by reference to the
//! validator, the transform engine and the orchestrator. Supporting another
//! upstream version means adding another constructor over new tables.

mod data_device;
mod data_device_primary;

use crate::patch::{PatchError, RuleSpec, Sentinel, TransformRule};

/// Upstream repository of the patched project
pub const MUTTER_REPOSITORY: &str = "https://gitlab.gnome.org/GNOME/mutter";

/// One file of the source tree the profile rewrites.
#[derive(Debug, Clone)]
pub struct TargetFile {
    /// Short logical name used in logs and reports
    pub key: &'static str,
    /// Path relative to the source tree root
    pub relative_path: &'static str,
    /// Upstream link to the expected version of the file
    pub reference: String,
    pub sentinels: Vec<Sentinel>,
    pub rules: Vec<TransformRule>,
}

impl TargetFile {
    fn build(
        key: &'static str,
        relative_path: &'static str,
        upstream: &str,
        sentinels: &[&'static str],
        rules: &[RuleSpec],
    ) -> Result<Self, PatchError> {
        Ok(TargetFile {
            key,
            relative_path,
            reference: format!("{}/{}", upstream, relative_path),
            sentinels: sentinels
                .iter()
                .copied()
                .map(Sentinel::new)
                .collect::<Result<_, _>>()?,
            rules: rules
                .iter()
                .map(|spec| TransformRule::new(*spec))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Everything the patcher knows about one pinned upstream version.
#[derive(Debug, Clone)]
pub struct Profile {
    pub version: &'static str,
    /// Base URL of the upstream tree at `version`
    pub upstream: String,
    pub targets: Vec<TargetFile>,
}

impl Profile {
    /// Mutter 46.2, as shipped in Ubuntu 24.04 LTS.
    pub fn mutter_46_2() -> Result<Self, PatchError> {
        let version = "46.2";
        let upstream = format!("{}/-/blob/{}", MUTTER_REPOSITORY, version);

        let targets = vec![
            TargetFile::build(
                "data-device",
                data_device::PATH,
                &upstream,
                data_device::SENTINELS,
                &data_device::RULES,
            )?,
            TargetFile::build(
                "data-device-primary",
                data_device_primary::PATH,
                &upstream,
                data_device_primary::SENTINELS,
                &data_device_primary::RULES,
            )?,
        ];

        Ok(Profile {
            version,
            upstream,
            targets,
        })
    }

    /// Leading component of the version, e.g. `46` for `46.2`.
    pub fn major_version(&self) -> &str {
        self.version.split('.').next().unwrap_or(self.version)
    }
}
