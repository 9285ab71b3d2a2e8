//! Best-effort detection of the checked-out upstream version.
//!
//! Nothing here is fatal: every failure is logged at debug level and reported
//! as "unknown".

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

use crate::patch::{VERSION_PROBE_POLL, VERSION_PROBE_TIMEOUT};
use crate::targets::Profile;

/// Exact git tag of `root`, falling back to the `project()` version in `meson.build`.
pub fn detect_version(root: &Path) -> Option<String> {
    git_tag(root, VERSION_PROBE_TIMEOUT).or_else(|| meson_version(root))
}

/// Whether `detected` is close enough to the profile's version to skip the warning.
///
/// Any release in the same major series is accepted.
pub fn is_compatible(detected: &str, profile: &Profile) -> bool {
    detected == profile.version || detected.split('.').next() == Some(profile.major_version())
}

fn git_tag(root: &Path, timeout: Duration) -> Option<String> {
    let mut command = Command::new("git");
    command
        .args(["describe", "--tags", "--exact-match"])
        .current_dir(root);
    command_output(command, timeout)
}

/// Trimmed stdout of `command`, or `None` if it fails, prints nothing or
/// outlives `timeout` (in which case it is killed).
fn command_output(mut command: Command, timeout: Duration) -> Option<String> {
    let mut child = match command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!(error = %e, "could not run version command");
            return None;
        }
    };

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() > timeout => {
                debug!(?timeout, "version command timed out, killing it");
                drop(child.kill());
                drop(child.wait());
                return None;
            }
            Ok(None) => thread::sleep(VERSION_PROBE_POLL),
            Err(e) => {
                debug!(error = %e, "waiting for version command failed");
                return None;
            }
        }
    };

    if !status.success() {
        debug!(?status, "version command found nothing");
        return None;
    }

    let mut stdout = String::new();
    child.stdout.take()?.read_to_string(&mut stdout).ok()?;
    let output = stdout.trim();
    if output.is_empty() {
        None
    } else {
        Some(output.to_string())
    }
}

fn meson_version(root: &Path) -> Option<String> {
    let content = match fs::read_to_string(root.join("meson.build")) {
        Ok(content) => content,
        Err(e) => {
            debug!(error = %e, "no readable meson.build");
            return None;
        }
    };
    parse_meson_version(&content)
}

fn parse_meson_version(content: &str) -> Option<String> {
    let re = Regex::new(r"version\s*:\s*'(\d+\.\d+)").ok()?;
    re.captures(content).map(|caps| caps[1].to_string())
}
