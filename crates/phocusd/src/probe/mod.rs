//! Probe capability set
//!
//! A probe answers one yes/no question about live system state. Every
//! probe returns `Result<bool, ProbeError>`; an error means the answer
//! could not be determined and is never read as a pass.
//!
//! Production code uses `LinuxProbes`, which reads system files and runs
//! system commands. Test code uses `FakeProbes` with pre-configured
//! responses.

pub mod command;
pub mod fake;
pub mod files;
#[cfg(unix)]
pub mod linux;

pub use command::{CommandOutput, CommandRunner};
pub use fake::{FakeProbes, FakeProbesBuilder, FakeResponse};
#[cfg(unix)]
pub use linux::LinuxProbes;

use async_trait::async_trait;
use phocus_common::{PhocusError, Platform};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Why a probe could not produce an answer
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("`{command}` exited with {code:?}: {stderr}")]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{0}")]
    Unavailable(String),
}

impl ProbeError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ProbeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ProbeResult = Result<bool, ProbeError>;

/// Yes/no questions about host state
#[async_trait]
pub trait Probes: Send + Sync {
    /// Probe set name for logs
    fn name(&self) -> &str;

    /// Shell command exits with status 0
    async fn command(&self, cmd: &str) -> ProbeResult;

    async fn file_exists(&self, path: &str) -> ProbeResult;

    /// File contains `text` verbatim
    async fn file_contains(&self, path: &str, text: &str) -> ProbeResult;

    async fn file_contains_regex(&self, path: &str, pattern: &str) -> ProbeResult;

    /// Any file below `dir` matches `pattern`
    async fn dir_contains_regex(&self, dir: &str, pattern: &str) -> ProbeResult;

    async fn package_installed(&self, package: &str) -> ProbeResult;

    /// Named service is currently running
    async fn service_active(&self, name: &str) -> ProbeResult;

    /// Account exists in the account database
    async fn user_exists(&self, name: &str) -> ProbeResult;

    async fn user_in_group(&self, user: &str, group: &str) -> ProbeResult;

    /// Host firewall reports itself active
    async fn firewall_active(&self) -> ProbeResult;

    /// `legacy_hash` is still the stored password hash of `user`,
    /// i.e. the password was NOT changed
    async fn password_unchanged_from_hash(&self, user: &str, legacy_hash: &str) -> ProbeResult;

    /// Display manager refuses guest logins
    async fn guest_login_disabled(&self) -> ProbeResult;

    /// Installed version of `package` is exactly `version`
    async fn package_version_equals(&self, package: &str, version: &str) -> ProbeResult;

    async fn kernel_version_contains(&self, fragment: &str) -> ProbeResult;

    /// Package lists are refreshed periodically
    async fn auto_updates_enabled(&self) -> ProbeResult;

    /// Permission test on `path`; `mode` is `octal`, `WorldWritable` or
    /// `WorldReadable`. Any other mode answers `false`.
    async fn permission_matches(&self, path: &str, mode: &str, expected: &str) -> ProbeResult;
}

/// Pick the probe set for the host platform
pub fn for_platform(
    platform: Platform,
    root: &Path,
    runner: CommandRunner,
) -> Result<Arc<dyn Probes>, PhocusError> {
    match platform {
        #[cfg(unix)]
        Platform::Linux => Ok(Arc::new(LinuxProbes::new(root, runner))),
        other => {
            let _ = (root, runner);
            Err(PhocusError::UnsupportedPlatform(other.to_string()))
        }
    }
}
