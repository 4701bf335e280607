//! Linux probe set
//!
//! Account and kernel questions are answered from system files; services,
//! packages and the firewall go through their command line tools
//! (systemctl, dpkg, ufw). Absolute paths are resolved against a
//! configurable root so the file probes can run against a fixture tree.

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::command::{CommandOutput, CommandRunner};
use super::files;
use super::{ProbeError, ProbeResult, Probes};

const PASSWD: &str = "/etc/passwd";
const GROUP: &str = "/etc/group";
const SHADOW: &str = "/etc/shadow";
const KERNEL_RELEASE: &str = "/proc/sys/kernel/osrelease";
const LIGHTDM_SHARE_DIR: &str = "/usr/share/lightdm/lightdm.conf.d/";
const LIGHTDM_ETC_DIR: &str = "/etc/lightdm/";
const APT_CONF_DIR: &str = "/etc/apt/apt.conf.d/";

const GUEST_DISABLED_PATTERN: &str = "allow-guest( |)=( |)false";
const AUTO_UPDATE_PATTERN: &str = r#"APT::Periodic::Update-Package-Lists\s+"1";"#;
const FIREWALL_ACTIVE: &str = "Status: active";

/// Probes for Debian-family Linux hosts
pub struct LinuxProbes {
    root: PathBuf,
    runner: CommandRunner,
}

impl LinuxProbes {
    pub fn new(root: &Path, runner: CommandRunner) -> Self {
        Self {
            root: root.to_path_buf(),
            runner,
        }
    }

    /// Map an absolute host path under the probe root
    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Colon-separated records of an account database file
    fn records(&self, path: &str) -> Result<Vec<Vec<String>>, ProbeError> {
        let content = files::read(&self.resolve(path))?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .map(|line| line.split(':').map(str::to_string).collect())
            .collect())
    }

    fn find_record(&self, path: &str, name: &str) -> Result<Option<Vec<String>>, ProbeError> {
        Ok(self
            .records(path)?
            .into_iter()
            .find(|fields| fields.first().map(String::as_str) == Some(name)))
    }
}

/// Octal permission bits the way `stat -c %a` prints them
fn octal_mode(mode: u32) -> String {
    format!("{:o}", mode & 0o7777)
}

/// `systemctl is-active` prints exactly `active` for a running unit
fn service_state_active(stdout: &str) -> bool {
    stdout.trim() == "active"
}

/// First line of `ufw status` is the status line; rule tables follow
fn firewall_reports_active(stdout: &str) -> bool {
    stdout.lines().next().map(str::trim) == Some(FIREWALL_ACTIVE)
}

/// dpkg-query fails for packages it has never seen
fn installed_version_matches(output: &CommandOutput, version: &str) -> bool {
    output.success && output.stdout.trim() == version
}

#[async_trait]
impl Probes for LinuxProbes {
    fn name(&self) -> &str {
        "linux"
    }

    async fn command(&self, cmd: &str) -> ProbeResult {
        Ok(self.runner.shell(cmd).await?.success)
    }

    async fn file_exists(&self, path: &str) -> ProbeResult {
        files::exists(&self.resolve(path))
    }

    async fn file_contains(&self, path: &str, text: &str) -> ProbeResult {
        files::contains(&self.resolve(path), text)
    }

    async fn file_contains_regex(&self, path: &str, pattern: &str) -> ProbeResult {
        let re = files::compile(pattern)?;
        files::contains_regex(&self.resolve(path), &re)
    }

    async fn dir_contains_regex(&self, dir: &str, pattern: &str) -> ProbeResult {
        let re = files::compile(pattern)?;
        files::dir_contains_regex(&self.resolve(dir), &re)
    }

    async fn package_installed(&self, package: &str) -> ProbeResult {
        Ok(self.runner.run("dpkg", &["-s", package]).await?.success)
    }

    async fn service_active(&self, name: &str) -> ProbeResult {
        // is-active exits non-zero for inactive units; only the state string matters
        let output = self.runner.run("systemctl", &["is-active", name]).await?;
        Ok(service_state_active(&output.stdout))
    }

    async fn user_exists(&self, name: &str) -> ProbeResult {
        Ok(self.find_record(PASSWD, name)?.is_some())
    }

    async fn user_in_group(&self, user: &str, group: &str) -> ProbeResult {
        let Some(group_fields) = self.find_record(GROUP, group)? else {
            return Ok(false);
        };

        let listed = group_fields
            .get(3)
            .map(|members| members.split(',').any(|m| m.trim() == user))
            .unwrap_or(false);
        if listed {
            return Ok(true);
        }

        // Primary group membership lives in the passwd gid field
        let primary = self
            .find_record(PASSWD, user)?
            .and_then(|fields| fields.get(3).cloned());
        Ok(primary.is_some() && primary.as_ref() == group_fields.get(2))
    }

    async fn firewall_active(&self) -> ProbeResult {
        let output = self
            .runner
            .run("ufw", &["status"])
            .await?
            .require_success("ufw status")?;
        Ok(firewall_reports_active(&output.stdout))
    }

    async fn password_unchanged_from_hash(&self, user: &str, legacy_hash: &str) -> ProbeResult {
        let entry = self.find_record(SHADOW, user)?;
        Ok(entry
            .and_then(|fields| fields.get(1).cloned())
            .map(|hash| hash.contains(legacy_hash))
            .unwrap_or(false))
    }

    async fn guest_login_disabled(&self) -> ProbeResult {
        let re = files::compile(GUEST_DISABLED_PATTERN)?;

        let shared = self.resolve(LIGHTDM_SHARE_DIR);
        if shared.is_dir() && files::dir_contains_regex(&shared, &re)? {
            return Ok(true);
        }
        debug!("Guest directive not in {}, trying {}", LIGHTDM_SHARE_DIR, LIGHTDM_ETC_DIR);
        files::dir_contains_regex(&self.resolve(LIGHTDM_ETC_DIR), &re)
    }

    async fn package_version_equals(&self, package: &str, version: &str) -> ProbeResult {
        let output = self
            .runner
            .run("dpkg-query", &["-W", "-f=${Version}", package])
            .await?;
        Ok(installed_version_matches(&output, version))
    }

    async fn kernel_version_contains(&self, fragment: &str) -> ProbeResult {
        files::contains(&self.resolve(KERNEL_RELEASE), fragment)
    }

    async fn auto_updates_enabled(&self) -> ProbeResult {
        let re = files::compile(AUTO_UPDATE_PATTERN)?;
        files::dir_contains_regex(&self.resolve(APT_CONF_DIR), &re)
    }

    async fn permission_matches(&self, path: &str, mode: &str, expected: &str) -> ProbeResult {
        let bits = || -> Result<u32, ProbeError> {
            let target = self.resolve(path);
            // stat(1) semantics: a symlink reports its own mode
            let meta = std::fs::symlink_metadata(&target).map_err(|e| ProbeError::io(&target, e))?;
            Ok(meta.permissions().mode())
        };

        match mode {
            "octal" => Ok(octal_mode(bits()?) == expected),
            "WorldWritable" => Ok(bits()? & 0o022 != 0),
            "WorldReadable" => Ok(bits()? & 0o004 != 0),
            _ => Ok(false),
        }
    }
}
