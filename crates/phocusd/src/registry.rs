//! Check registry
//!
//! Maps a catalog type name to a `CheckType`: the base kind, which picks
//! the probe and message pair, and a polarity. Every kind has a negated
//! counterpart spelled with a `Not` suffix (`ServiceUp` / `ServiceUpNot`).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use phocus_common::Check;

use crate::probe::{ProbeResult, Probes};

/// Type name the registry does not know
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No check type {0}")]
pub struct UnknownCheckType(pub String);

const NEGATED_SUFFIX: &str = "Not";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Command,
    FileExists,
    FileContains,
    FileContainsRegex,
    DirContainsRegex,
    PackageInstalled,
    ServiceUp,
    UserExists,
    UserInGroup,
    FirewallUp,
    PasswordChanged,
    GuestDisabledLDM,
    ProgramVersion,
    KernelVersion,
    AutoCheckUpdatesEnabled,
    PermissionIs,
}

impl CheckKind {
    pub const ALL: [CheckKind; 16] = [
        CheckKind::Command,
        CheckKind::FileExists,
        CheckKind::FileContains,
        CheckKind::FileContainsRegex,
        CheckKind::DirContainsRegex,
        CheckKind::PackageInstalled,
        CheckKind::ServiceUp,
        CheckKind::UserExists,
        CheckKind::UserInGroup,
        CheckKind::FirewallUp,
        CheckKind::PasswordChanged,
        CheckKind::GuestDisabledLDM,
        CheckKind::ProgramVersion,
        CheckKind::KernelVersion,
        CheckKind::AutoCheckUpdatesEnabled,
        CheckKind::PermissionIs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Command => "Command",
            CheckKind::FileExists => "FileExists",
            CheckKind::FileContains => "FileContains",
            CheckKind::FileContainsRegex => "FileContainsRegex",
            CheckKind::DirContainsRegex => "DirContainsRegex",
            CheckKind::PackageInstalled => "PackageInstalled",
            CheckKind::ServiceUp => "ServiceUp",
            CheckKind::UserExists => "UserExists",
            CheckKind::UserInGroup => "UserInGroup",
            CheckKind::FirewallUp => "FirewallUp",
            CheckKind::PasswordChanged => "PasswordChanged",
            CheckKind::GuestDisabledLDM => "GuestDisabledLDM",
            CheckKind::ProgramVersion => "ProgramVersion",
            CheckKind::KernelVersion => "KernelVersion",
            CheckKind::AutoCheckUpdatesEnabled => "AutoCheckUpdatesEnabled",
            CheckKind::PermissionIs => "PermissionIs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Direct,
    Negated,
}

impl Polarity {
    /// Verdict for a probe answer that was actually determined
    pub fn apply(self, matched: bool) -> bool {
        match self {
            Polarity::Direct => matched,
            Polarity::Negated => !matched,
        }
    }

    fn pick<'a>(self, positive: &'a str, negated: &'a str) -> &'a str {
        match self {
            Polarity::Direct => positive,
            Polarity::Negated => negated,
        }
    }
}

/// Positional arguments of a check
#[derive(Debug, Clone, Copy)]
pub struct CheckArgs<'a> {
    pub arg1: &'a str,
    pub arg2: &'a str,
    pub arg3: &'a str,
}

impl<'a> From<&'a Check> for CheckArgs<'a> {
    fn from(check: &'a Check) -> Self {
        Self {
            arg1: &check.arg1,
            arg2: &check.arg2,
            arg3: &check.arg3,
        }
    }
}

/// A resolved catalog type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckType {
    pub kind: CheckKind,
    pub polarity: Polarity,
}

impl CheckType {
    pub fn new(kind: CheckKind, polarity: Polarity) -> Self {
        Self { kind, polarity }
    }

    /// Every registered type name, direct and negated
    pub fn all() -> impl Iterator<Item = CheckType> {
        CheckKind::ALL.into_iter().flat_map(|kind| {
            [
                CheckType::new(kind, Polarity::Direct),
                CheckType::new(kind, Polarity::Negated),
            ]
        })
    }

    /// Default display message; depends on polarity, never on the verdict
    pub fn default_message(&self, args: CheckArgs<'_>) -> String {
        let p = self.polarity;
        let CheckArgs { arg1, arg2, arg3 } = args;

        match self.kind {
            CheckKind::Command => {
                format!("Command \"{}\" {}", arg1, p.pick("passed", "failed"))
            }
            CheckKind::FileExists => {
                format!("File {} {}", arg1, p.pick("exists", "does not exist"))
            }
            CheckKind::FileContains => format!(
                "File {} {} {}",
                arg1,
                p.pick("contains", "does not contain"),
                arg2
            ),
            CheckKind::FileContainsRegex => format!(
                "File {} {} {}",
                arg1,
                p.pick("matches", "does not match"),
                arg2
            ),
            CheckKind::DirContainsRegex => format!(
                "Directory {} {} {}",
                arg1,
                p.pick("matches", "does not match"),
                arg2
            ),
            CheckKind::PackageInstalled => {
                format!("Package {} {}", arg1, p.pick("is installed", "is not installed"))
            }
            CheckKind::ServiceUp => {
                format!("Service {} {}", arg1, p.pick("is running", "is not running"))
            }
            CheckKind::UserExists => {
                format!("User {} {}", arg1, p.pick("exists", "does not exist"))
            }
            CheckKind::UserInGroup => format!(
                "User {} {} {}",
                arg1,
                p.pick("is in group", "is not in group"),
                arg2
            ),
            CheckKind::FirewallUp => {
                format!("Firewall has been {}", p.pick("enabled", "disabled"))
            }
            CheckKind::PasswordChanged => format!(
                "Password for {} {}",
                arg1,
                p.pick("has been changed", "has not been changed")
            ),
            CheckKind::GuestDisabledLDM => {
                format!("Guest is {}", p.pick("disabled", "enabled"))
            }
            CheckKind::ProgramVersion => {
                format!("{} {} {}", arg1, p.pick("is version", "is not version"), arg2)
            }
            CheckKind::KernelVersion => {
                format!("Kernel {} {}", p.pick("is version", "is not version"), arg1)
            }
            CheckKind::AutoCheckUpdatesEnabled => format!(
                "The system {} for updates daily",
                p.pick("automatically checks", "does not automatically check")
            ),
            CheckKind::PermissionIs => {
                let are = p.pick("are", "are not");
                match arg2 {
                    "octal" => format!("The octal permissions of {} {} {}", arg1, are, arg3),
                    "WorldWritable" => {
                        format!("{} {}", arg1, p.pick("is world writable", "is not world writable"))
                    }
                    "WorldReadable" => {
                        format!("{} {}", arg1, p.pick("is world readable", "is not world readable"))
                    }
                    _ => format!("Permissions of {} {} {}", arg1, are, arg3),
                }
            }
        }
    }

    /// Run the probe behind this kind, before polarity is applied
    pub async fn probe(&self, probes: &dyn Probes, args: CheckArgs<'_>) -> ProbeResult {
        let CheckArgs { arg1, arg2, arg3 } = args;

        match self.kind {
            CheckKind::Command => probes.command(arg1).await,
            CheckKind::FileExists => probes.file_exists(arg1).await,
            CheckKind::FileContains => probes.file_contains(arg1, arg2).await,
            CheckKind::FileContainsRegex => probes.file_contains_regex(arg1, arg2).await,
            CheckKind::DirContainsRegex => probes.dir_contains_regex(arg1, arg2).await,
            CheckKind::PackageInstalled => probes.package_installed(arg1).await,
            CheckKind::ServiceUp => probes.service_active(arg1).await,
            CheckKind::UserExists => probes.user_exists(arg1).await,
            CheckKind::UserInGroup => probes.user_in_group(arg1, arg2).await,
            CheckKind::FirewallUp => probes.firewall_active().await,
            // The probe answers "unchanged"; the check asks "changed"
            CheckKind::PasswordChanged => probes
                .password_unchanged_from_hash(arg1, arg2)
                .await
                .map(|unchanged| !unchanged),
            CheckKind::GuestDisabledLDM => probes.guest_login_disabled().await,
            CheckKind::ProgramVersion => probes.package_version_equals(arg1, arg2).await,
            CheckKind::KernelVersion => probes.kernel_version_contains(arg1).await,
            CheckKind::AutoCheckUpdatesEnabled => probes.auto_updates_enabled().await,
            CheckKind::PermissionIs => probes.permission_matches(arg1, arg2, arg3).await,
        }
    }
}

impl FromStr for CheckType {
    type Err = UnknownCheckType;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = CheckKind::from_name(name) {
            return Ok(CheckType::new(kind, Polarity::Direct));
        }
        name.strip_suffix(NEGATED_SUFFIX)
            .and_then(CheckKind::from_name)
            .map(|kind| CheckType::new(kind, Polarity::Negated))
            .ok_or_else(|| UnknownCheckType(name.to_string()))
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.polarity {
            Polarity::Direct => f.write_str(self.kind.as_str()),
            Polarity::Negated => write!(f, "{}{}", self.kind.as_str(), NEGATED_SUFFIX),
        }
    }
}
