//! Configuration management for phocusd.
//!
//! Loads settings from /etc/phocus/config.toml or uses defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::PhocusError;
use crate::platform::Platform;

/// Config file path
pub const CONFIG_PATH: &str = "/etc/phocus/config.toml";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhocusConfig {
    /// Directory holding the check catalog and the score report
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Catalog file name, relative to `data_dir` unless absolute
    #[serde(default = "default_catalog_file")]
    pub catalog_file: PathBuf,

    /// Report file name, relative to `data_dir` unless absolute.
    /// An empty name disables the report.
    #[serde(default = "default_report_file")]
    pub report_file: Option<PathBuf>,

    /// Per-command probe timeout in seconds; 0 waits forever
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Filesystem root the probes inspect
    #[serde(default = "default_probe_root")]
    pub probe_root: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    match Platform::current() {
        Platform::Windows => PathBuf::from("C:\\phocus\\"),
        _ => PathBuf::from("/opt/phocus/"),
    }
}

fn default_catalog_file() -> PathBuf {
    PathBuf::from("scoring.toml")
}

fn default_report_file() -> Option<PathBuf> {
    Some(PathBuf::from("ScoringReport.json"))
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_probe_root() -> PathBuf {
    PathBuf::from("/")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PhocusConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_file: default_catalog_file(),
            report_file: default_report_file(),
            probe_timeout_secs: default_probe_timeout(),
            probe_root: default_probe_root(),
            log_level: default_log_level(),
        }
    }
}

impl PhocusConfig {
    /// Load config from the default path
    pub fn load() -> Result<Self, PhocusError> {
        Self::load_or_default(Path::new(CONFIG_PATH))
    }

    /// Load config, using defaults only when the file does not exist.
    /// Unreadable or malformed files are errors.
    pub fn load_or_default(path: &Path) -> Result<Self, PhocusError> {
        match Self::load_from_path(path) {
            Err(PhocusError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, PhocusError> {
        let content = fs::read_to_string(path).map_err(|source| PhocusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PhocusConfig =
            toml::from_str(&content).map_err(|source| PhocusError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.report_file
            .as_ref()
            .filter(|f| !f.as_os_str().is_empty())
            .map(|f| self.data_dir.join(f))
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        match self.probe_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
