//! Error types for Phocus.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhocusError {
    #[error("You need to run this binary as root")]
    InsufficientPrivilege,

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid check catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Check catalog {0} declares no checks")]
    EmptyCatalog(PathBuf),
}

impl PhocusError {
    /// Process exit status for startup-fatal errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            PhocusError::InsufficientPrivilege => 1,
            PhocusError::UnsupportedPlatform(_) => 1,
            PhocusError::Read { .. } => 2,
            PhocusError::Catalog { .. } | PhocusError::EmptyCatalog(_) => 3,
            PhocusError::Config { .. } => 4,
        }
    }
}
