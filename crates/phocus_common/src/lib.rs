//! Phocus common library - shared types for the scoring daemon.
//!
//! Holds the check catalog model, the per-pass image state, daemon
//! configuration, and startup platform checks.

pub mod check;
pub mod config;
pub mod error;
pub mod image;
pub mod platform;

pub use check::{Catalog, Check, CheckDecl, ScoringChecks, TOTAL_POINTS};
pub use config::{PhocusConfig, CONFIG_PATH};
pub use error::PhocusError;
pub use image::{ImageState, StatusSlot, STATUS_SLOTS};
pub use platform::{is_privileged, Platform};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
