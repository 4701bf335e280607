//! Check catalog model.
//!
//! A catalog is a TOML file of `[[check]]` tables:
//!
//! ```toml
//! name = "Ubuntu hardening round"
//!
//! [[check]]
//! type = "PasswordChanged"
//! arg1 = "alice"
//! arg2 = "$6$legacyhash"
//! weight = 5
//! ```
//!
//! Checks declared without a weight share whatever is left of
//! [`TOTAL_POINTS`] after the explicit positive weights.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::PhocusError;

/// Points the unweighted checks of a catalog are scaled to fill
pub const TOTAL_POINTS: i32 = 100;

/// A check as declared in the catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckDecl {
    #[serde(rename = "type")]
    pub check_type: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub arg1: Option<String>,
    #[serde(default)]
    pub arg2: Option<String>,
    #[serde(default)]
    pub arg3: Option<String>,
    #[serde(default)]
    pub weight: Option<i32>,
}

/// Parsed catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "check")]
    pub checks: Vec<CheckDecl>,
}

impl Catalog {
    /// Parse a catalog from TOML text
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, PhocusError> {
        toml::from_str(content).map_err(|source| PhocusError::Catalog {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self, PhocusError> {
        let content = fs::read_to_string(path).map_err(|source| PhocusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml(&content, path)?;
        if catalog.checks.is_empty() {
            return Err(PhocusError::EmptyCatalog(path.to_path_buf()));
        }
        info!(
            "Loaded {} checks from {}",
            catalog.checks.len(),
            path.display()
        );
        Ok(catalog)
    }
}

/// A single check with its weight resolved.
///
/// `message` stays empty until the first evaluation fills in the
/// type's default, unless the catalog supplied one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Check {
    pub check_type: String,
    pub message: String,
    pub arg1: String,
    pub arg2: String,
    pub arg3: String,
    pub weight: i32,
}

impl Check {
    pub fn new(check_type: &str, args: [&str; 3], weight: i32) -> Self {
        Self {
            check_type: check_type.to_string(),
            message: String::new(),
            arg1: args[0].to_string(),
            arg2: args[1].to_string(),
            arg3: args[2].to_string(),
            weight,
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    fn from_decl(decl: CheckDecl, weight: i32) -> Self {
        Self {
            check_type: decl.check_type,
            message: decl.message.unwrap_or_default(),
            arg1: decl.arg1.unwrap_or_default(),
            arg2: decl.arg2.unwrap_or_default(),
            arg3: decl.arg3.unwrap_or_default(),
            weight,
        }
    }
}

/// Ordered catalog of checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringChecks {
    checks: Vec<Check>,
}

impl ScoringChecks {
    pub fn new(checks: Vec<Check>) -> Self {
        Self { checks }
    }

    /// Build the catalog, assigning default weights to unweighted checks
    pub fn from_catalog(catalog: Catalog) -> Self {
        // Summed wide; any single weight may be i32::MAX
        let explicit: i64 = catalog
            .checks
            .iter()
            .filter_map(|c| c.weight)
            .filter(|w| *w > 0)
            .map(i64::from)
            .sum();
        let unweighted = catalog.checks.iter().filter(|c| c.weight.is_none()).count() as i64;

        let mut share = 1;
        if unweighted > 0 {
            let left = i64::from(TOTAL_POINTS) - explicit;
            if left > 0 && left / unweighted > 0 {
                share = (left / unweighted) as i32;
            } else {
                warn!(
                    "Explicit weights total {} of {}; {} unweighted checks get 1 point each",
                    explicit, TOTAL_POINTS, unweighted
                );
            }
        }

        let checks = catalog
            .checks
            .into_iter()
            .map(|decl| {
                let weight = decl.weight.unwrap_or(share);
                Check::from_decl(decl, weight)
            })
            .collect();

        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Check> {
        self.checks.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Check> {
        self.checks.iter_mut()
    }

    /// Highest reachable score: the sum of all positive weights, saturating
    pub fn max_score(&self) -> i32 {
        self.checks
            .iter()
            .map(|c| c.weight)
            .filter(|w| *w > 0)
            .fold(0i32, i32::saturating_add)
    }
}
