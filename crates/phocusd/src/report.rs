//! Score report - the latest ImageState written as JSON.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use phocus_common::ImageState;

/// Writes the report atomically (temp file, then rename)
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, image: &ImageState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_vec_pretty(image).context("Failed to serialize report")?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Report written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phocus_common::Check;

    #[test]
    fn test_write_replaces_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports/ScoringReport.json"));

        let mut first = ImageState::new(10);
        first.record(&Check::new("FirewallUp", ["", "", ""], 10), true);
        writer.write(&first).unwrap();

        let second = ImageState::new(10);
        writer.write(&second).unwrap();

        let content = fs::read_to_string(writer.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["total_score"], 0);
        assert!(value["passed_checks"].as_array().unwrap().is_empty());
        assert!(!writer.path().with_extension("tmp").exists());
    }
}
