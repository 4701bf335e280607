//! Image state - the score snapshot produced by one scoring pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::Check;

/// Number of recent-run status slots shown in the report
pub const STATUS_SLOTS: usize = 3;

/// One (color, label) pair of the recent-run status display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSlot {
    pub color: String,
    pub label: String,
}

impl Default for StatusSlot {
    fn default() -> Self {
        Self {
            color: "green".to_string(),
            label: "OK".to_string(),
        }
    }
}

/// Result of one scoring pass.
///
/// Built fresh at the start of every pass; nothing is carried over
/// from the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageState {
    pub total_score: i32,
    pub max_score: i32,
    pub passed_checks: Vec<Check>,
    pub failed_checks: Vec<Check>,
    pub status_slots: [StatusSlot; STATUS_SLOTS],
    pub scored_at: DateTime<Utc>,
}

impl ImageState {
    pub fn new(max_score: i32) -> Self {
        Self {
            total_score: 0,
            max_score,
            passed_checks: Vec::new(),
            failed_checks: Vec::new(),
            status_slots: Default::default(),
            scored_at: Utc::now(),
        }
    }

    /// Record one verdict, adding the check's weight on a pass
    pub fn record(&mut self, check: &Check, passed: bool) {
        if passed {
            self.total_score = self.total_score.saturating_add(check.weight);
            self.passed_checks.push(check.clone());
        } else {
            self.failed_checks.push(check.clone());
        }
    }

    /// Passed checks that earn points
    pub fn scored_vulns(&self) -> impl Iterator<Item = &Check> {
        self.passed_checks.iter().filter(|c| c.weight > 0)
    }

    /// Passed checks that cost points
    pub fn penalties(&self) -> impl Iterator<Item = &Check> {
        self.passed_checks.iter().filter(|c| c.weight < 0)
    }

    pub fn checks_evaluated(&self) -> usize {
        self.passed_checks.len() + self.failed_checks.len()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{}/{} points, {} vulns fixed, {} penalties, {} failing",
            self.total_score,
            self.max_score,
            self.scored_vulns().count(),
            self.penalties().count(),
            self.failed_checks.len()
        )
    }
}

impl Default for ImageState {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_empty() {
        let image = ImageState::new(100);
        assert_eq!(image.total_score, 0);
        assert_eq!(image.max_score, 100);
        assert_eq!(image.checks_evaluated(), 0);
        assert!(image
            .status_slots
            .iter()
            .all(|s| s.color == "green" && s.label == "OK"));
    }

    #[test]
    fn test_record_partitions_and_sums() {
        let mut image = ImageState::new(15);
        image.record(&Check::new("FirewallUp", ["", "", ""], 10), true);
        image.record(&Check::new("ServiceUp", ["ssh", "", ""], 5), false);
        image.record(&Check::new("UserExists", ["hacker", "", ""], -3), true);

        assert_eq!(image.total_score, 7);
        assert_eq!(image.passed_checks.len(), 2);
        assert_eq!(image.failed_checks.len(), 1);
        assert_eq!(image.scored_vulns().count(), 1);
        assert_eq!(image.penalties().count(), 1);
        assert_eq!(image.failed_checks[0].arg1, "ssh");
    }

    #[test]
    fn test_total_score_saturates() {
        let mut image = ImageState::new(i32::MAX);
        image.record(&Check::new("FirewallUp", ["", "", ""], i32::MAX), true);
        image.record(&Check::new("ServiceUp", ["ssh", "", ""], 1), true);
        assert_eq!(image.total_score, i32::MAX);

        let mut image = ImageState::new(0);
        image.record(&Check::new("UserExists", ["a", "", ""], i32::MIN), true);
        image.record(&Check::new("UserExists", ["b", "", ""], -1), true);
        assert_eq!(image.total_score, i32::MIN);
    }

    #[test]
    fn test_summary_line() {
        let mut image = ImageState::new(10);
        image.record(&Check::new("FirewallUp", ["", "", ""], 10), true);
        assert_eq!(
            image.summary(),
            "10/10 points, 1 vulns fixed, 0 penalties, 0 failing"
        );
    }

    #[test]
    fn test_serializes_to_json_shape() {
        let image = ImageState::new(0);
        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(value["status_slots"].as_array().unwrap().len(), STATUS_SLOTS);
        assert!(value["passed_checks"].as_array().unwrap().is_empty());
    }
}
