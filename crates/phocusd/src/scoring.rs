//! Scoring loop
//!
//! Two states: `Scoring` evaluates the whole catalog once, in order, into
//! a fresh ImageState; `Sleeping` waits a jittered 6 to 25 seconds before
//! the next pass. The loop never ends on its own.
//!
//! The RNG is seeded once at startup and owned by the loop so the polling
//! cadence cannot be predicted from outside, while tests can inject a
//! fixed seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use phocus_common::{ImageState, ScoringChecks};

use crate::evaluator::Evaluator;
use crate::report::ReportWriter;

/// Minimum pause between passes
pub const JITTER_BASE_SECS: u64 = 6;

/// Number of whole seconds the pause can add on top of the base
pub const JITTER_SPREAD_SECS: u64 = 20;

/// Pause before the next pass: 6 + U{0..19} seconds
pub fn jitter<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    Duration::from_secs(JITTER_BASE_SECS + rng.gen_range(0..JITTER_SPREAD_SECS))
}

/// RNG seeded from the wall clock
pub fn seed_from_clock() -> StdRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    StdRng::seed_from_u64(nanos)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Scoring,
    Sleeping(Duration),
}

/// Owns the catalog and drives repeated scoring passes
pub struct ScoringLoop<R: Rng = StdRng> {
    checks: ScoringChecks,
    evaluator: Evaluator,
    rng: R,
    image: ImageState,
    state: LoopState,
    report: Option<ReportWriter>,
    passes: u64,
}

impl<R: Rng> ScoringLoop<R> {
    pub fn new(checks: ScoringChecks, evaluator: Evaluator, rng: R) -> Self {
        let image = ImageState::new(checks.max_score());
        Self {
            checks,
            evaluator,
            rng,
            image,
            state: LoopState::Scoring,
            report: None,
            passes: 0,
        }
    }

    pub fn with_report(mut self, report: ReportWriter) -> Self {
        self.report = Some(report);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Snapshot of the most recent pass
    pub fn image(&self) -> &ImageState {
        &self.image
    }

    pub fn checks(&self) -> &ScoringChecks {
        &self.checks
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Draw the pause before the next pass
    pub fn next_delay(&mut self) -> Duration {
        jitter(&mut self.rng)
    }

    /// Run one full pass: Scoring -> Sleeping.
    ///
    /// The previous ImageState is replaced wholesale.
    pub async fn score_pass(&mut self) -> &ImageState {
        self.state = LoopState::Scoring;
        info!("Scoring image...");

        let mut image = ImageState::new(self.checks.max_score());
        for check in self.checks.iter_mut() {
            let passed = self.evaluator.evaluate(check).await;
            debug!(
                "{} [{}] {} -> {}",
                check.check_type,
                check.weight,
                check.message,
                if passed { "pass" } else { "fail" }
            );
            image.record(check, passed);
        }

        self.image = image;
        self.passes += 1;

        if let Some(report) = &self.report {
            if let Err(e) = report.write(&self.image) {
                warn!("Failed to write report: {:#}", e);
            }
        }

        let delay = self.next_delay();
        self.state = LoopState::Sleeping(delay);
        info!(
            "Pass {}: {}; next pass in {}s",
            self.passes,
            self.image.summary(),
            delay.as_secs()
        );

        &self.image
    }

    /// Score forever
    pub async fn run(&mut self) {
        loop {
            self.score_pass().await;
            if let LoopState::Sleeping(delay) = self.state {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::FakeProbes;
    use phocus_common::Check;
    use std::sync::Arc;

    fn catalog() -> ScoringChecks {
        ScoringChecks::new(vec![
            Check::new("FirewallUp", ["", "", ""], 10),
            Check::new("ServiceUpNot", ["telnet", "", ""], 5),
            Check::new("UserExists", ["hacker", "", ""], -4),
            Check::new("NoSuchCheck", ["", "", ""], 50),
        ])
    }

    #[test]
    fn test_jitter_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let secs = jitter(&mut rng).as_secs();
            assert!((6..=25).contains(&secs));
        }
    }

    #[test]
    fn test_jitter_covers_whole_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; JITTER_SPREAD_SECS as usize];
        for _ in 0..10_000 {
            seen[(jitter(&mut rng).as_secs() - JITTER_BASE_SECS) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_same_seed_same_cadence() {
        let mut a = StdRng::seed_from_u64(1234);
        let mut b = StdRng::seed_from_u64(1234);
        let first: Vec<Duration> = (0..20).map(|_| jitter(&mut a)).collect();
        let second: Vec<Duration> = (0..20).map(|_| jitter(&mut b)).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_score_pass_partitions_and_sums() {
        let probes = FakeProbes::builder()
            .answer("firewall_active", true)
            .answer("service_active", false)
            .answer("user_exists", true)
            .build();
        let mut scoring = ScoringLoop::new(
            catalog(),
            Evaluator::new(Arc::new(probes)),
            StdRng::seed_from_u64(3),
        );
        assert_eq!(scoring.state(), LoopState::Scoring);

        let image = scoring.score_pass().await;
        assert_eq!(image.total_score, 10 + 5 - 4);
        assert_eq!(image.max_score, 65);
        assert_eq!(image.passed_checks.len(), 3);
        assert_eq!(image.failed_checks.len(), 1);
        assert_eq!(image.failed_checks[0].check_type, "NoSuchCheck");
        assert_eq!(image.penalties().count(), 1);

        match scoring.state() {
            LoopState::Sleeping(delay) => assert!((6..=25).contains(&delay.as_secs())),
            other => panic!("expected Sleeping, got {:?}", other),
        }
        assert_eq!(scoring.passes(), 1);
    }

    #[tokio::test]
    async fn test_passes_keep_catalog_order() {
        let mut scoring = ScoringLoop::new(
            catalog(),
            Evaluator::new(Arc::new(FakeProbes::all_failing("no probes"))),
            StdRng::seed_from_u64(3),
        );
        let image = scoring.score_pass().await;
        let order: Vec<&str> = image
            .failed_checks
            .iter()
            .map(|c| c.check_type.as_str())
            .collect();
        assert_eq!(
            order,
            vec!["FirewallUp", "ServiceUpNot", "UserExists", "NoSuchCheck"]
        );
        assert_eq!(image.total_score, 0);
    }

    #[tokio::test]
    async fn test_messages_persist_in_catalog() {
        let mut scoring = ScoringLoop::new(
            catalog(),
            Evaluator::new(Arc::new(FakeProbes::all_answering(false))),
            StdRng::seed_from_u64(3),
        );
        scoring.score_pass().await;

        let messages: Vec<&str> = scoring.checks().iter().map(|c| c.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Firewall has been enabled",
                "Service telnet is not running",
                "User hacker exists",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_report_written_each_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ScoringReport.json");
        let mut scoring = ScoringLoop::new(
            catalog(),
            Evaluator::new(Arc::new(FakeProbes::all_answering(true))),
            StdRng::seed_from_u64(3),
        )
        .with_report(ReportWriter::new(path.clone()));

        scoring.score_pass().await;
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_score"], scoring.image().total_score);
    }
}
