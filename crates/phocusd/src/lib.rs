//! Phocus daemon library - exposes modules for testing.

pub mod evaluator;
pub mod probe;
pub mod registry;
pub mod report;
pub mod scoring;

pub use evaluator::{verdict, Evaluator};
pub use probe::{ProbeError, ProbeResult, Probes};
pub use registry::{CheckArgs, CheckKind, CheckType, Polarity, UnknownCheckType};
pub use report::ReportWriter;
pub use scoring::{jitter, seed_from_clock, LoopState, ScoringLoop};
