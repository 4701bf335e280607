//! Phocus Daemon - host compliance scoring
//!
//! Evaluates the check catalog against the live machine on a jittered
//! interval and keeps the latest score.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use phocus_common::{is_privileged, Catalog, PhocusConfig, PhocusError, Platform, ScoringChecks};
use phocusd::probe::{self, CommandRunner};
use phocusd::{seed_from_clock, Evaluator, ReportWriter, ScoringLoop};

/// Phocus scoring daemon
#[derive(Parser)]
#[command(name = "phocusd")]
#[command(about = "Phocus - host compliance scoring daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to /etc/phocus/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check catalog, overriding the configured one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Score once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("phocusd: {:#}", e);
        let code = e
            .downcast_ref::<PhocusError>()
            .map(PhocusError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the subscriber. RUST_LOG wins for the whole run; otherwise
/// start at `info` and hand back a handle for the configured level.
fn init_tracing() -> Option<FilterHandle> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return None;
    }

    let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    Some(handle)
}

fn apply_log_level(handle: &FilterHandle, level: &str) {
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("Failed to apply log level {}: {}", level, e);
            }
        }
        Err(e) => warn!("Invalid log_level {:?}, keeping info: {}", level, e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Initialize logging before anything can log
    let filter = init_tracing();

    info!("Phocus Daemon v{} starting", phocus_common::VERSION);

    let config = match &cli.config {
        Some(path) => PhocusConfig::load_from_path(path)?,
        None => PhocusConfig::load()?,
    };
    if let Some(handle) = &filter {
        apply_log_level(handle, &config.log_level);
    }

    if !is_privileged() {
        return Err(PhocusError::InsufficientPrivilege.into());
    }

    let platform = Platform::current();
    let runner = CommandRunner::new(config.probe_timeout());
    let probes = probe::for_platform(platform, &config.probe_root, runner)?;
    info!("Using {} probes", probes.name());

    let catalog_path = cli.catalog.unwrap_or_else(|| config.catalog_path());
    let catalog = Catalog::load(&catalog_path).context("Failed to load check catalog")?;
    if let Some(name) = &catalog.name {
        info!("Catalog: {}", name);
    }
    let checks = ScoringChecks::from_catalog(catalog);
    info!(
        "Loaded {} checks worth {} points",
        checks.len(),
        checks.max_score()
    );

    let mut scoring = ScoringLoop::new(checks, Evaluator::new(probes), seed_from_clock());
    if let Some(path) = config.report_path() {
        info!("Writing score report to {}", path.display());
        scoring = scoring.with_report(ReportWriter::new(path));
    }

    if cli.once {
        let image = scoring.score_pass().await;
        info!("Final score: {}", image.summary());
        return Ok(());
    }

    scoring.run().await;
    Ok(())
}
