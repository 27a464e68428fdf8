//! Conduit service module simulator.
//!
//! Drives a [`conduit_ops::ServiceKeeper`] with seeded random commands,
//! closes each block with the keeper's end-block hook and checks the
//! ledger invariants after every block.

mod cli;
mod invariants;
mod report;
mod sim;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use conduit_ops::{load_params, ServiceMetrics};
use conduit_store::{default_data_dir, KvStore, MemoryKvStore, SqliteKvStore, DATABASE_FILE};
use conduit_types::ServiceParams;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;
use crate::report::{OutputFormat, Render};
use crate::sim::{SimConfig, Simulation};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    // Silent unless asked for with --verbose or RUST_LOG
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if !verbose && !has_rust_log {
        return;
    }
    let mut filter = EnvFilter::from_default_env();
    if verbose {
        if let Ok(directive) = "conduit=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let params = match &cli.params {
        Some(path) => load_params(path).with_context(|| format!("loading {}", path.display()))?,
        None => sim_params(),
    };
    let store = open_store(&cli)?;
    let metrics = Arc::new(ServiceMetrics::new());

    let config = SimConfig {
        seed: cli.seed,
        providers: cli.providers.max(1),
        consumers: cli.consumers.max(1),
        services: cli.services.max(1),
        actions_per_block: cli.actions_per_block,
    };
    info!(seed = config.seed, blocks = cli.blocks, "starting simulation");

    let report = Simulation::new(config, params, store, metrics.clone())?.run(cli.blocks)?;

    let format = OutputFormat::from(cli.format);
    println!("{}", report.render(format));
    if cli.metrics {
        println!("{}", metrics.encode());
    }
    Ok(())
}

/// Parameters sized so a short run exercises refunds and auto-pauses.
fn sim_params() -> ServiceParams {
    ServiceParams::default()
        .with_min_deposit_amount(1_000)
        .with_min_deposit_multiple(10)
        .with_refund_delays(60_000, 60_000)
}

fn database_path(cli: &Cli) -> Option<PathBuf> {
    match (&cli.db, cli.persist) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_data_dir().join(DATABASE_FILE)),
        (None, false) => None,
    }
}

fn open_store(cli: &Cli) -> Result<Box<dyn KvStore>> {
    let Some(path) = database_path(cli) else {
        return Ok(Box::new(MemoryKvStore::new()));
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    info!(path = %path.display(), "opening database");
    let store = SqliteKvStore::open(&path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(store))
}
