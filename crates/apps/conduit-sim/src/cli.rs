//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::report::OutputFormat;

/// Conduit service module simulator.
#[derive(Parser, Debug)]
#[command(name = "conduit-sim")]
#[command(author = "Conduit Contributors")]
#[command(version)]
#[command(about = "Drive the service keeper with seeded random traffic and check ledger invariants")]
#[command(
    long_about = "Runs random service commands block by block against a fresh store and checks, after every block, that deposits, escrowed fees and total supply still add up.\n\nThe same seed always replays the same run."
)]
pub struct Cli {
    /// Number of blocks to simulate.
    #[arg(short, long, default_value_t = 200)]
    pub blocks: u64,

    /// RNG seed.
    #[arg(short, long, env = "CONDUIT_SIM_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Number of providers.
    #[arg(long, default_value_t = 5)]
    pub providers: usize,

    /// Number of consumers.
    #[arg(long, default_value_t = 3)]
    pub consumers: usize,

    /// Number of services defined at genesis.
    #[arg(long, default_value_t = 2)]
    pub services: usize,

    /// Random commands attempted per block.
    #[arg(long, default_value_t = 8)]
    pub actions_per_block: usize,

    /// Service parameters (TOML). Missing fields keep their defaults.
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Persist state to a SQLite database at this path.
    #[arg(long, conflicts_with = "persist")]
    pub db: Option<PathBuf>,

    /// Persist state to the default data directory.
    #[arg(long)]
    pub persist: bool,

    /// Output format (human or json).
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormatArg,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format argument for clap.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormatArg {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}
