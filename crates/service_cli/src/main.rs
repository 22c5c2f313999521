//! AMC engine CLI
//!
//! Operational entry point for the AMC valuation engine.
//!
//! # Commands
//!
//! - `amc-engine run` - Build an NPV cube and report netting set exposures
//! - `amc-engine check` - Validate the configuration and show the date grid
//! - `amc-engine demo-portfolio` - Write a demo portfolio definition
//!
//! Configuration is read from a TOML file (`--config`, default `amc.toml`)
//! with `AMC_*` environment overrides. Log output is controlled by `RUST_LOG`,
//! falling back to the configured `log_level`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;

pub use error::{CliError, Result};

/// AMC valuation engine CLI
#[derive(Parser)]
#[command(name = "amc-engine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging when RUST_LOG is not set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "amc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the NPV cube and print exposures per netting set
    Run {
        /// Portfolio definition (JSON); the demo portfolio is used if absent
        #[arg(short, long)]
        portfolio: Option<PathBuf>,

        /// Number of demo trades when no portfolio file is given
        #[arg(short = 'n', long, default_value = "12")]
        trades: usize,

        /// PFE confidence level
        #[arg(long, default_value = "0.95")]
        confidence: f64,

        /// Write the exposure report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration
    Check,

    /// Write a demo portfolio definition
    DemoPortfolio {
        /// Number of trades
        #[arg(short = 'n', long, default_value = "12")]
        trades: usize,

        /// Output file
        #[arg(short, long, default_value = "portfolio.json")]
        output: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    init_tracing(if cli.verbose { "debug" } else { &config.log_level });
    info!(config = %cli.config.display(), asof = %config.asof, "Configuration loaded");

    match cli.command {
        Commands::Run {
            portfolio,
            trades,
            confidence,
            output,
        } => commands::run::run(&config, portfolio.as_deref(), trades, confidence, output.as_deref())
            .context("amc run failed")?,
        Commands::Check => commands::check::run(&config).context("configuration check failed")?,
        Commands::DemoPortfolio { trades, output } => {
            commands::demo_portfolio::run(&config, trades, &output).context("writing demo portfolio failed")?
        }
    }
    Ok(())
}
