//! CLI error types.

use std::path::PathBuf;

use pricer_amc::config::ConfigError;
use pricer_amc::exposure::ExposureError;
use pricer_amc::portfolio::PortfolioError;
use pricer_amc::EngineError;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// An input file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A command line argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Portfolio file could not be read.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// The engine run failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Exposure statistics could not be computed.
    #[error(transparent)]
    Exposure(#[from] ExposureError),

    /// A collaborator failed outside the engine.
    #[error("{stage} failed: {message}")]
    Setup {
        /// Failing step
        stage: &'static str,
        /// Error message
        message: String,
    },

    /// Output could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Output {
        /// Output path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Report serialisation failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
