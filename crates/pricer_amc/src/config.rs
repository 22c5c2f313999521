//! Engine configuration.
//!
//! Loaded from TOML with environment variable overrides:
//!
//! ```toml
//! asof = "2024-01-02"
//! grid = "10,1Y"
//! day_counter = "ACT/365"
//! seed = 42
//! samples = 1000
//! threads = 4
//! sequence_type = "PseudoRandomAntithetic"
//!
//! [mpor]
//! lag = "2W"
//! mode = "StickyDate"
//!
//! [aggregation]
//! indices = ["EUR-EURIBOR-6M"]
//! currencies = ["USD"]
//! ```
//!
//! Overrides: `AMC_THREADS`, `AMC_SAMPLES`, `AMC_SEED`, `AMC_LOG_LEVEL`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pricer_core::types::{Currency, DayCountConvention, Tenor};
use pricer_models::paths::SequenceType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::AggregationDataRequest;
use crate::scenario::{DateGrid, GridError, MporMode, ScenarioGeneratorData};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {name}")]
    Env {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// Validation found one or more problems.
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The date grid could not be built.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Margin period of risk settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MporConfig {
    /// Close-out lag
    pub lag: Tenor,
    /// Close-out simulation mode
    #[serde(default)]
    pub mode: MporMode,
}

/// Settings of an AMC engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmcEngineConfig {
    /// Evaluation date
    pub asof: NaiveDate,

    /// Grid specification, `"<count>,<tenor>"`
    #[serde(default = "default_grid")]
    pub grid: String,

    /// Day counter of the date grid; must match the model's
    #[serde(default)]
    pub day_counter: DayCountConvention,

    /// Path generator seed, non-zero
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Monte Carlo samples
    #[serde(default = "default_samples")]
    pub samples: usize,

    /// Worker threads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Random sequence type
    #[serde(default)]
    pub sequence_type: SequenceType,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional close-out lag
    #[serde(default)]
    pub mpor: Option<MporConfig>,

    /// Aggregation scenario data to record
    #[serde(default)]
    pub aggregation: AggregationDataRequest,
}

fn default_grid() -> String {
    "10,1Y".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_samples() -> usize {
    1000
}

fn default_threads() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AmcEngineConfig {
    /// Default configuration for `asof`.
    pub fn new(asof: NaiveDate) -> Self {
        Self {
            asof,
            grid: default_grid(),
            day_counter: DayCountConvention::default(),
            seed: default_seed(),
            samples: default_samples(),
            threads: default_threads(),
            sequence_type: SequenceType::default(),
            log_level: default_log_level(),
            mpor: None,
            aggregation: AggregationDataRequest::default(),
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides looked up through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = lookup("AMC_THREADS") {
            self.threads = parse_override("AMC_THREADS", value)?;
        }
        if let Some(value) = lookup("AMC_SAMPLES") {
            self.samples = parse_override("AMC_SAMPLES", value)?;
        }
        if let Some(value) = lookup("AMC_SEED") {
            self.seed = parse_override("AMC_SEED", value)?;
        }
        if let Some(value) = lookup("AMC_LOG_LEVEL") {
            self.log_level = value;
        }
        Ok(self)
    }

    /// Checks the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, VALID_LOG_LEVELS
            ));
        }
        if self.seed == 0 {
            errors.push("seed must not be zero".to_string());
        }
        if self.samples == 0 {
            errors.push("samples must be greater than 0".to_string());
        }
        if self.threads == 0 {
            errors.push("threads must be greater than 0".to_string());
        }
        if let Err(e) = self.scenario_generator_data() {
            errors.push(format!("Invalid grid '{}': {e}", self.grid));
        }
        for code in &self.aggregation.currencies {
            if code.parse::<Currency>().is_err() {
                errors.push(format!("Unknown aggregation currency '{code}'"));
            }
        }
        for name in &self.aggregation.indices {
            if name.trim().is_empty() {
                errors.push("aggregation index names must not be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Loads a file, applies environment overrides and validates.
    pub fn load_with_env_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?.with_env_override()?;
        config.validate()?;
        Ok(config)
    }

    /// Date grid without close-out lag.
    pub fn date_grid(&self) -> Result<DateGrid, ConfigError> {
        Ok(DateGrid::from_spec(self.asof, &self.grid, self.day_counter)?)
    }

    /// Scenario generator data including the close-out lag, if configured.
    pub fn scenario_generator_data(&self) -> Result<ScenarioGeneratorData, ConfigError> {
        let data = ScenarioGeneratorData::new(self.date_grid()?, self.seed)
            .with_sequence_type(self.sequence_type);
        match self.mpor {
            Some(mpor) => Ok(data.with_mpor(mpor.lag, mpor.mode)?),
            None => Ok(data),
        }
    }
}

fn parse_override<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}
