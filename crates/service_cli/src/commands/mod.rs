//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

use std::path::Path;

use pricer_amc::config::AmcEngineConfig;

pub mod check;
pub mod demo_portfolio;
pub mod run;

/// Loads `path` with environment overrides.
///
/// A missing file yields the default configuration for today, so `run` and
/// `check` work without any setup.
pub fn load_config(path: &Path) -> crate::Result<AmcEngineConfig> {
    let config = if path.exists() {
        AmcEngineConfig::load(path)?
    } else {
        AmcEngineConfig::new(chrono::Local::now().date_naive())
    };
    Ok(config.with_env_override()?)
}
