//! Demo portfolio command implementation
//!
//! Writes the demo trades as a portfolio definition that `run --portfolio`
//! accepts.

use std::path::Path;

use pricer_amc::config::AmcEngineConfig;
use pricer_amc::demo::demo_portfolio_definition;
use tracing::info;

use crate::{CliError, Result};

/// Run the demo-portfolio command
pub fn run(config: &AmcEngineConfig, trades: usize, output: &Path) -> Result<()> {
    if trades == 0 {
        return Err(CliError::InvalidArgument("trades must be greater than 0".to_string()));
    }
    let definition = demo_portfolio_definition(config.asof, trades);
    std::fs::write(output, definition.to_json()?).map_err(|source| CliError::Output {
        path: output.to_path_buf(),
        source,
    })?;
    info!(trades, path = %output.display(), "Demo portfolio written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricer_amc::portfolio::PortfolioDefinition;

    #[test]
    fn test_writes_readable_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.json");
        let config = AmcEngineConfig::new(chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

        run(&config, 5, &path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        let definition = PortfolioDefinition::from_json(&json).unwrap();
        assert_eq!(definition.len(), 5);
    }

    #[test]
    fn test_zero_trades_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = AmcEngineConfig::new(chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(matches!(
            run(&config, 0, &dir.path().join("p.json")),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
