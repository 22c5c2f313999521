//! Portfolio error types.

use thiserror::Error;

/// Errors that can occur during portfolio operations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Trade not found in portfolio.
    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    /// Duplicate trade ID encountered.
    #[error("Duplicate trade ID: {0}")]
    DuplicateTrade(String),

    /// Transferable portfolio form could not be written or read.
    #[error("Portfolio serialisation failed: {0}")]
    Serialisation(#[from] serde_json::Error),

    /// A split into zero parts was requested.
    #[error("Cannot split portfolio into zero parts")]
    ZeroSplit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_trade_not_found() {
        let err = PortfolioError::TradeNotFound("TRADE001".to_string());
        assert_eq!(format!("{}", err), "Trade not found: TRADE001");
    }

    #[test]
    fn test_error_display_duplicate_trade() {
        let err = PortfolioError::DuplicateTrade("TRADE001".to_string());
        assert_eq!(format!("{}", err), "Duplicate trade ID: TRADE001");
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: PortfolioError = serde_err.into();
        assert!(err.to_string().starts_with("Portfolio serialisation failed"));
    }
}
