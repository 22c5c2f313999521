//! Error types for model construction and path generation.

use pricer_core::types::Currency;
use thiserror::Error;

use crate::models::correlation::CorrelationError;

/// Errors raised while building or querying a cross-asset model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A model parameter is outside its admissible range.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// The currency is not an IR component of the model.
    #[error("Currency {0} is not covered by the model")]
    UnknownCurrency(Currency),

    /// The component layout is inconsistent.
    #[error("Invalid model structure: {0}")]
    InvalidStructure(String),

    /// The time grid does not start at zero or is not increasing.
    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),

    /// Correlation matrix validation or factorisation failed.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}
