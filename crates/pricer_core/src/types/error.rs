//! Error types for the foundation layer.
//!
//! Each parser in `types` reports failures through its own enum so callers
//! can match on the failing concern.

use thiserror::Error;

/// Currency-related errors.
///
/// # Examples
/// ```
/// use pricer_core::types::CurrencyError;
///
/// let err = CurrencyError::UnknownCurrency("XYZ".to_string());
/// assert_eq!(format!("{}", err), "Unknown currency: XYZ");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Unknown currency code.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// Day count convention errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DayCountError {
    /// The convention name is not recognised.
    #[error("Unknown day count convention: {0}")]
    UnknownConvention(String),
}

/// Tenor parsing and arithmetic errors.
///
/// # Examples
/// ```
/// use pricer_core::types::TenorError;
///
/// let err = TenorError::InvalidFormat("3X".to_string());
/// assert!(format!("{}", err).contains("3X"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenorError {
    /// The string is not of the form `<n><D|W|M|Y>`.
    #[error("Invalid tenor '{0}': expected <number><D|W|M|Y>")]
    InvalidFormat(String),

    /// Adding the tenor leaves the supported date range.
    #[error("Date overflow when adding {tenor} to {date}")]
    DateOverflow {
        /// Tenor being added.
        tenor: String,
        /// Start date.
        date: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_error_display() {
        let err = CurrencyError::UnknownCurrency("ABC".to_string());
        assert_eq!(err.to_string(), "Unknown currency: ABC");
    }

    #[test]
    fn test_day_count_error_display() {
        let err = DayCountError::UnknownConvention("ACT/999".to_string());
        assert_eq!(err.to_string(), "Unknown day count convention: ACT/999");
    }

    #[test]
    fn test_tenor_error_display() {
        let err = TenorError::DateOverflow {
            tenor: "1000Y".to_string(),
            date: "2024-01-01".to_string(),
        };
        assert!(err.to_string().contains("1000Y"));
        assert!(err.to_string().contains("2024-01-01"));
    }
}
