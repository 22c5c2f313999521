//! Core financial and time types.
//!
//! - `currency`: ISO 4217 currency codes
//! - `time`: Day count conventions and tenors
//! - `error`: Error types for parsing and validation

pub mod currency;
pub mod error;
pub mod time;

pub use currency::Currency;
pub use error::{CurrencyError, DayCountError, TenorError};
pub use time::{DayCountConvention, Tenor, TenorUnit};
