//! # pricer_core: Foundation Types for the AMC Valuation Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the workspace and provides:
//! - Currency types: [`Currency`](types::Currency) (`types::currency`)
//! - Time types: [`DayCountConvention`](types::DayCountConvention) and
//!   [`Tenor`](types::Tenor) (`types::time`)
//! - Sample vectors: [`RandomVariable`](math::RandomVariable) (`math::random_variable`)
//! - Error types: `CurrencyError`, `DayCountError`, `TenorError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates:
//! - chrono: Date arithmetic
//! - serde: Serialisation of configuration-facing types
//! - thiserror: Error derives
//!
//! ## Usage Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use pricer_core::types::{Currency, DayCountConvention, Tenor};
//! use pricer_core::math::RandomVariable;
//!
//! let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let three_months: Tenor = "3M".parse().unwrap();
//! let end = three_months.advance(asof).unwrap();
//! let t = DayCountConvention::ActualActual365.year_fraction(asof, end);
//! assert!(t > 0.24 && t < 0.26);
//!
//! assert_eq!(Currency::EUR.code(), "EUR");
//!
//! let x = RandomVariable::from_vec(vec![1.0, 2.0, 3.0]);
//! assert_eq!(x.mean(), 2.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod math;
pub mod types;
