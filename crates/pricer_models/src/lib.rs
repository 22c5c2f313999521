//! # pricer_models: Cross-Asset Simulation Model and AMC Calculators
//!
//! ## Layer 2 (Models) Role
//!
//! - `models`: LGM interest-rate components, lognormal FX components and the
//!   [`CrossAssetModel`](models::CrossAssetModel) that correlates them
//! - `rng`: seeded pseudo-random number generation
//! - `paths`: time grids, [`MultiPath`](paths::MultiPath) and the
//!   [`MultiPathGenerator`](paths::MultiPathGenerator) drawing one joint path
//!   per sample
//! - `amc`: the two calculator capabilities an instrument can expose to the
//!   AMC valuation engine
//! - `instruments`: reference AMC calculators (zero bond, FX forward)
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use pricer_core::types::{Currency, DayCountConvention};
//! use pricer_models::models::{CrossAssetModel, LgmParametrization};
//! use pricer_models::paths::{make_multi_path_generator, SequenceType, TimeGrid};
//!
//! let model = CrossAssetModel::uncorrelated(
//!     vec![LgmParametrization::new(Currency::EUR, 0.02, 0.01, 0.03).unwrap()],
//!     vec![],
//!     DayCountConvention::ActualActual365,
//! )
//! .unwrap();
//! let grid = TimeGrid::new(vec![0.0, 0.5, 1.0]).unwrap();
//! let mut generator =
//!     make_multi_path_generator(SequenceType::PseudoRandom, Arc::new(model), grid, 42).unwrap();
//! let path = generator.next();
//! assert_eq!(path.path_size(), 3);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod amc;
pub mod error;
pub mod instruments;
pub mod models;
pub mod paths;
pub mod rng;

pub use error::ModelError;
