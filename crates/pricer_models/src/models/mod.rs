//! Simulation models.
//!
//! - `lgm`: one-factor LGM interest-rate component
//! - `fx`: lognormal FX component
//! - `correlation`: factor correlation and Cholesky factorisation
//! - `cross_asset`: the joint IR/FX model driven by the path generator

pub mod correlation;
pub mod cross_asset;
pub mod fx;
pub mod lgm;

pub use correlation::{CholeskyFactor, CorrelationError, CorrelationMatrix};
pub use cross_asset::{AssetType, CrossAssetModel};
pub use fx::FxBsParametrization;
pub use lgm::LgmParametrization;
