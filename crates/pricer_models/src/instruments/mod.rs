//! Reference instruments with AMC calculators.
//!
//! - `zero_bond`: zero coupon bond, per-path and batched calculators
//! - `fx_forward`: FX forward against the model base currency

pub mod fx_forward;
pub mod zero_bond;

pub use fx_forward::{FxForward, FxForwardCalculator};
pub use zero_bond::{ZeroBond, ZeroBondCalculator, ZeroBondVectorCalculator};
