//! Cross-asset model: LGM interest-rate components joined by lognormal FX.
//!
//! Component 0 is the base (domestic) currency. Every further IR component
//! `i` has an FX component `i - 1` quoting its currency against the base.
//! The state vector is laid out as all IR states followed by all FX log
//! spots, so [`CrossAssetModel::p_idx`] is the position of a component in a
//! simulated [`MultiPath`](crate::paths::MultiPath).
//!
//! Dynamics under the base LGM measure, Euler-discretised in
//! [`CrossAssetModel::evolve`]:
//!
//! ```text
//! dz_0 = alpha_0 dW_0
//! dz_i = (-H_i alpha_i^2 + H_0 alpha_0 alpha_i rho(z_0, z_i) - sigma_i alpha_i rho(z_i, x_i)) dt
//!        + alpha_i dW_i
//! d ln x_i = (r_0 - r_i - 0.5 sigma_i^2 + H_0 alpha_0 sigma_i rho(z_0, x_i)) dt + sigma_i dW_{x_i}
//! ```

use pricer_core::types::{Currency, DayCountConvention};

use super::correlation::{CholeskyFactor, CorrelationMatrix};
use super::fx::FxBsParametrization;
use super::lgm::LgmParametrization;
use crate::error::ModelError;

/// Kind of model component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    /// LGM interest-rate state
    IR,
    /// FX log spot against the base currency
    FX,
}

/// Joint IR/FX simulation model.
#[derive(Debug, Clone)]
pub struct CrossAssetModel {
    irs: Vec<LgmParametrization>,
    fxs: Vec<FxBsParametrization>,
    correlation: CorrelationMatrix,
    cholesky: CholeskyFactor,
    day_counter: DayCountConvention,
}

impl CrossAssetModel {
    /// Builds a model from its components and a factor correlation matrix of
    /// dimension `irs.len() + fxs.len()`.
    pub fn new(
        irs: Vec<LgmParametrization>,
        fxs: Vec<FxBsParametrization>,
        correlation: CorrelationMatrix,
        day_counter: DayCountConvention,
    ) -> Result<Self, ModelError> {
        if irs.is_empty() {
            return Err(ModelError::InvalidStructure(
                "at least one IR component is required".to_string(),
            ));
        }
        if fxs.len() + 1 != irs.len() {
            return Err(ModelError::InvalidStructure(format!(
                "{} IR components need {} FX components, got {}",
                irs.len(),
                irs.len() - 1,
                fxs.len()
            )));
        }
        for (k, fx) in fxs.iter().enumerate() {
            if fx.currency() != irs[k + 1].currency() {
                return Err(ModelError::InvalidStructure(format!(
                    "FX component {k} quotes {} but IR component {} is {}",
                    fx.currency(),
                    k + 1,
                    irs[k + 1].currency()
                )));
            }
        }
        for (i, ir) in irs.iter().enumerate() {
            if irs[..i].iter().any(|other| other.currency() == ir.currency()) {
                return Err(ModelError::InvalidStructure(format!(
                    "duplicate IR currency {}",
                    ir.currency()
                )));
            }
        }
        let dim = irs.len() + fxs.len();
        if correlation.dim() != dim {
            return Err(ModelError::InvalidStructure(format!(
                "correlation dimension {} does not match state size {dim}",
                correlation.dim()
            )));
        }
        let cholesky = correlation.cholesky()?;

        Ok(Self {
            irs,
            fxs,
            correlation,
            cholesky,
            day_counter,
        })
    }

    /// Model with independent factors.
    pub fn uncorrelated(
        irs: Vec<LgmParametrization>,
        fxs: Vec<FxBsParametrization>,
        day_counter: DayCountConvention,
    ) -> Result<Self, ModelError> {
        let dim = irs.len() + fxs.len();
        Self::new(irs, fxs, CorrelationMatrix::identity(dim), day_counter)
    }

    /// Number of components of the given type.
    pub fn components(&self, asset_type: AssetType) -> usize {
        match asset_type {
            AssetType::IR => self.irs.len(),
            AssetType::FX => self.fxs.len(),
        }
    }

    /// Position of component `i` of `asset_type` in the state vector.
    #[inline]
    pub fn p_idx(&self, asset_type: AssetType, i: usize) -> usize {
        match asset_type {
            AssetType::IR => i,
            AssetType::FX => self.irs.len() + i,
        }
    }

    /// Total state dimension.
    pub fn state_size(&self) -> usize {
        self.irs.len() + self.fxs.len()
    }

    /// Index of the IR component denominated in `currency`.
    pub fn ccy_index(&self, currency: Currency) -> Result<usize, ModelError> {
        self.irs
            .iter()
            .position(|ir| ir.currency() == currency)
            .ok_or(ModelError::UnknownCurrency(currency))
    }

    /// Base currency (IR component 0).
    pub fn base_currency(&self) -> Currency {
        self.irs[0].currency()
    }

    /// IR component `i`.
    pub fn ir(&self, i: usize) -> &LgmParametrization {
        &self.irs[i]
    }

    /// FX component `i` (quoting IR currency `i + 1`).
    pub fn fx(&self, i: usize) -> &FxBsParametrization {
        &self.fxs[i]
    }

    /// Day counter used to convert dates into model time.
    pub fn day_counter(&self) -> DayCountConvention {
        self.day_counter
    }

    /// Factor correlation matrix.
    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    /// Cholesky factor of the correlation matrix.
    pub fn cholesky(&self) -> &CholeskyFactor {
        &self.cholesky
    }

    /// Numeraire of currency `ccy` at time `t` for LGM state `z`.
    #[inline]
    pub fn numeraire(&self, ccy: usize, t: f64, z: f64) -> f64 {
        self.irs[ccy].numeraire(t, z)
    }

    /// Discount bond `P(t, T)` in currency `ccy`.
    #[inline]
    pub fn discount_bond(&self, ccy: usize, t: f64, maturity: f64, z: f64) -> f64 {
        self.irs[ccy].discount_bond(t, maturity, z)
    }

    /// Deflated discount bond `P(t, T) / N(t)` in currency `ccy`.
    #[inline]
    pub fn reduced_discount_bond(&self, ccy: usize, t: f64, maturity: f64, z: f64) -> f64 {
        self.irs[ccy].reduced_discount_bond(t, maturity, z)
    }

    /// Simple forward rate over `[t, t + tau]` in currency `ccy`.
    pub fn simple_forward_rate(&self, ccy: usize, t: f64, tau: f64, z: f64) -> f64 {
        self.irs[ccy].simple_forward_rate(t, tau, z)
    }

    /// State at time zero: IR states are zero, FX states are log spots.
    pub fn initial_state(&self) -> Vec<f64> {
        let mut state = vec![0.0; self.state_size()];
        for (k, fx) in self.fxs.iter().enumerate() {
            state[self.p_idx(AssetType::FX, k)] = fx.spot().ln();
        }
        state
    }

    /// One Euler step from `t` over `dt`.
    ///
    /// `dw` holds correlated standard normals (one per state component);
    /// the result is written to `next`.
    pub fn evolve(&self, t: f64, dt: f64, current: &[f64], dw: &[f64], next: &mut [f64]) {
        let sqrt_dt = dt.sqrt();
        let base = &self.irs[0];
        let h0 = base.h(t);
        let a0 = base.alpha();

        next[0] = current[0] + a0 * sqrt_dt * dw[0];

        for i in 1..self.irs.len() {
            let ir = &self.irs[i];
            let ai = ir.alpha();
            let fx_pos = self.p_idx(AssetType::FX, i - 1);
            let sigma = self.fxs[i - 1].sigma();
            let drift = -ir.h(t) * ai * ai + h0 * a0 * ai * self.correlation.get(0, i)
                - sigma * ai * self.correlation.get(i, fx_pos);
            next[i] = current[i] + drift * dt + ai * sqrt_dt * dw[i];
        }

        for (k, fx) in self.fxs.iter().enumerate() {
            let pos = self.p_idx(AssetType::FX, k);
            let sigma = fx.sigma();
            let drift = base.rate() - self.irs[k + 1].rate() - 0.5 * sigma * sigma
                + h0 * a0 * sigma * self.correlation.get(0, pos);
            next[pos] = current[pos] + drift * dt + sigma * sqrt_dt * dw[pos];
        }
    }
}
