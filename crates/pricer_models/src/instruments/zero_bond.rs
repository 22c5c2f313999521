//! Zero coupon bond AMC calculators.
//!
//! The deflated value of a notional paid at `T` in the model currency `c`
//! is `notional * P_c(t, T) / N_c(t)`, zero once `t >= T`. Both calculator
//! interfaces are provided so the engine's two dispatch paths can be
//! exercised with the same payoff.

use std::sync::Arc;

use pricer_core::math::RandomVariable;
use pricer_core::types::Currency;

use crate::amc::{
    validate_multi_variate_input, CalculatorError, MultiVariateCalculator, SinglePathCalculator,
};
use crate::models::{AssetType, CrossAssetModel};
use crate::paths::MultiPath;
use crate::ModelError;

/// Zero coupon bond terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroBond {
    /// Payment currency
    pub currency: Currency,
    /// Payment time in model years
    pub maturity: f64,
    /// Amount paid at maturity
    pub notional: f64,
}

impl ZeroBond {
    fn deflated(&self, model: &CrossAssetModel, ccy: usize, t: f64, z: f64) -> f64 {
        if t >= self.maturity {
            0.0
        } else {
            self.notional * model.reduced_discount_bond(ccy, t, self.maturity, z)
        }
    }
}

/// Per-path zero bond calculator.
#[derive(Debug, Clone)]
pub struct ZeroBondCalculator {
    bond: ZeroBond,
    model: Arc<CrossAssetModel>,
    ccy_index: usize,
}

impl ZeroBondCalculator {
    /// Creates the calculator; the bond currency must be a model IR currency.
    pub fn new(bond: ZeroBond, model: Arc<CrossAssetModel>) -> Result<Self, ModelError> {
        let ccy_index = model.ccy_index(bond.currency)?;
        Ok(Self {
            bond,
            model,
            ccy_index,
        })
    }
}

impl SinglePathCalculator for ZeroBondCalculator {
    fn npv_currency(&self) -> Currency {
        self.bond.currency
    }

    fn simulate_path(
        &mut self,
        path: &MultiPath,
        _reuse_last_events: bool,
    ) -> Result<Vec<f64>, CalculatorError> {
        let state = &path[self.model.p_idx(AssetType::IR, self.ccy_index)];
        Ok((0..path.path_size())
            .map(|k| self.bond.deflated(&self.model, self.ccy_index, path.time(k), state[k]))
            .collect())
    }
}

/// Batched zero bond calculator.
#[derive(Debug, Clone)]
pub struct ZeroBondVectorCalculator {
    bond: ZeroBond,
    model: Arc<CrossAssetModel>,
    ccy_index: usize,
}

impl ZeroBondVectorCalculator {
    /// Creates the calculator; the bond currency must be a model IR currency.
    pub fn new(bond: ZeroBond, model: Arc<CrossAssetModel>) -> Result<Self, ModelError> {
        let ccy_index = model.ccy_index(bond.currency)?;
        Ok(Self {
            bond,
            model,
            ccy_index,
        })
    }
}

impl MultiVariateCalculator for ZeroBondVectorCalculator {
    fn npv_currency(&self) -> Currency {
        self.bond.currency
    }

    fn simulate_path(
        &mut self,
        path_times: &[f64],
        paths: &[Vec<RandomVariable>],
        is_relevant_time: &[bool],
        move_state_to_previous_time: bool,
    ) -> Result<Vec<RandomVariable>, CalculatorError> {
        let samples = validate_multi_variate_input(path_times, paths, is_relevant_time)?;
        let pos = self.model.p_idx(AssetType::IR, self.ccy_index);

        let mut result = Vec::with_capacity(1 + is_relevant_time.iter().filter(|r| **r).count());
        result.push(RandomVariable::constant(
            samples,
            self.bond.deflated(&self.model, self.ccy_index, 0.0, 0.0),
        ));

        for (j, _) in is_relevant_time.iter().enumerate().filter(|(_, r)| **r) {
            let state = paths[j].get(pos).ok_or_else(|| {
                CalculatorError::InvalidInput(format!("state component {pos} missing at time {j}"))
            })?;
            let t = if move_state_to_previous_time {
                j.checked_sub(1).map_or(0.0, |p| path_times[p])
            } else {
                path_times[j]
            };
            result.push(state.map(|z| self.bond.deflated(&self.model, self.ccy_index, t, z)));
        }

        Ok(result)
    }
}
