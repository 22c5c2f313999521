//! FX forward AMC calculator.
//!
//! Buys `foreign_notional` units of a foreign currency at `maturity` for
//! `strike` units of the base currency each. Values are expressed in the base
//! currency and deflated by the base numeraire:
//!
//! ```text
//! V(t) / N_0(t) = notional * (X(t) P_f(t, T) - K P_0(t, T)) / N_0(t)
//! ```

use std::sync::Arc;

use pricer_core::types::Currency;

use crate::amc::{CalculatorError, SinglePathCalculator};
use crate::models::{AssetType, CrossAssetModel};
use crate::paths::MultiPath;
use crate::ModelError;

/// FX forward terms.
#[derive(Debug, Clone, PartialEq)]
pub struct FxForward {
    /// Currency bought
    pub foreign: Currency,
    /// Foreign amount bought
    pub foreign_notional: f64,
    /// Base currency paid per unit of foreign
    pub strike: f64,
    /// Settlement time in model years
    pub maturity: f64,
}

/// Per-path FX forward calculator.
#[derive(Debug, Clone)]
pub struct FxForwardCalculator {
    trade: FxForward,
    model: Arc<CrossAssetModel>,
    foreign_index: usize,
}

impl FxForwardCalculator {
    /// Creates the calculator; the foreign currency must be a non-base model currency.
    pub fn new(trade: FxForward, model: Arc<CrossAssetModel>) -> Result<Self, ModelError> {
        let foreign_index = model.ccy_index(trade.foreign)?;
        if foreign_index == 0 {
            return Err(ModelError::InvalidStructure(format!(
                "FX forward foreign currency {} is the model base currency",
                trade.foreign
            )));
        }
        Ok(Self {
            trade,
            model,
            foreign_index,
        })
    }
}

impl SinglePathCalculator for FxForwardCalculator {
    fn npv_currency(&self) -> Currency {
        self.model.base_currency()
    }

    fn simulate_path(
        &mut self,
        path: &MultiPath,
        _reuse_last_events: bool,
    ) -> Result<Vec<f64>, CalculatorError> {
        let m = &self.model;
        let base_state = &path[m.p_idx(AssetType::IR, 0)];
        let foreign_state = &path[m.p_idx(AssetType::IR, self.foreign_index)];
        let log_spot = &path[m.p_idx(AssetType::FX, self.foreign_index - 1)];
        let mat = self.trade.maturity;

        let mut values = Vec::with_capacity(path.path_size());
        for k in 0..path.path_size() {
            let t = path.time(k);
            if t >= mat {
                values.push(0.0);
                continue;
            }
            let fx = log_spot[k].exp();
            let foreign_leg = fx * m.discount_bond(self.foreign_index, t, mat, foreign_state[k]);
            let base_leg = self.trade.strike * m.discount_bond(0, t, mat, base_state[k]);
            let value = self.trade.foreign_notional * (foreign_leg - base_leg)
                / m.numeraire(0, t, base_state[k]);
            if !value.is_finite() {
                return Err(CalculatorError::Evaluation(format!(
                    "non-finite FX forward value at t = {t}"
                )));
            }
            values.push(value);
        }
        Ok(values)
    }
}
