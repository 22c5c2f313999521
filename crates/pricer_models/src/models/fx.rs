//! Lognormal FX component.

use pricer_core::types::Currency;

use crate::error::ModelError;

/// Black-Scholes FX parametrisation for one foreign currency.
///
/// The spot is quoted as units of the model's base currency per unit of the
/// foreign currency. The model state is the log spot.
#[derive(Debug, Clone, PartialEq)]
pub struct FxBsParametrization {
    currency: Currency,
    spot: f64,
    sigma: f64,
}

impl FxBsParametrization {
    /// Creates an FX component; `spot` must be positive and `sigma` non-negative.
    pub fn new(currency: Currency, spot: f64, sigma: f64) -> Result<Self, ModelError> {
        if !(spot.is_finite() && spot > 0.0) {
            return Err(ModelError::InvalidParameter { name: "spot", value: spot });
        }
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(ModelError::InvalidParameter { name: "sigma", value: sigma });
        }
        Ok(Self {
            currency,
            spot,
            sigma,
        })
    }

    /// Foreign currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Initial spot (base per foreign).
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Lognormal volatility.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}
