//! Linear Gauss-Markov (LGM) interest-rate component.
//!
//! One-factor model with constant volatility `alpha` and mean reversion
//! `kappa` over a flat continuously compounded initial curve:
//!
//! ```text
//! H(t)    = (1 - exp(-kappa t)) / kappa          (H(t) = t for kappa = 0)
//! zeta(t) = alpha^2 t
//! N(t, z) = exp(H(t) z + 0.5 H(t)^2 zeta(t)) / P(0, t)
//! P(t, T, z) = P(0, T) / P(0, t) exp(-(H(T) - H(t)) z - 0.5 (H(T)^2 - H(t)^2) zeta(t))
//! ```
//!
//! Under the LGM measure `P(t, T, z) / N(t, z)` is a martingale with
//! expectation `P(0, T)`.

use pricer_core::types::Currency;

use crate::error::ModelError;

const KAPPA_CUTOFF: f64 = 1e-10;

/// LGM parametrisation for one currency.
#[derive(Debug, Clone, PartialEq)]
pub struct LgmParametrization {
    currency: Currency,
    rate: f64,
    alpha: f64,
    kappa: f64,
}

impl LgmParametrization {
    /// Creates an LGM component.
    ///
    /// * `rate` - flat continuously compounded zero rate of the initial curve
    /// * `alpha` - state volatility, non-negative
    /// * `kappa` - mean reversion speed
    pub fn new(currency: Currency, rate: f64, alpha: f64, kappa: f64) -> Result<Self, ModelError> {
        if !rate.is_finite() {
            return Err(ModelError::InvalidParameter { name: "rate", value: rate });
        }
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(ModelError::InvalidParameter { name: "alpha", value: alpha });
        }
        if !kappa.is_finite() {
            return Err(ModelError::InvalidParameter { name: "kappa", value: kappa });
        }
        Ok(Self {
            currency,
            rate,
            alpha,
            kappa,
        })
    }

    /// Currency of the component.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Flat zero rate of the initial curve.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// State volatility.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Mean reversion speed.
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// `H(t)`.
    #[inline]
    pub fn h(&self, t: f64) -> f64 {
        if self.kappa.abs() < KAPPA_CUTOFF {
            t
        } else {
            (1.0 - (-self.kappa * t).exp()) / self.kappa
        }
    }

    /// `zeta(t)`, the variance of the state at `t`.
    #[inline]
    pub fn zeta(&self, t: f64) -> f64 {
        self.alpha * self.alpha * t
    }

    /// Initial discount factor `P(0, t)`.
    #[inline]
    pub fn discount(&self, t: f64) -> f64 {
        (-self.rate * t).exp()
    }

    /// Numeraire `N(t, z)`.
    pub fn numeraire(&self, t: f64, z: f64) -> f64 {
        let h = self.h(t);
        (h * z + 0.5 * h * h * self.zeta(t)).exp() / self.discount(t)
    }

    /// Discount bond `P(t, T, z)`.
    pub fn discount_bond(&self, t: f64, maturity: f64, z: f64) -> f64 {
        let ht = self.h(t);
        let hm = self.h(maturity);
        self.discount(maturity) / self.discount(t)
            * (-(hm - ht) * z - 0.5 * (hm * hm - ht * ht) * self.zeta(t)).exp()
    }

    /// Numeraire-deflated discount bond `P(t, T, z) / N(t, z)`.
    pub fn reduced_discount_bond(&self, t: f64, maturity: f64, z: f64) -> f64 {
        let hm = self.h(maturity);
        self.discount(maturity) * (-hm * z - 0.5 * hm * hm * self.zeta(t)).exp()
    }

    /// Simply compounded forward rate over `[t, t + tau]` seen at `t`.
    pub fn simple_forward_rate(&self, t: f64, tau: f64, z: f64) -> f64 {
        (1.0 / self.discount_bond(t, t + tau, z) - 1.0) / tau
    }
}
