//! AMC calculator capabilities.
//!
//! A built instrument that supports American Monte Carlo valuation hands the
//! engine exactly one [`AmcCalculator`]. The variant decides how the engine
//! drives it:
//!
//! - [`SinglePathCalculator`]: called once per sample with the full path (or
//!   a filtered sub-path in sticky-date mode); returns one value per path time.
//! - [`MultiVariateCalculator`]: called once after all samples with the
//!   cached states of every sample as [`RandomVariable`]s; returns one random
//!   variable per relevant time.
//!
//! In both cases index 0 of the result is the time-zero value and values are
//! numeraire-deflated amounts in [`npv_currency`](AmcCalculator::npv_currency).

use pricer_core::math::RandomVariable;
use pricer_core::types::Currency;
use thiserror::Error;

use crate::paths::MultiPath;

/// Failure of a calculator on a path or batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    /// The instrument cannot be valued with AMC.
    #[error("AMC not supported: {0}")]
    NotSupported(String),

    /// Inputs do not have the expected shape.
    #[error("Invalid calculator input: {0}")]
    InvalidInput(String),

    /// Valuation failed numerically.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

/// Per-path valuation.
pub trait SinglePathCalculator: Send {
    /// Currency of the returned values.
    fn npv_currency(&self) -> Currency;

    /// Values along `path`, one per path time.
    ///
    /// `reuse_last_events` is true for the close-out sub-path in sticky-date
    /// mode: the calculator should reuse the exercise and cash flow decisions
    /// of the preceding valuation call.
    fn simulate_path(
        &mut self,
        path: &MultiPath,
        reuse_last_events: bool,
    ) -> Result<Vec<f64>, CalculatorError>;
}

/// Batched valuation over all samples.
pub trait MultiVariateCalculator: Send {
    /// Currency of the returned values.
    fn npv_currency(&self) -> Currency;

    /// Values at the relevant path times.
    ///
    /// `path_times` excludes `t_0`; `paths[j][s]` is state component `s` at
    /// `path_times[j]` over all samples. The result has
    /// `1 + count(is_relevant_time)` entries. With
    /// `move_state_to_previous_time` the state observed at a relevant time is
    /// valued at the preceding path time.
    fn simulate_path(
        &mut self,
        path_times: &[f64],
        paths: &[Vec<RandomVariable>],
        is_relevant_time: &[bool],
        move_state_to_previous_time: bool,
    ) -> Result<Vec<RandomVariable>, CalculatorError>;
}

/// Calculator exposed by an instrument, resolved once at extraction.
pub enum AmcCalculator {
    /// Per-path interface
    SinglePath(Box<dyn SinglePathCalculator>),
    /// Batched interface
    MultiVariates(Box<dyn MultiVariateCalculator>),
}

impl AmcCalculator {
    /// Currency of the calculator's values.
    pub fn npv_currency(&self) -> Currency {
        match self {
            AmcCalculator::SinglePath(c) => c.npv_currency(),
            AmcCalculator::MultiVariates(c) => c.npv_currency(),
        }
    }

    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AmcCalculator::SinglePath(_) => "single-path",
            AmcCalculator::MultiVariates(_) => "multi-variates",
        }
    }
}

impl std::fmt::Debug for AmcCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AmcCalculator")
            .field(&self.kind())
            .field(&self.npv_currency())
            .finish()
    }
}

/// Checks the shape of batched calculator inputs and returns the sample count.
pub fn validate_multi_variate_input(
    path_times: &[f64],
    paths: &[Vec<RandomVariable>],
    is_relevant_time: &[bool],
) -> Result<usize, CalculatorError> {
    if paths.len() != path_times.len() || is_relevant_time.len() != path_times.len() {
        return Err(CalculatorError::InvalidInput(format!(
            "path times ({}), paths ({}) and relevance mask ({}) differ in length",
            path_times.len(),
            paths.len(),
            is_relevant_time.len()
        )));
    }
    Ok(paths
        .first()
        .and_then(|states| states.first())
        .map_or(0, RandomVariable::size))
}
