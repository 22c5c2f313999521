//! Engine error types.

use std::fmt;

use chrono::NaiveDate;
use pricer_core::types::CurrencyError;
use pricer_models::ModelError;
use thiserror::Error;

use crate::builders::BoxError;
use crate::cube::CubeError;
use crate::market::MarketError;
use crate::portfolio::PortfolioError;
use crate::scenario::{AggregationDataError, GridError};

/// Failure of one worker of a multi-threaded run.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerFailure {
    /// Worker index
    pub worker: usize,
    /// Error or panic message
    pub message: String,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}: {}", self.worker, self.message)
    }
}

fn join_failures(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(WorkerFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by the AMC valuation engine.
///
/// Per-trade problems are not errors at this level: they are logged and
/// recorded in the run report while the run continues.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The portfolio has no trades.
    #[error("portfolio is empty")]
    EmptyPortfolio,

    /// Cube rows do not match the portfolio.
    #[error("cube has {cube} ids, portfolio has {portfolio} trades")]
    IdDimensionMismatch {
        /// Ids in the cube
        cube: usize,
        /// Trades in the portfolio
        portfolio: usize,
    },

    /// Cube dates do not match the valuation dates of the grid.
    #[error("cube has {cube} dates, grid has {grid} valuation dates")]
    DateDimensionMismatch {
        /// Dates in the cube
        cube: usize,
        /// Valuation dates in the grid
        grid: usize,
    },

    /// Cube depth cannot hold close-out values.
    #[error("cube depth {cube} too small, close-out lag requires at least {required}")]
    DepthMismatch {
        /// Cube depth
        cube: usize,
        /// Required depth
        required: usize,
    },

    /// Seed zero is reserved.
    #[error("seed must not be zero")]
    ZeroSeed,

    /// The cube or setup holds no samples.
    #[error("number of samples must not be zero")]
    ZeroSamples,

    /// No worker thread would run.
    #[error("effective number of threads is zero")]
    ZeroThreads,

    /// The operation belongs to the other engine mode.
    #[error("{operation} requires a {required} engine")]
    WrongMode {
        /// Called operation
        operation: &'static str,
        /// Mode the operation needs
        required: &'static str,
    },

    /// Model and grid use different day counters.
    #[error("model day counter ({model}) differs from date grid day counter ({grid})")]
    DayCounterMismatch {
        /// Model day counter name
        model: &'static str,
        /// Grid day counter name
        grid: &'static str,
    },

    /// Aggregation data needs a market to resolve indices.
    #[error("aggregation scenario data requested but no market given")]
    MarketRequired,

    /// A close-out date precedes every valuation date.
    #[error("first date in grid must be a valuation date (close-out date {date} at grid index {index})")]
    CloseOutBeforeValuation {
        /// Grid index of the close-out date
        index: usize,
        /// The close-out date
        date: NaiveDate,
    },

    /// Sticky-date layout needs one close-out date per valuation date.
    #[error("sticky date mode needs one close-out date per valuation date ({valuation} valuation, {close_out} close-out)")]
    StickyDateLayout {
        /// Valuation dates
        valuation: usize,
        /// Close-out dates
        close_out: usize,
    },

    /// The path generator does not simulate on the grid.
    #[error("path has {actual} times, date grid has {expected}")]
    PathShape {
        /// Grid times including t_0
        expected: usize,
        /// Path times
        actual: usize,
    },

    /// Cube access failed.
    #[error(transparent)]
    Cube(#[from] CubeError),

    /// A currency code is not recognised.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Model or path generation failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Date grid is invalid.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Portfolio handling failed.
    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    /// Writing aggregation data failed.
    #[error(transparent)]
    AggregationData(#[from] AggregationDataError),

    /// Market lookup failed.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Failure inside a single-threaded run.
    #[error("error during amc val engine run: {0}")]
    Run(Box<EngineError>),

    /// One or more workers of a multi-threaded run failed.
    #[error("{} amc worker(s) failed: {}", .0.len(), join_failures(.0))]
    WorkerFailures(Vec<WorkerFailure>),

    /// A collaborator could not build its object.
    #[error("{stage} failed: {source}")]
    Collaborator {
        /// Build stage, e.g. `market builder`
        stage: &'static str,
        /// Collaborator error
        source: BoxError,
    },

    /// The worker pool could not be created.
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}

impl EngineError {
    /// Wraps `self` as a single-threaded run failure.
    pub fn into_run_error(self) -> Self {
        match self {
            EngineError::Run(_) => self,
            other => EngineError::Run(Box::new(other)),
        }
    }

    pub(crate) fn collaborator(stage: &'static str) -> impl FnOnce(BoxError) -> Self {
        move |source| EngineError::Collaborator { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_wrapping() {
        let err = EngineError::EmptyPortfolio.into_run_error();
        assert_eq!(err.to_string(), "error during amc val engine run: portfolio is empty");
        let again = err.into_run_error();
        assert!(matches!(again, EngineError::Run(inner) if matches!(*inner, EngineError::EmptyPortfolio)));
    }

    #[test]
    fn test_worker_failures_display() {
        let err = EngineError::WorkerFailures(vec![
            WorkerFailure {
                worker: 0,
                message: "market builder failed".to_string(),
            },
            WorkerFailure {
                worker: 2,
                message: "panic: boom".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 amc worker(s) failed"));
        assert!(msg.contains("worker 0: market builder failed"));
        assert!(msg.contains("worker 2: panic: boom"));
    }

    #[test]
    fn test_collaborator_source() {
        let source: BoxError = "no curves".into();
        let err = EngineError::collaborator("market builder")(source);
        assert_eq!(err.to_string(), "market builder failed: no curves");
        assert!(std::error::Error::source(&err).is_some());
    }
}
