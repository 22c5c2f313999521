//! Per-worker evaluation context.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How built objects react to market updates while a worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObservationMode {
    /// Objects observe their inputs
    #[default]
    None,
    /// Observation is switched off
    Disable,
    /// Notifications are deferred until the run ends
    Defer,
    /// Objects unregister from their inputs after building
    Unregister,
}

/// Settings a worker passes to every collaborator it calls.
///
/// Replaces process-wide state: each worker owns its context and hands a
/// reference to the market, model and portfolio builders.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    /// Valuation date of the run
    pub evaluation_date: NaiveDate,
    /// Observation mode for built objects
    pub observation_mode: ObservationMode,
    /// Index of the worker, 0 for single-threaded runs
    pub worker_id: usize,
}

impl EvaluationContext {
    /// Context for worker `worker_id`.
    pub fn new(evaluation_date: NaiveDate, observation_mode: ObservationMode, worker_id: usize) -> Self {
        Self {
            evaluation_date,
            observation_mode,
            worker_id,
        }
    }
}
