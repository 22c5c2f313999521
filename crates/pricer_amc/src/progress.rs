//! Progress reporting.
//!
//! Indicators receive `(done, total)` updates. The engine reports `(0, n+1)`
//! at start, one step per trade during calculator extraction and a final
//! step once all calculators have been valued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use tracing::info;

/// Receiver of progress updates.
pub trait ProgressIndicator: Send + Sync {
    /// Reports `done` of `total` steps.
    fn update_progress(&self, done: usize, total: usize);
}

/// Forwards updates to every registered indicator.
#[derive(Default, Clone)]
pub struct ProgressReporter {
    indicators: Vec<Arc<dyn ProgressIndicator>>,
}

impl ProgressReporter {
    /// Reporter without indicators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an indicator.
    pub fn register(&mut self, indicator: Arc<dyn ProgressIndicator>) {
        self.indicators.push(indicator);
    }

    /// Registered indicators.
    pub fn indicators(&self) -> &[Arc<dyn ProgressIndicator>] {
        &self.indicators
    }
}

impl ProgressIndicator for ProgressReporter {
    fn update_progress(&self, done: usize, total: usize) {
        for indicator in &self.indicators {
            indicator.update_progress(done, total);
        }
    }
}

/// Logs progress through `tracing` every time another `1/steps` of the
/// total is completed.
pub struct ProgressLog {
    name: String,
    steps: usize,
    last_step: Mutex<usize>,
}

impl ProgressLog {
    /// Logger emitting at most `steps` messages per run.
    pub fn new(name: impl Into<String>, steps: usize) -> Self {
        Self {
            name: name.into(),
            steps: steps.max(1),
            last_step: Mutex::new(0),
        }
    }
}

impl ProgressIndicator for ProgressLog {
    fn update_progress(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let step = done.min(total) * self.steps / total;
        let mut last = self.last_step.lock().unwrap_or_else(PoisonError::into_inner);
        if done == 0 {
            *last = 0;
        } else if step > *last {
            *last = step;
            info!(name = %self.name, done, total, "{} {}% done", self.name, step * 100 / self.steps);
        }
    }
}

/// Combines the progress of several worker threads.
///
/// Each thread's latest `(done, total)` is kept; registered indicators see
/// the sums over all threads that have reported so far.
#[derive(Default)]
pub struct MultiThreadedProgressIndicator {
    indicators: Vec<Arc<dyn ProgressIndicator>>,
    threads: Mutex<HashMap<ThreadId, (usize, usize)>>,
}

impl MultiThreadedProgressIndicator {
    /// Combiner forwarding to `indicators`.
    pub fn new(indicators: Vec<Arc<dyn ProgressIndicator>>) -> Self {
        Self {
            indicators,
            threads: Mutex::new(HashMap::new()),
        }
    }
}

impl ProgressIndicator for MultiThreadedProgressIndicator {
    fn update_progress(&self, done: usize, total: usize) {
        let (sum_done, sum_total) = {
            let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
            threads.insert(thread::current().id(), (done, total));
            threads
                .values()
                .fold((0, 0), |(d, t), &(done, total)| (d + done, t + total))
        };
        for indicator in &self.indicators {
            indicator.update_progress(sum_done, sum_total);
        }
    }
}
