//! Scenario generator settings.

use pricer_core::types::Tenor;
use pricer_models::paths::SequenceType;
use serde::{Deserialize, Serialize};

use super::grid::{DateGrid, GridError};

/// How close-out values are simulated when a margin period of risk is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MporMode {
    /// Close-out dates are ordinary simulation dates on the path
    #[default]
    ActualDate,
    /// Close-out states are valued with the valuation date's time, the date
    /// sticking while the market moves over the lag
    StickyDate,
}

/// Date grid, seed and sequence settings shared by every run of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioGeneratorData {
    grid: DateGrid,
    seed: u64,
    sequence_type: SequenceType,
    mpor_mode: MporMode,
}

impl ScenarioGeneratorData {
    /// Settings without a close-out lag.
    pub fn new(grid: DateGrid, seed: u64) -> Self {
        Self {
            grid,
            seed,
            sequence_type: SequenceType::default(),
            mpor_mode: MporMode::default(),
        }
    }

    /// Sets the random sequence type.
    pub fn with_sequence_type(mut self, sequence_type: SequenceType) -> Self {
        self.sequence_type = sequence_type;
        self
    }

    /// Adds close-out dates `lag` after every valuation date.
    ///
    /// Sticky-date mode needs exactly one close-out date per valuation date.
    pub fn with_mpor(mut self, lag: Tenor, mode: MporMode) -> Result<Self, GridError> {
        let grid = self.grid.with_close_out_lag(lag)?;
        if mode == MporMode::StickyDate {
            let valuation = grid.valuation_dates().len();
            let close_out = grid.close_out_dates().len();
            if valuation != close_out {
                return Err(GridError::StickyDateMismatch {
                    valuation,
                    close_out,
                });
            }
        }
        self.grid = grid;
        self.mpor_mode = mode;
        Ok(self)
    }

    /// Simulation date grid.
    pub fn grid(&self) -> &DateGrid {
        &self.grid
    }

    /// Path generator seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random sequence type.
    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// True when close-out dates are simulated.
    pub fn with_close_out_lag(&self) -> bool {
        self.grid.close_out_lag().is_some()
    }

    /// True when close-out values use the sticky-date layout.
    pub fn with_mpor_sticky_date(&self) -> bool {
        self.with_close_out_lag() && self.mpor_mode == MporMode::StickyDate
    }

    /// Close-out simulation mode.
    pub fn mpor_mode(&self) -> MporMode {
        self.mpor_mode
    }
}
