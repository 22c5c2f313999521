//! Close-out (MPOR) handling.
//!
//! The layout of cube writes depends only on the date grid, so it is resolved
//! once per run into a [`WritePlan`]: a list of slots saying which calculator
//! result goes to which cube cell and how it is converted.

use pricer_models::paths::MultiPath;

use crate::error::EngineError;
use crate::scenario::{DateGrid, ScenarioGeneratorData};

/// Close-out convention of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MporState {
    /// No close-out lag; every path time is a valuation date.
    NoLag,
    /// Close-out dates are simulated on the same path as valuation dates.
    ActualDate,
    /// Close-out values come from a second calculator call on the close-out
    /// states placed on the valuation times.
    StickyDate,
}

impl MporState {
    /// Convention configured in `scenario`.
    pub fn of(scenario: &ScenarioGeneratorData) -> Self {
        if !scenario.with_close_out_lag() {
            MporState::NoLag
        } else if scenario.with_mpor_sticky_date() {
            MporState::StickyDate
        } else {
            MporState::ActualDate
        }
    }
}

/// Calculator call a slot reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Valuation call (the only call outside sticky-date mode)
    Valuation,
    /// Close-out call in sticky-date mode
    CloseOut,
}

/// Numeraire applied when converting to the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumeraireConvention {
    /// `N(ccy, t) / N(base, t)`
    Ratio,
    /// `N(ccy, t)`
    Plain,
}

/// One cube write per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeSlot {
    /// Calculator call providing the value
    pub source: ResultSource,
    /// Index into that call's result
    pub result_index: usize,
    /// Time index into the FX and IR buffers
    pub buffer_index: usize,
    /// Model time used for the numeraire
    pub time: f64,
    /// Cube date index
    pub date_index: usize,
    /// Cube depth
    pub depth: usize,
    /// Numeraire convention
    pub numeraire: NumeraireConvention,
}

/// Resolved cube write layout of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    state: MporState,
    slots: Vec<CubeSlot>,
    valuation_len: usize,
    close_out_len: usize,
    valuation_mask: Vec<bool>,
    close_out_mask: Vec<bool>,
}

impl WritePlan {
    /// Compiles the plan for `grid` under `state`.
    pub fn compile(grid: &DateGrid, state: MporState) -> Result<Self, EngineError> {
        let times = grid.time_grid().times();
        let is_valuation = grid.is_valuation_date();
        let is_close_out = grid.is_close_out_date();
        let n = grid.size();
        let mut slots = Vec::with_capacity(2 * n);

        let close_out_before_valuation = |k: usize| EngineError::CloseOutBeforeValuation {
            index: k,
            date: grid.dates()[k],
        };

        match state {
            MporState::NoLag => {
                for k in 1..=n {
                    slots.push(CubeSlot {
                        source: ResultSource::Valuation,
                        result_index: k,
                        buffer_index: k,
                        time: times[k],
                        date_index: k - 1,
                        depth: 0,
                        numeraire: NumeraireConvention::Ratio,
                    });
                }
            }
            MporState::ActualDate => {
                let mut date_index: Option<usize> = None;
                for k in 1..=n {
                    if is_close_out[k - 1] {
                        let d = date_index.ok_or_else(|| close_out_before_valuation(k - 1))?;
                        slots.push(CubeSlot {
                            source: ResultSource::Valuation,
                            result_index: k,
                            buffer_index: k,
                            time: times[k],
                            date_index: d,
                            depth: 1,
                            numeraire: NumeraireConvention::Plain,
                        });
                    }
                    if is_valuation[k - 1] {
                        let d = date_index.map_or(0, |d| d + 1);
                        date_index = Some(d);
                        slots.push(CubeSlot {
                            source: ResultSource::Valuation,
                            result_index: k,
                            buffer_index: k,
                            time: times[k],
                            date_index: d,
                            depth: 0,
                            numeraire: NumeraireConvention::Ratio,
                        });
                    }
                }
            }
            MporState::StickyDate => {
                let valuation = is_valuation.iter().filter(|f| **f).count();
                let close_out = is_close_out.iter().filter(|f| **f).count();
                if valuation != close_out {
                    return Err(EngineError::StickyDateLayout {
                        valuation,
                        close_out,
                    });
                }
                let mut date_index: Option<usize> = None;
                for k in 0..n {
                    if is_close_out[k] {
                        let d = date_index.ok_or_else(|| close_out_before_valuation(k))?;
                        slots.push(CubeSlot {
                            source: ResultSource::CloseOut,
                            result_index: d + 1,
                            buffer_index: k + 1,
                            time: times[k],
                            date_index: d,
                            depth: 1,
                            numeraire: NumeraireConvention::Plain,
                        });
                    }
                    if is_valuation[k] {
                        let d = date_index.map_or(0, |d| d + 1);
                        date_index = Some(d);
                        slots.push(CubeSlot {
                            source: ResultSource::Valuation,
                            result_index: d + 1,
                            buffer_index: k + 1,
                            time: times[k + 1],
                            date_index: d,
                            depth: 0,
                            numeraire: NumeraireConvention::Ratio,
                        });
                    }
                }
            }
        }

        let (valuation_len, close_out_len, valuation_mask, close_out_mask) = match state {
            MporState::StickyDate => (
                grid.valuation_time_grid().len(),
                grid.close_out_time_grid().len(),
                is_valuation.to_vec(),
                is_close_out.to_vec(),
            ),
            _ => (n + 1, 0, vec![true; n], vec![false; n]),
        };

        Ok(Self {
            state,
            slots,
            valuation_len,
            close_out_len,
            valuation_mask,
            close_out_mask,
        })
    }

    /// Close-out convention.
    pub fn state(&self) -> MporState {
        self.state
    }

    /// Slots in write order.
    pub fn slots(&self) -> &[CubeSlot] {
        &self.slots
    }

    /// True when a second (close-out) calculator call is needed.
    pub fn has_close_out_call(&self) -> bool {
        self.state == MporState::StickyDate
    }

    /// Minimum result length of the valuation call, including `t_0`.
    pub fn valuation_len(&self) -> usize {
        self.valuation_len
    }

    /// Minimum result length of the close-out call, including `t_0`.
    pub fn close_out_len(&self) -> usize {
        self.close_out_len
    }

    /// Relevant path times of the batched valuation call.
    pub fn valuation_mask(&self) -> &[bool] {
        &self.valuation_mask
    }

    /// Relevant path times of the batched close-out call.
    pub fn close_out_mask(&self) -> &[bool] {
        &self.close_out_mask
    }
}

/// Sub-path for the sticky-date calls.
///
/// Keeps `t_0` and the states at valuation dates (or, with `close_out`, at
/// close-out dates), placed on the valuation time grid.
pub fn effective_simulation_path(grid: &DateGrid, path: &MultiPath, close_out: bool) -> MultiPath {
    let flags = if close_out {
        grid.is_close_out_date()
    } else {
        grid.is_valuation_date()
    };
    let target = grid.valuation_time_grid().clone();
    let capacity = target.len();
    let mut filtered = MultiPath::new(path.asset_number(), target);
    let mut t = 0;
    for i in 0..path.path_size() {
        if t >= capacity {
            break;
        }
        if i == 0 || flags[i - 1] {
            for j in 0..path.asset_number() {
                filtered[j][t] = path[j][i];
            }
            t += 1;
        }
    }
    filtered
}
