//! Core simulation loop.
//!
//! One invocation values a whole portfolio on one cube: calculators are
//! extracted, paths are drawn sample by sample, single-path calculators are
//! run on every path, and batched calculators run once on the cached states
//! after the last sample. All values are converted into the base currency
//! (IR component 0) before they are written.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pricer_core::math::RandomVariable;
use pricer_core::types::Currency;
use pricer_models::amc::{AmcCalculator, MultiVariateCalculator, SinglePathCalculator};
use pricer_models::models::{AssetType, CrossAssetModel};
use pricer_models::paths::{make_multi_path_generator, MultiPath, MultiPathGenerator};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::buffers::PathStateBuffers;
use super::mpor::{effective_simulation_path, MporState, ResultSource, WritePlan};
use crate::cube::NpvCube;
use crate::error::EngineError;
use crate::market::{IborIndexSpec, Market};
use crate::portfolio::{Portfolio, Trade};
use crate::progress::ProgressIndicator;
use crate::scenario::{AggregationScenarioData, AggregationScenarioDataType, DateGrid, ScenarioGeneratorData};

/// Observables to record as aggregation scenario data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationDataRequest {
    /// Ibor index names, e.g. `EUR-EURIBOR-6M`
    #[serde(default)]
    pub indices: Vec<String>,
    /// Currency codes whose FX spot against the base currency is recorded
    #[serde(default)]
    pub currencies: Vec<String>,
}

impl AggregationDataRequest {
    /// True when neither indices nor currencies are requested.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() && self.currencies.is_empty()
    }
}

/// Read-only inputs of one core loop run.
#[derive(Clone, Copy)]
pub struct CoreEngineInput<'a> {
    /// Trades to value
    pub portfolio: &'a Portfolio,
    /// Calibrated model
    pub model: &'a Arc<CrossAssetModel>,
    /// Market used to resolve aggregation indices
    pub market: Option<&'a dyn Market>,
    /// Grid, seed and sequence settings
    pub scenario: &'a ScenarioGeneratorData,
    /// Aggregation observables
    pub aggregation_request: &'a AggregationDataRequest,
}

/// Wall-clock time spent per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineTimings {
    /// Calculator extraction
    pub calibration: Duration,
    /// Path generation
    pub path_generation: Duration,
    /// Calculator calls and cube writes
    pub valuation: Duration,
    /// Aggregation data writes
    pub aggregation: Duration,
    /// Everything else
    pub residual: Duration,
    /// Whole run
    pub total: Duration,
}

impl EngineTimings {
    fn log(&self) {
        info!(
            calibration = self.calibration.as_secs_f64(),
            path_generation = self.path_generation.as_secs_f64(),
            valuation = self.valuation.as_secs_f64(),
            aggregation = self.aggregation.as_secs_f64(),
            residual = self.residual.as_secs_f64(),
            total = self.total.as_secs_f64(),
            "AMC core engine timings (sec)"
        );
    }

    fn accumulate(&mut self, other: &EngineTimings) {
        self.calibration += other.calibration;
        self.path_generation += other.path_generation;
        self.valuation += other.valuation;
        self.aggregation += other.aggregation;
        self.residual += other.residual;
        self.total += other.total;
    }
}

/// A trade that could not be valued, in whole or on one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeFailure {
    /// Trade id
    pub trade_id: String,
    /// Trade type
    pub trade_type: String,
    /// Sample index for single-path valuation failures
    pub sample: Option<usize>,
    /// Error message
    pub message: String,
}

/// Outcome of a core loop run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreEngineReport {
    /// Trades in the portfolio
    pub trades: usize,
    /// Calculators extracted
    pub calculators: usize,
    /// Trades skipped at extraction
    pub extraction_failures: Vec<TradeFailure>,
    /// Failed calculator calls, replaced by zeros
    pub valuation_failures: Vec<TradeFailure>,
    /// Phase timings
    pub timings: EngineTimings,
}

impl CoreEngineReport {
    /// Adds the counts, failures and timings of `other`.
    pub fn merge(&mut self, other: CoreEngineReport) {
        self.trades += other.trades;
        self.calculators += other.calculators;
        self.extraction_failures.extend(other.extraction_failures);
        self.valuation_failures.extend(other.valuation_failures);
        self.timings.accumulate(&other.timings);
    }

    fn record_valuation_failure(&mut self, calc: &Extracted, sample: Option<usize>, message: String) {
        error!(
            trade_id = %calc.trade_id,
            trade_type = %calc.trade_type,
            sample = ?sample,
            error = %message,
            "Error during amc path simulation, contribution set to zero"
        );
        self.valuation_failures.push(TradeFailure {
            trade_id: calc.trade_id.clone(),
            trade_type: calc.trade_type.clone(),
            sample,
            message,
        });
    }
}

struct Extracted {
    calculator: AmcCalculator,
    trade_id: String,
    trade_type: String,
    row: usize,
    multiplier: f64,
    ccy: usize,
    t0_written: bool,
}

struct ResolvedAggregation {
    currencies: Vec<(usize, String)>,
    indices: Vec<(IborIndexSpec, usize)>,
}

/// Runs the core loop with the path generator configured in the scenario.
pub fn run_core_engine(
    input: &CoreEngineInput<'_>,
    asd: Option<&mut dyn AggregationScenarioData>,
    cube: &mut dyn NpvCube,
    progress: &dyn ProgressIndicator,
) -> Result<CoreEngineReport, EngineError> {
    let scenario = input.scenario;
    let mut generator = make_multi_path_generator(
        scenario.sequence_type(),
        Arc::clone(input.model),
        scenario.grid().time_grid().clone(),
        scenario.seed(),
    )?;
    run_core_engine_with_generator(input, generator.as_mut(), asd, cube, progress)
}

/// Runs the core loop drawing one path per cube sample from `generator`.
///
/// The generator must simulate on the full grid time grid.
pub fn run_core_engine_with_generator(
    input: &CoreEngineInput<'_>,
    generator: &mut dyn MultiPathGenerator,
    mut asd: Option<&mut dyn AggregationScenarioData>,
    cube: &mut dyn NpvCube,
    progress: &dyn ProgressIndicator,
) -> Result<CoreEngineReport, EngineError> {
    if cube.samples() == 0 {
        return Err(EngineError::ZeroSamples);
    }
    let start = Instant::now();
    let model = input.model.as_ref();
    let grid = input.scenario.grid();
    let total_steps = input.portfolio.size() + 1;
    let mut done = 0;
    progress.update_progress(done, total_steps);

    let mut report = CoreEngineReport {
        trades: input.portfolio.size(),
        ..CoreEngineReport::default()
    };

    let aggregation = if asd.is_some() {
        Some(resolve_aggregation(input)?)
    } else {
        debug!("No aggregation scenario data set, skipping");
        None
    };

    let timer = Instant::now();
    let mut calculators = Vec::with_capacity(input.portfolio.size());
    for trade in input.portfolio.trades() {
        match extract(trade, model, cube) {
            Ok(calc) => {
                debug!(trade_id = %calc.trade_id, kind = calc.calculator.kind(), "AMC calculator extracted");
                calculators.push(calc);
            }
            Err(message) => {
                error!(
                    trade_id = %trade.id(),
                    trade_type = trade.trade_type(),
                    error = %message,
                    "Error building trade for AMC simulation"
                );
                report.extraction_failures.push(TradeFailure {
                    trade_id: trade.id().to_string(),
                    trade_type: trade.trade_type().to_string(),
                    sample: None,
                    message,
                });
            }
        }
        done += 1;
        progress.update_progress(done, total_steps);
    }
    report.timings.calibration = timer.elapsed();
    report.calculators = calculators.len();
    info!(
        calculators = calculators.len(),
        trades = input.portfolio.size(),
        "Extracted AMC calculators"
    );

    let plan = WritePlan::compile(grid, MporState::of(input.scenario))?;
    let samples = cube.samples();
    let grid_len = grid.time_grid().len();
    let has_single = calculators
        .iter()
        .any(|c| matches!(c.calculator, AmcCalculator::SinglePath(_)));
    let has_batched = calculators
        .iter()
        .any(|c| matches!(c.calculator, AmcCalculator::MultiVariates(_)));
    let mut buffers = PathStateBuffers::new(model, grid_len, samples, has_batched);

    debug!(samples, grid_len, mpor = ?plan.state(), "Running AMC simulation");
    for sample in 0..samples {
        let timer = Instant::now();
        let path = generator.next();
        report.timings.path_generation += timer.elapsed();
        if path.path_size() != grid_len {
            return Err(EngineError::PathShape {
                expected: grid_len,
                actual: path.path_size(),
            });
        }
        buffers.fill(model, path, sample);

        let timer = Instant::now();
        if has_single {
            let sticky_paths = plan.has_close_out_call().then(|| {
                (
                    effective_simulation_path(grid, path, false),
                    effective_simulation_path(grid, path, true),
                )
            });
            for calc in calculators.iter_mut() {
                let (valuation, close_out) = match &mut calc.calculator {
                    AmcCalculator::SinglePath(single) => match &sticky_paths {
                        Some((valuation_path, close_out_path)) => (
                            simulate_single(single.as_mut(), valuation_path, false, plan.valuation_len()),
                            Some(simulate_single(
                                single.as_mut(),
                                close_out_path,
                                true,
                                plan.close_out_len(),
                            )),
                        ),
                        None => (
                            simulate_single(single.as_mut(), path, false, plan.valuation_len()),
                            None,
                        ),
                    },
                    AmcCalculator::MultiVariates(_) => continue,
                };

                let valuation = match valuation {
                    Ok(values) => {
                        if !calc.t0_written {
                            let t0 = values[0] * buffers.t0_conversion(model, calc.ccy) * calc.multiplier;
                            cube.set_t0(t0, calc.row, 0)?;
                            calc.t0_written = true;
                        }
                        values
                    }
                    Err(message) => {
                        report.record_valuation_failure(calc, Some(sample), message);
                        vec![0.0; plan.valuation_len()]
                    }
                };
                let close_out = match close_out {
                    Some(Ok(values)) => values,
                    Some(Err(message)) => {
                        report.record_valuation_failure(calc, Some(sample), message);
                        vec![0.0; plan.close_out_len()]
                    }
                    None => Vec::new(),
                };

                for slot in plan.slots() {
                    let values = match slot.source {
                        ResultSource::Valuation => &valuation,
                        ResultSource::CloseOut => &close_out,
                    };
                    let value = values[slot.result_index]
                        * buffers.conversion(model, calc.ccy, slot, sample)
                        * calc.multiplier;
                    cube.set(value, calc.row, slot.date_index, sample, slot.depth)?;
                }
            }
        }
        report.timings.valuation += timer.elapsed();

        if let (Some(asd), Some(aggregation)) = (asd.as_deref_mut(), aggregation.as_ref()) {
            let timer = Instant::now();
            write_aggregation_data(asd, aggregation, model, grid, path, &buffers, sample)?;
            report.timings.aggregation += timer.elapsed();
        }
    }

    if has_batched {
        let timer = Instant::now();
        let path_times = &grid.time_grid().times()[1..];
        let paths = buffers.paths().unwrap_or_default();
        for calc in calculators.iter_mut() {
            let (valuation, close_out) = match &mut calc.calculator {
                AmcCalculator::MultiVariates(batched) => {
                    let valuation = simulate_batched(
                        batched.as_mut(),
                        path_times,
                        paths,
                        plan.valuation_mask(),
                        false,
                        plan.valuation_len(),
                        samples,
                    );
                    let close_out = plan.has_close_out_call().then(|| {
                        simulate_batched(
                            batched.as_mut(),
                            path_times,
                            paths,
                            plan.close_out_mask(),
                            true,
                            plan.close_out_len(),
                            samples,
                        )
                    });
                    (valuation, close_out)
                }
                AmcCalculator::SinglePath(_) => continue,
            };

            let valuation = match valuation {
                Ok(values) => {
                    let t0 = values[0].at(0) * buffers.t0_conversion(model, calc.ccy) * calc.multiplier;
                    cube.set_t0(t0, calc.row, 0)?;
                    values
                }
                Err(message) => {
                    report.record_valuation_failure(calc, None, message);
                    vec![RandomVariable::new(samples); plan.valuation_len()]
                }
            };
            let close_out = match close_out {
                Some(Ok(values)) => values,
                Some(Err(message)) => {
                    report.record_valuation_failure(calc, None, message);
                    vec![RandomVariable::new(samples); plan.close_out_len()]
                }
                None => Vec::new(),
            };

            for slot in plan.slots() {
                let values = match slot.source {
                    ResultSource::Valuation => &valuation[slot.result_index],
                    ResultSource::CloseOut => &close_out[slot.result_index],
                };
                for sample in 0..samples {
                    let value = values.at(sample)
                        * buffers.conversion(model, calc.ccy, slot, sample)
                        * calc.multiplier;
                    cube.set(value, calc.row, slot.date_index, sample, slot.depth)?;
                }
            }
            debug!(trade_id = %calc.trade_id, "Batched AMC calculator done");
        }
        report.timings.valuation += timer.elapsed();
    }
    done += 1;
    progress.update_progress(done, total_steps);

    let t = &mut report.timings;
    t.total = start.elapsed();
    t.residual = t
        .total
        .saturating_sub(t.calibration + t.path_generation + t.valuation + t.aggregation);
    t.log();
    if !report.valuation_failures.is_empty() {
        warn!(
            failures = report.valuation_failures.len(),
            "Some AMC calculator calls failed and were set to zero"
        );
    }
    info!("AMC valuation engine finished for one of possibly multiple threads");
    Ok(report)
}

fn extract(trade: &Trade, model: &CrossAssetModel, cube: &dyn NpvCube) -> Result<Extracted, String> {
    let calculator = trade
        .instrument()
        .amc_calculator()
        .map_err(|e| e.to_string())?;
    let ccy = model
        .ccy_index(calculator.npv_currency())
        .map_err(|e| e.to_string())?;
    let row = cube
        .index_of(trade.id().as_str())
        .map_err(|_| "trade id is not present in output cube".to_string())?;
    Ok(Extracted {
        calculator,
        trade_id: trade.id().to_string(),
        trade_type: trade.trade_type().to_string(),
        row,
        multiplier: trade.effective_multiplier(),
        ccy,
        t0_written: false,
    })
}

fn simulate_single(
    calculator: &mut dyn SinglePathCalculator,
    path: &MultiPath,
    reuse_last_events: bool,
    required: usize,
) -> Result<Vec<f64>, String> {
    match calculator.simulate_path(path, reuse_last_events) {
        Ok(values) if values.len() >= required => Ok(values),
        Ok(values) => Err(format!(
            "calculator returned {} values, expected {required}",
            values.len()
        )),
        Err(e) => Err(e.to_string()),
    }
}

fn simulate_batched(
    calculator: &mut dyn MultiVariateCalculator,
    path_times: &[f64],
    paths: &[Vec<RandomVariable>],
    is_relevant_time: &[bool],
    move_state_to_previous_time: bool,
    required: usize,
    samples: usize,
) -> Result<Vec<RandomVariable>, String> {
    let values = calculator
        .simulate_path(path_times, paths, is_relevant_time, move_state_to_previous_time)
        .map_err(|e| e.to_string())?;
    if values.len() < required {
        return Err(format!(
            "calculator returned {} values, expected {required}",
            values.len()
        ));
    }
    if let Some(rv) = values.iter().find(|rv| rv.size() != samples) {
        return Err(format!(
            "calculator returned {} samples, expected {samples}",
            rv.size()
        ));
    }
    Ok(values)
}

fn resolve_aggregation(input: &CoreEngineInput<'_>) -> Result<ResolvedAggregation, EngineError> {
    let model = input.model.as_ref();
    let base = model.base_currency();
    let request = input.aggregation_request;

    let mut currencies = Vec::new();
    for code in &request.currencies {
        let ccy: Currency = code.parse()?;
        if ccy == base {
            continue;
        }
        currencies.push((model.ccy_index(ccy)?, code.clone()));
    }

    let mut indices = Vec::new();
    if !request.indices.is_empty() {
        let market = input.market.ok_or(EngineError::MarketRequired)?;
        for name in &request.indices {
            match market.ibor_index(name) {
                Ok(index) => {
                    let ccy = model.ccy_index(index.currency())?;
                    indices.push((index, ccy));
                }
                Err(e) => {
                    warn!(index = %name, error = %e, "Index not found in market, skipping");
                }
            }
        }
    }
    debug!(
        currencies = currencies.len(),
        indices = indices.len(),
        "Collected aggregation scenario data keys"
    );
    Ok(ResolvedAggregation {
        currencies,
        indices,
    })
}

fn write_aggregation_data(
    asd: &mut dyn AggregationScenarioData,
    aggregation: &ResolvedAggregation,
    model: &CrossAssetModel,
    grid: &DateGrid,
    path: &MultiPath,
    buffers: &PathStateBuffers,
    sample: usize,
) -> Result<(), EngineError> {
    let base_state = &path[model.p_idx(AssetType::IR, 0)];
    let mut date_index = 0;
    for k in 1..path.path_size() {
        if !grid.is_valuation_date()[k - 1] {
            continue;
        }
        let t = path.time(k);
        asd.set(
            date_index,
            sample,
            model.numeraire(0, t, base_state[k]),
            AggregationScenarioDataType::Numeraire,
            "",
        )?;
        for (ccy, code) in &aggregation.currencies {
            asd.set(
                date_index,
                sample,
                buffers.fx(*ccy, k, sample),
                AggregationScenarioDataType::FxSpot,
                code,
            )?;
        }
        for (index, ccy) in &aggregation.indices {
            let fixing = model.simple_forward_rate(
                *ccy,
                t,
                index.tenor().year_fraction(),
                buffers.state(*ccy, k, sample),
            );
            asd.set(
                date_index,
                sample,
                fixing,
                AggregationScenarioDataType::IndexFixing,
                index.name(),
            )?;
        }
        date_index += 1;
    }
    Ok(())
}
