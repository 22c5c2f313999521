//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use pricer_amc::builders::{MarketBuilder, ModelBuilder};
use pricer_amc::cube::{CubeError, InMemoryCube, NpvCube};
use pricer_amc::demo::{demo_loader, demo_model_builder, DemoMarketBuilder};
use pricer_amc::engine::{EvaluationContext, ObservationMode};
use pricer_amc::market::Market;
use pricer_amc::portfolio::{AmcInstrument, Portfolio, Position, Trade, TradeDefinition};
use pricer_amc::progress::ProgressIndicator;
use pricer_amc::scenario::{DateGrid, MporMode, ScenarioGeneratorData};
use pricer_core::types::{Currency, DayCountConvention, Tenor};
use pricer_models::amc::{AmcCalculator, CalculatorError, SinglePathCalculator};
use pricer_models::models::CrossAssetModel;
use pricer_models::paths::{make_multi_path_generator, MultiPath, MultiPathGenerator};

pub const DC: DayCountConvention = DayCountConvention::ActualActual365;

pub fn asof() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

pub fn ctx() -> EvaluationContext {
    EvaluationContext::new(asof(), ObservationMode::None, 0)
}

/// Demo market with the 6M Euribor index registered.
pub fn market() -> Arc<dyn Market> {
    DemoMarketBuilder::new(vec!["EUR-EURIBOR-6M".to_string()])
        .build(&ctx(), &demo_loader(asof()))
        .unwrap()
}

/// EUR base model with USD and GBP.
pub fn model() -> Arc<CrossAssetModel> {
    demo_model_builder(DC).build(&ctx(), &market()).unwrap()
}

pub fn scenario(grid: &str, mpor: Option<(&str, MporMode)>) -> ScenarioGeneratorData {
    let data = ScenarioGeneratorData::new(DateGrid::from_spec(asof(), grid, DC).unwrap(), 42);
    match mpor {
        Some((lag, mode)) => data.with_mpor(lag.parse::<Tenor>().unwrap(), mode).unwrap(),
        None => data,
    }
}

/// Cube sized for `portfolio` on the valuation dates of `scenario`.
pub fn cube_for(portfolio: &Portfolio, scenario: &ScenarioGeneratorData, samples: usize, depth: usize) -> InMemoryCube<f64> {
    InMemoryCube::new(
        asof(),
        &portfolio.ids(),
        scenario.grid().valuation_dates(),
        samples,
        depth,
    )
}

/// Draws `samples` paths the way the engine does, for recomputing expected values.
pub fn replay_paths(model: &Arc<CrossAssetModel>, scenario: &ScenarioGeneratorData, samples: usize) -> Vec<MultiPath> {
    let mut generator = make_multi_path_generator(
        scenario.sequence_type(),
        Arc::clone(model),
        scenario.grid().time_grid().clone(),
        scenario.seed(),
    )
    .unwrap();
    (0..samples).map(|_| generator.next().clone()).collect()
}

// ============================================================================
// Instruments and calculators
// ============================================================================

type Values = dyn Fn(usize, &MultiPath) -> Result<Vec<f64>, CalculatorError> + Send + Sync;

/// Single-path calculator driven by a closure of the call number and path.
pub struct ScriptedCalculator {
    currency: Currency,
    calls: usize,
    values: Arc<Values>,
}

impl SinglePathCalculator for ScriptedCalculator {
    fn npv_currency(&self) -> Currency {
        self.currency
    }

    fn simulate_path(&mut self, path: &MultiPath, _reuse_last_events: bool) -> Result<Vec<f64>, CalculatorError> {
        let call = self.calls;
        self.calls += 1;
        (self.values)(call, path)
    }
}

/// Instrument handing out [`ScriptedCalculator`]s.
pub struct ScriptedInstrument {
    currency: Currency,
    values: Arc<Values>,
    multiplier: f64,
    position: Option<Position>,
    unsupported: bool,
}

impl ScriptedInstrument {
    pub fn new(
        currency: Currency,
        values: impl Fn(usize, &MultiPath) -> Result<Vec<f64>, CalculatorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            currency,
            values: Arc::new(values),
            multiplier: 1.0,
            position: None,
            unsupported: false,
        }
    }

    /// `value` at every path time.
    pub fn constant(currency: Currency, value: f64) -> Self {
        Self::new(currency, move |_, path| Ok(vec![value; path.path_size()]))
    }

    /// Instrument without an AMC calculator.
    pub fn unsupported() -> Self {
        let mut instrument = Self::constant(Currency::EUR, 0.0);
        instrument.unsupported = true;
        instrument
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn boxed(self) -> Box<dyn AmcInstrument> {
        Box::new(self)
    }
}

impl AmcInstrument for ScriptedInstrument {
    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn option_position(&self) -> Option<Position> {
        self.position
    }

    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        if self.unsupported {
            return Err(CalculatorError::NotSupported("scripted".to_string()));
        }
        Ok(AmcCalculator::SinglePath(Box::new(ScriptedCalculator {
            currency: self.currency,
            calls: 0,
            values: Arc::clone(&self.values),
        })))
    }
}

/// Wraps an instrument with a fixed calculator factory.
pub struct CalculatorInstrument<F>(pub F);

impl<F> AmcInstrument for CalculatorInstrument<F>
where
    F: Fn() -> Result<AmcCalculator, CalculatorError> + Send + Sync,
{
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        (self.0)()
    }
}

pub fn portfolio(trades: Vec<(&str, Box<dyn AmcInstrument>)>) -> Portfolio {
    let mut portfolio = Portfolio::new();
    for (id, instrument) in trades {
        portfolio
            .add(Trade::new(TradeDefinition::new(id, "Scripted"), instrument))
            .unwrap();
    }
    portfolio
}

// ============================================================================
// Recording collaborators
// ============================================================================

/// Generator counting its draws.
pub struct CountingGenerator {
    inner: Box<dyn MultiPathGenerator>,
    pub draws: usize,
}

impl CountingGenerator {
    pub fn new(model: &Arc<CrossAssetModel>, scenario: &ScenarioGeneratorData) -> Self {
        Self {
            inner: make_multi_path_generator(
                scenario.sequence_type(),
                Arc::clone(model),
                scenario.grid().time_grid().clone(),
                scenario.seed(),
            )
            .unwrap(),
            draws: 0,
        }
    }
}

impl MultiPathGenerator for CountingGenerator {
    fn next(&mut self) -> &MultiPath {
        self.draws += 1;
        self.inner.next()
    }
}

/// Cube counting writes, delegating storage to an in-memory cube.
pub struct RecordingCube {
    pub inner: InMemoryCube<f64>,
    pub t0_writes: usize,
    pub writes: usize,
}

impl RecordingCube {
    pub fn new(inner: InMemoryCube<f64>) -> Self {
        Self {
            inner,
            t0_writes: 0,
            writes: 0,
        }
    }
}

impl NpvCube for RecordingCube {
    fn num_ids(&self) -> usize {
        self.inner.num_ids()
    }

    fn num_dates(&self) -> usize {
        self.inner.num_dates()
    }

    fn samples(&self) -> usize {
        self.inner.samples()
    }

    fn depth(&self) -> usize {
        self.inner.depth()
    }

    fn ids_and_indexes(&self) -> &BTreeMap<String, usize> {
        self.inner.ids_and_indexes()
    }

    fn dates(&self) -> &[NaiveDate] {
        self.inner.dates()
    }

    fn asof(&self) -> NaiveDate {
        self.inner.asof()
    }

    fn get_t0(&self, id: usize, depth: usize) -> Result<f64, CubeError> {
        self.inner.get_t0(id, depth)
    }

    fn set_t0(&mut self, value: f64, id: usize, depth: usize) -> Result<(), CubeError> {
        self.t0_writes += 1;
        self.inner.set_t0(value, id, depth)
    }

    fn get(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<f64, CubeError> {
        self.inner.get(id, date, sample, depth)
    }

    fn set(&mut self, value: f64, id: usize, date: usize, sample: usize, depth: usize) -> Result<(), CubeError> {
        self.writes += 1;
        self.inner.set(value, id, date, sample, depth)
    }

    fn save(&self, path: &Path) -> Result<(), CubeError> {
        self.inner.save(path)
    }
}

/// Progress indicator keeping every update.
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<(usize, usize)>>,
}

impl RecordingProgress {
    pub fn updates(&self) -> Vec<(usize, usize)> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressIndicator for RecordingProgress {
    fn update_progress(&self, done: usize, total: usize) {
        self.updates.lock().unwrap().push((done, total));
    }
}

/// Shared counter for collaborator calls across worker threads.
#[derive(Default)]
pub struct CallCounter(AtomicUsize);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn id_set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
