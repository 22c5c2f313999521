//! AMC valuation engine.
//!
//! # Modes
//!
//! - **Single-threaded** ([`AmcValuationEngine::single_threaded`]): the
//!   caller supplies a built model, portfolio and cube;
//!   [`build_cube_into`](AmcValuationEngine::build_cube_into) fills the cube.
//! - **Multi-threaded** ([`AmcValuationEngine::multi_threaded`]): the
//!   portfolio is split round-robin over worker threads. Each worker rebuilds
//!   market, model and portfolio through the collaborators in
//!   [`MultiThreadedSetup`] and fills its own mini-cube.
//!   [`build_cube`](AmcValuationEngine::build_cube) leaves the mini-cubes in
//!   the engine; merge them with
//!   [`joint_output_cube`](AmcValuationEngine::joint_output_cube).
//!
//! Every worker seeds its path generator identically, so a trade gets the
//! same values whichever worker it lands on.

mod buffers;
mod context;
mod core;
pub mod mpor;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::NaiveDate;
use pricer_models::models::CrossAssetModel;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info};

pub use self::context::{EvaluationContext, ObservationMode};
pub use self::core::{
    run_core_engine, run_core_engine_with_generator, AggregationDataRequest, CoreEngineInput,
    CoreEngineReport, EngineTimings, TradeFailure,
};

use crate::builders::{CubeFactory, EngineData, InMemoryCubeFactory, MarketBuilder, ModelBuilder, PortfolioFactory};
use crate::cube::{JointNpvCube, NpvCube};
use crate::error::{EngineError, WorkerFailure};
use crate::market::{ClonedLoader, Loader, Market};
use crate::portfolio::{Portfolio, PortfolioDefinition};
use crate::progress::{MultiThreadedProgressIndicator, ProgressIndicator, ProgressReporter};
use crate::scenario::{AggregationScenarioData, ScenarioGeneratorData};

/// Collaborators and sizes of a multi-threaded engine.
pub struct MultiThreadedSetup {
    /// Maximum number of worker threads
    pub n_threads: usize,
    /// Evaluation date
    pub today: NaiveDate,
    /// Samples per mini-cube
    pub n_samples: usize,
    /// Source of market data, snapshotted once per worker
    pub loader: Arc<dyn Loader>,
    /// Builds a worker's market
    pub market_builder: Arc<dyn MarketBuilder>,
    /// Builds a worker's model
    pub model_builder: Arc<dyn ModelBuilder>,
    /// Builds a worker's portfolio
    pub portfolio_factory: Arc<dyn PortfolioFactory>,
    /// Engine configuration passed to the portfolio factory
    pub engine_data: EngineData,
    /// Creates the mini-cubes
    pub cube_factory: Arc<dyn CubeFactory>,
    /// Observation mode of worker contexts
    pub observation_mode: ObservationMode,
}

impl MultiThreadedSetup {
    /// Setup with default engine data, in-memory double precision cubes and
    /// observation mode `None`.
    pub fn new(
        n_threads: usize,
        today: NaiveDate,
        n_samples: usize,
        loader: Arc<dyn Loader>,
        market_builder: Arc<dyn MarketBuilder>,
        model_builder: Arc<dyn ModelBuilder>,
        portfolio_factory: Arc<dyn PortfolioFactory>,
    ) -> Self {
        Self {
            n_threads,
            today,
            n_samples,
            loader,
            market_builder,
            model_builder,
            portfolio_factory,
            engine_data: EngineData::default(),
            cube_factory: Arc::new(InMemoryCubeFactory),
            observation_mode: ObservationMode::default(),
        }
    }

    /// Sets the engine data.
    pub fn with_engine_data(mut self, engine_data: EngineData) -> Self {
        self.engine_data = engine_data;
        self
    }

    /// Sets the cube factory.
    pub fn with_cube_factory(mut self, cube_factory: Arc<dyn CubeFactory>) -> Self {
        self.cube_factory = cube_factory;
        self
    }

    /// Sets the observation mode.
    pub fn with_observation_mode(mut self, observation_mode: ObservationMode) -> Self {
        self.observation_mode = observation_mode;
        self
    }
}

enum Mode {
    SingleThreaded {
        model: Arc<CrossAssetModel>,
        market: Option<Arc<dyn Market>>,
    },
    MultiThreaded(MultiThreadedSetup),
}

type WorkerOutcome = Result<(Box<dyn NpvCube>, CoreEngineReport), String>;

struct WorkerTask<'a> {
    worker: usize,
    setup: &'a MultiThreadedSetup,
    scenario: &'a ScenarioGeneratorData,
    aggregation_request: &'a AggregationDataRequest,
    portfolio_json: &'a str,
    loader: ClonedLoader,
    simulation_dates: &'a [NaiveDate],
    asd: Option<&'a mut dyn AggregationScenarioData>,
    progress: &'a dyn ProgressIndicator,
}

/// Valuation engine producing NPV cubes with American Monte Carlo.
pub struct AmcValuationEngine {
    mode: Mode,
    scenario: Arc<ScenarioGeneratorData>,
    aggregation_request: AggregationDataRequest,
    asd: Option<Box<dyn AggregationScenarioData>>,
    progress: ProgressReporter,
    output_cubes: Vec<Box<dyn NpvCube>>,
}

impl AmcValuationEngine {
    /// Engine valuing a built portfolio on the caller's thread.
    ///
    /// Fails on a zero seed, on an aggregation request without market and
    /// when model and grid day counters differ.
    pub fn single_threaded(
        model: Arc<CrossAssetModel>,
        scenario: Arc<ScenarioGeneratorData>,
        market: Option<Arc<dyn Market>>,
        aggregation_request: AggregationDataRequest,
    ) -> Result<Self, EngineError> {
        if scenario.seed() == 0 {
            return Err(EngineError::ZeroSeed);
        }
        if !aggregation_request.is_empty() && market.is_none() {
            return Err(EngineError::MarketRequired);
        }
        check_day_counter(&model, &scenario)?;
        Ok(Self::with_mode(
            Mode::SingleThreaded { model, market },
            scenario,
            aggregation_request,
        ))
    }

    /// Engine splitting the portfolio over worker threads.
    pub fn multi_threaded(
        setup: MultiThreadedSetup,
        scenario: Arc<ScenarioGeneratorData>,
        aggregation_request: AggregationDataRequest,
    ) -> Result<Self, EngineError> {
        if scenario.seed() == 0 {
            return Err(EngineError::ZeroSeed);
        }
        Ok(Self::with_mode(
            Mode::MultiThreaded(setup),
            scenario,
            aggregation_request,
        ))
    }

    fn with_mode(
        mode: Mode,
        scenario: Arc<ScenarioGeneratorData>,
        aggregation_request: AggregationDataRequest,
    ) -> Self {
        Self {
            mode,
            scenario,
            aggregation_request,
            asd: None,
            progress: ProgressReporter::new(),
            output_cubes: Vec::new(),
        }
    }

    /// Scenario settings.
    pub fn scenario(&self) -> &ScenarioGeneratorData {
        &self.scenario
    }

    /// Registers a progress indicator.
    pub fn register_progress_indicator(&mut self, indicator: Arc<dyn ProgressIndicator>) {
        self.progress.register(indicator);
    }

    /// Sets the container receiving aggregation scenario data.
    pub fn set_aggregation_scenario_data(&mut self, asd: Box<dyn AggregationScenarioData>) {
        self.asd = Some(asd);
    }

    /// Aggregation scenario data, if set.
    pub fn aggregation_scenario_data(&self) -> Option<&dyn AggregationScenarioData> {
        self.asd.as_deref()
    }

    /// Removes and returns the aggregation scenario data.
    pub fn take_aggregation_scenario_data(&mut self) -> Option<Box<dyn AggregationScenarioData>> {
        self.asd.take()
    }

    /// Fills `cube` with the values of `portfolio` (single-threaded mode).
    ///
    /// The cube needs one id per trade, one date per valuation date and,
    /// with a close-out lag, depth 2. Samples are taken from the cube.
    pub fn build_cube_into(
        &mut self,
        portfolio: &Portfolio,
        cube: &mut dyn NpvCube,
    ) -> Result<CoreEngineReport, EngineError> {
        let Mode::SingleThreaded { model, market } = &self.mode else {
            return Err(EngineError::WrongMode {
                operation: "build_cube_into",
                required: "single-threaded",
            });
        };
        let scenario = self.scenario.as_ref();
        check_single_threaded_inputs(portfolio, cube, scenario).map_err(EngineError::into_run_error)?;

        info!(
            trades = portfolio.size(),
            samples = cube.samples(),
            dates = cube.num_dates(),
            "Starting single-threaded AMC valuation"
        );
        let input = CoreEngineInput {
            portfolio,
            model,
            market: market.as_deref(),
            scenario,
            aggregation_request: &self.aggregation_request,
        };
        let asd = self
            .asd
            .as_deref_mut()
            .map(|asd| asd as &mut dyn AggregationScenarioData);
        run_core_engine(&input, asd, cube, &self.progress).map_err(EngineError::into_run_error)
    }

    /// Values `portfolio` on worker threads (multi-threaded mode).
    ///
    /// On success the mini-cubes, one per worker, are available through
    /// [`output_cubes`](Self::output_cubes). Any worker failure fails the
    /// whole run with [`EngineError::WorkerFailures`].
    pub fn build_cube(&mut self, portfolio: &Portfolio) -> Result<CoreEngineReport, EngineError> {
        if !matches!(self.mode, Mode::MultiThreaded(_)) {
            return Err(EngineError::WrongMode {
                operation: "build_cube",
                required: "multi-threaded",
            });
        }
        self.output_cubes.clear();
        if portfolio.is_empty() {
            return Err(EngineError::EmptyPortfolio);
        }

        let mut asd = self.asd.take();
        let outcome = self.run_workers(portfolio, asd.as_deref_mut());
        self.asd = asd;
        let (cubes, report) = outcome?;
        self.output_cubes = cubes;
        Ok(report)
    }

    fn run_workers(
        &self,
        portfolio: &Portfolio,
        asd: Option<&mut (dyn AggregationScenarioData + 'static)>,
    ) -> Result<(Vec<Box<dyn NpvCube>>, CoreEngineReport), EngineError> {
        let Mode::MultiThreaded(setup) = &self.mode else {
            return Err(EngineError::WrongMode {
                operation: "build_cube",
                required: "multi-threaded",
            });
        };
        let scenario = self.scenario.as_ref();
        let grid = scenario.grid();

        let n_workers = setup.n_threads.min(portfolio.size());
        if n_workers == 0 {
            return Err(EngineError::ZeroThreads);
        }
        if setup.n_samples == 0 {
            return Err(EngineError::ZeroSamples);
        }
        info!(
            trades = portfolio.size(),
            threads = n_workers,
            samples = setup.n_samples,
            "Starting multi-threaded AMC valuation"
        );

        let parts = portfolio.definition().split_round_robin(n_workers)?;
        let portfolio_json = parts
            .iter()
            .map(PortfolioDefinition::to_json)
            .collect::<Result<Vec<_>, _>>()?;

        let depth = if scenario.with_close_out_lag() { 2 } else { 1 };
        let valuation_dates = grid.valuation_dates();
        let simulation_dates = if scenario.with_close_out_lag() && !scenario.with_mpor_sticky_date() {
            grid.dates().to_vec()
        } else {
            valuation_dates.clone()
        };

        let mut cubes = Vec::with_capacity(n_workers);
        for part in &parts {
            cubes.push(setup.cube_factory.create(
                setup.today,
                &part.ids(),
                valuation_dates.clone(),
                setup.n_samples,
                depth,
            ));
        }

        let progress = MultiThreadedProgressIndicator::new(self.progress.indicators().to_vec());
        let mut asd = asd.map(|asd| asd as &mut dyn AggregationScenarioData);
        let mut tasks = Vec::with_capacity(n_workers);
        for (worker, json) in portfolio_json.iter().enumerate() {
            tasks.push(WorkerTask {
                worker,
                setup,
                scenario,
                aggregation_request: &self.aggregation_request,
                portfolio_json: json,
                loader: ClonedLoader::new(setup.today, setup.loader.as_ref()),
                simulation_dates: &simulation_dates,
                asd: if worker == 0 { asd.take() } else { None },
                progress: &progress,
            });
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .thread_name(|i| format!("amc-worker-{i}"))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        let mut outcomes: Vec<Option<WorkerOutcome>> = (0..n_workers).map(|_| None).collect();
        pool.scope(|s| {
            for ((task, cube), slot) in tasks.into_iter().zip(cubes).zip(outcomes.iter_mut()) {
                s.spawn(move |_| {
                    let worker = task.worker;
                    let result = panic::catch_unwind(AssertUnwindSafe(|| run_worker(task, cube)));
                    *slot = Some(match result {
                        Ok(Ok(done)) => Ok(done),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(payload) => Err(format!("panic: {}", panic_message(payload.as_ref()))),
                    });
                    debug!(worker, "AMC worker finished");
                });
            }
        });

        let mut failures = Vec::new();
        let mut mini_cubes = Vec::with_capacity(n_workers);
        let mut report = CoreEngineReport::default();
        for (worker, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok((cube, worker_report))) => {
                    mini_cubes.push(cube);
                    report.merge(worker_report);
                }
                Some(Err(message)) => {
                    error!(worker, error = %message, "AMC worker failed");
                    failures.push(WorkerFailure { worker, message });
                }
                None => failures.push(WorkerFailure {
                    worker,
                    message: "worker did not report a result".to_string(),
                }),
            }
        }
        if !failures.is_empty() {
            return Err(EngineError::WorkerFailures(failures));
        }
        info!(cubes = mini_cubes.len(), "Multi-threaded AMC valuation finished");
        Ok((mini_cubes, report))
    }

    /// Mini-cubes of the last successful multi-threaded run, one per worker.
    pub fn output_cubes(&self) -> &[Box<dyn NpvCube>] {
        &self.output_cubes
    }

    /// Removes and returns the mini-cubes.
    pub fn take_output_cubes(&mut self) -> Vec<Box<dyn NpvCube>> {
        std::mem::take(&mut self.output_cubes)
    }

    /// Merges the mini-cubes into one cube with unique ids, in worker order.
    pub fn joint_output_cube(&mut self) -> Result<JointNpvCube, EngineError> {
        Ok(JointNpvCube::new(self.take_output_cubes(), None, true)?)
    }
}

fn check_day_counter(model: &CrossAssetModel, scenario: &ScenarioGeneratorData) -> Result<(), EngineError> {
    let grid = scenario.grid().day_counter();
    if model.day_counter() != grid {
        return Err(EngineError::DayCounterMismatch {
            model: model.day_counter().name(),
            grid: grid.name(),
        });
    }
    Ok(())
}

fn check_single_threaded_inputs(
    portfolio: &Portfolio,
    cube: &dyn NpvCube,
    scenario: &ScenarioGeneratorData,
) -> Result<(), EngineError> {
    if portfolio.is_empty() {
        return Err(EngineError::EmptyPortfolio);
    }
    if cube.samples() == 0 {
        return Err(EngineError::ZeroSamples);
    }
    if cube.num_ids() != portfolio.size() {
        return Err(EngineError::IdDimensionMismatch {
            cube: cube.num_ids(),
            portfolio: portfolio.size(),
        });
    }
    let valuation_dates = scenario.grid().valuation_dates().len();
    if cube.num_dates() != valuation_dates {
        return Err(EngineError::DateDimensionMismatch {
            cube: cube.num_dates(),
            grid: valuation_dates,
        });
    }
    if scenario.with_close_out_lag() && cube.depth() < 2 {
        return Err(EngineError::DepthMismatch {
            cube: cube.depth(),
            required: 2,
        });
    }
    Ok(())
}

fn run_worker(
    task: WorkerTask<'_>,
    mut cube: Box<dyn NpvCube>,
) -> Result<(Box<dyn NpvCube>, CoreEngineReport), EngineError> {
    let setup = task.setup;
    let ctx = EvaluationContext::new(setup.today, setup.observation_mode, task.worker);

    debug!(worker = task.worker, "Building market");
    let market = setup
        .market_builder
        .build(&ctx, &task.loader)
        .map_err(EngineError::collaborator("market builder"))?;

    debug!(worker = task.worker, "Building model");
    let model = setup
        .model_builder
        .build(&ctx, &market)
        .map_err(EngineError::collaborator("model builder"))?;
    check_day_counter(&model, task.scenario)?;

    debug!(worker = task.worker, "Building portfolio");
    let definition = PortfolioDefinition::from_json(task.portfolio_json)?;
    let engine_data = setup.engine_data.for_amc_worker();
    let portfolio = setup
        .portfolio_factory
        .build(&ctx, &definition, &engine_data, &model, &market, task.simulation_dates)
        .map_err(EngineError::collaborator("portfolio factory"))?;
    info!(
        worker = task.worker,
        trades = portfolio.size(),
        "Worker portfolio built"
    );

    let input = CoreEngineInput {
        portfolio: &portfolio,
        model: &model,
        market: Some(market.as_ref()),
        scenario: task.scenario,
        aggregation_request: task.aggregation_request,
    };
    let report = run_core_engine(&input, task.asd, cube.as_mut(), task.progress)?;
    Ok((cube, report))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
