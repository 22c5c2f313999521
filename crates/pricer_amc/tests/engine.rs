//! Integration tests for the AMC valuation engine front end.
//!
//! Single-threaded and multi-threaded runs over the demo collaborators:
//! determinism, equivalence of the two modes, input validation, worker
//! failure aggregation, aggregation data ownership and progress.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::*;
use pricer_amc::builders::{BoxError, EngineData, MarketBuilder, ModelBuilder, PortfolioFactory};
use pricer_amc::cube::{InMemoryCube, NpvCube};
use pricer_amc::demo::{
    demo_loader, demo_model_builder, demo_portfolio_definition, DemoMarketBuilder, DemoPortfolioFactory,
};
use pricer_amc::engine::{AggregationDataRequest, AmcValuationEngine, EvaluationContext, MultiThreadedSetup};
use pricer_amc::market::{Loader, Market};
use pricer_amc::portfolio::{Portfolio, PortfolioDefinition};
use pricer_amc::scenario::{
    AggregationDataError, AggregationScenarioData, AggregationScenarioDataType, InMemoryAggregationScenarioData,
    MporMode, ScenarioGeneratorData,
};
use pricer_amc::EngineError;
use pricer_core::types::DayCountConvention;
use pricer_models::models::CrossAssetModel;

const SAMPLES: usize = 8;

fn demo_portfolio(model: &Arc<CrossAssetModel>, scenario: &ScenarioGeneratorData, n: usize) -> Portfolio {
    DemoPortfolioFactory
        .build(
            &ctx(),
            &demo_portfolio_definition(asof(), n),
            &EngineData::new(),
            model,
            &market(),
            scenario.grid().dates(),
        )
        .unwrap()
}

fn single_threaded_cube(scenario: &Arc<ScenarioGeneratorData>, n: usize) -> InMemoryCube<f64> {
    let model = model();
    let portfolio = demo_portfolio(&model, scenario, n);
    let depth = if scenario.with_close_out_lag() { 2 } else { 1 };
    let mut cube = cube_for(&portfolio, scenario, SAMPLES, depth);
    let mut engine =
        AmcValuationEngine::single_threaded(model, Arc::clone(scenario), None, AggregationDataRequest::default())
            .unwrap();
    let report = engine.build_cube_into(&portfolio, &mut cube).unwrap();
    assert!(report.valuation_failures.is_empty());
    cube
}

fn setup(threads: usize) -> MultiThreadedSetup {
    MultiThreadedSetup::new(
        threads,
        asof(),
        SAMPLES,
        Arc::new(demo_loader(asof())),
        Arc::new(DemoMarketBuilder::new(vec!["EUR-EURIBOR-6M".to_string()])),
        Arc::new(demo_model_builder(DC)),
        Arc::new(DemoPortfolioFactory),
    )
}

fn assert_same_values(expected: &dyn NpvCube, actual: &dyn NpvCube) {
    assert_eq!(expected.ids(), {
        let mut ids = actual.ids();
        ids.sort();
        ids
    });
    for id in expected.ids() {
        let e = expected.index_of(&id).unwrap();
        let a = actual.index_of(&id).unwrap();
        for depth in 0..expected.depth() {
            assert_eq!(expected.get_t0(e, depth).unwrap(), actual.get_t0(a, depth).unwrap(), "{id} t0");
            for date in 0..expected.num_dates() {
                for sample in 0..expected.samples() {
                    assert_eq!(
                        expected.get(e, date, sample, depth).unwrap(),
                        actual.get(a, date, sample, depth).unwrap(),
                        "{id} date {date} sample {sample} depth {depth}"
                    );
                }
            }
        }
    }
}

// ============================================================================
// Single-threaded
// ============================================================================

#[test]
fn test_single_threaded_is_deterministic() {
    let scenario = Arc::new(scenario("6,6M", None));
    let first = single_threaded_cube(&scenario, 9);
    let second = single_threaded_cube(&scenario, 9);
    assert_same_values(&first, &second);

    // Values vary across samples.
    let row = first.index_of("DEMO-00000").unwrap();
    assert_ne!(first.get(row, 0, 0, 0).unwrap(), first.get(row, 0, 1, 0).unwrap());
}

#[test]
fn test_zero_seed_rejected() {
    let scenario = Arc::new(ScenarioGeneratorData::new(scenario("2,1Y", None).grid().clone(), 0));
    assert!(matches!(
        AmcValuationEngine::single_threaded(model(), Arc::clone(&scenario), None, AggregationDataRequest::default()),
        Err(EngineError::ZeroSeed)
    ));
    assert!(matches!(
        AmcValuationEngine::multi_threaded(setup(2), scenario, AggregationDataRequest::default()),
        Err(EngineError::ZeroSeed)
    ));
}

#[test]
fn test_aggregation_request_needs_market() {
    let request = AggregationDataRequest {
        indices: Vec::new(),
        currencies: vec!["USD".to_string()],
    };
    let err = AmcValuationEngine::single_threaded(model(), Arc::new(scenario("2,1Y", None)), None, request)
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::MarketRequired));
}

#[test]
fn test_day_counter_mismatch_rejected() {
    let model = demo_model_builder(DayCountConvention::ActualActual360)
        .build(&ctx(), &market())
        .unwrap();
    let err = AmcValuationEngine::single_threaded(
        model,
        Arc::new(scenario("2,1Y", None)),
        None,
        AggregationDataRequest::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, EngineError::DayCounterMismatch { .. }));
}

#[test]
fn test_cube_dimension_checks() {
    let model = model();
    let scenario = Arc::new(scenario("3,6M", Some(("2W", MporMode::ActualDate))));
    let portfolio = demo_portfolio(&model, &scenario, 3);
    let mut engine = AmcValuationEngine::single_threaded(
        Arc::clone(&model),
        Arc::clone(&scenario),
        None,
        AggregationDataRequest::default(),
    )
    .unwrap();

    let mut too_few_ids = InMemoryCube::<f64>::new(
        asof(),
        &id_set(&["DEMO-00000"]),
        scenario.grid().valuation_dates(),
        SAMPLES,
        2,
    );
    let err = engine.build_cube_into(&portfolio, &mut too_few_ids).unwrap_err();
    assert!(matches!(&err, EngineError::Run(inner) if matches!(**inner, EngineError::IdDimensionMismatch { cube: 1, portfolio: 3 })));
    assert!(err.to_string().starts_with("error during amc val engine run"));

    let mut all_dates = InMemoryCube::<f64>::new(asof(), &portfolio.ids(), scenario.grid().dates().to_vec(), SAMPLES, 2);
    let err = engine.build_cube_into(&portfolio, &mut all_dates).unwrap_err();
    assert!(matches!(&err, EngineError::Run(inner) if matches!(**inner, EngineError::DateDimensionMismatch { cube: 6, grid: 3 })));

    let mut flat = cube_for(&portfolio, &scenario, SAMPLES, 1);
    let err = engine.build_cube_into(&portfolio, &mut flat).unwrap_err();
    assert!(matches!(&err, EngineError::Run(inner) if matches!(**inner, EngineError::DepthMismatch { cube: 1, required: 2 })));

    let mut empty = cube_for(&Portfolio::new(), &scenario, SAMPLES, 2);
    let err = engine.build_cube_into(&Portfolio::new(), &mut empty).unwrap_err();
    assert!(matches!(&err, EngineError::Run(inner) if matches!(**inner, EngineError::EmptyPortfolio)));

    let mut no_samples = cube_for(&portfolio, &scenario, 0, 2);
    let err = engine.build_cube_into(&portfolio, &mut no_samples).unwrap_err();
    assert!(matches!(&err, EngineError::Run(inner) if matches!(**inner, EngineError::ZeroSamples)));
}

#[test]
fn test_wrong_mode() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 2);

    let mut single =
        AmcValuationEngine::single_threaded(model, Arc::clone(&scenario), None, AggregationDataRequest::default())
            .unwrap();
    assert!(matches!(single.build_cube(&portfolio), Err(EngineError::WrongMode { .. })));

    let mut multi =
        AmcValuationEngine::multi_threaded(setup(2), Arc::clone(&scenario), AggregationDataRequest::default())
            .unwrap();
    let mut cube = cube_for(&portfolio, &scenario, SAMPLES, 1);
    assert!(matches!(
        multi.build_cube_into(&portfolio, &mut cube),
        Err(EngineError::WrongMode { .. })
    ));
}

// ============================================================================
// Multi-threaded
// ============================================================================

#[test]
fn test_multi_threaded_matches_single_threaded() {
    for mpor in [None, Some(("2W", MporMode::ActualDate)), Some(("2W", MporMode::StickyDate))] {
        let scenario = Arc::new(scenario("5,6M", mpor));
        let expected = single_threaded_cube(&scenario, 10);

        let model = model();
        let portfolio = demo_portfolio(&model, &scenario, 10);
        let mut engine =
            AmcValuationEngine::multi_threaded(setup(3), Arc::clone(&scenario), AggregationDataRequest::default())
                .unwrap();
        let report = engine.build_cube(&portfolio).unwrap();
        assert_eq!(report.trades, 10);
        assert_eq!(report.calculators, 10);
        assert_eq!(engine.output_cubes().len(), 3);
        let sizes: Vec<usize> = engine.output_cubes().iter().map(|c| c.num_ids()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        let joint = engine.joint_output_cube().unwrap();
        assert!(engine.output_cubes().is_empty());
        assert_eq!(joint.num_ids(), 10);
        assert_same_values(&expected, &joint);
    }
}

#[test]
fn test_threads_capped_by_portfolio_size() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 2);
    let mut engine =
        AmcValuationEngine::multi_threaded(setup(8), scenario, AggregationDataRequest::default()).unwrap();
    engine.build_cube(&portfolio).unwrap();
    assert_eq!(engine.output_cubes().len(), 2);
}

#[test]
fn test_zero_threads() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 2);
    let mut engine =
        AmcValuationEngine::multi_threaded(setup(0), scenario, AggregationDataRequest::default()).unwrap();
    assert!(matches!(engine.build_cube(&portfolio), Err(EngineError::ZeroThreads)));
    assert!(matches!(
        engine.build_cube(&Portfolio::new()),
        Err(EngineError::EmptyPortfolio)
    ));
}

#[test]
fn test_zero_samples_rejected_before_workers_start() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 3);
    let mut no_samples = setup(2);
    no_samples.n_samples = 0;
    let mut engine =
        AmcValuationEngine::multi_threaded(no_samples, scenario, AggregationDataRequest::default()).unwrap();
    assert!(matches!(engine.build_cube(&portfolio), Err(EngineError::ZeroSamples)));
    assert!(engine.output_cubes().is_empty());
}

struct FailingMarketBuilder {
    worker: usize,
}

impl MarketBuilder for FailingMarketBuilder {
    fn build(&self, ctx: &EvaluationContext, loader: &dyn Loader) -> Result<Arc<dyn Market>, BoxError> {
        if ctx.worker_id == self.worker {
            return Err("curve bootstrap failed".into());
        }
        DemoMarketBuilder::default().build(ctx, loader)
    }
}

struct PanickingPortfolioFactory {
    worker: usize,
}

impl PortfolioFactory for PanickingPortfolioFactory {
    fn build(
        &self,
        ctx: &EvaluationContext,
        definition: &PortfolioDefinition,
        engine_data: &EngineData,
        model: &Arc<CrossAssetModel>,
        market: &Arc<dyn Market>,
        simulation_dates: &[NaiveDate],
    ) -> Result<Portfolio, BoxError> {
        if ctx.worker_id == self.worker {
            panic!("trade builder exploded");
        }
        DemoPortfolioFactory.build(ctx, definition, engine_data, model, market, simulation_dates)
    }
}

#[test]
fn test_worker_failures_are_aggregated() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 6);

    let mut setup = setup(3);
    setup.market_builder = Arc::new(FailingMarketBuilder { worker: 1 });
    setup.portfolio_factory = Arc::new(PanickingPortfolioFactory { worker: 2 });
    let mut engine = AmcValuationEngine::multi_threaded(setup, scenario, AggregationDataRequest::default()).unwrap();

    match engine.build_cube(&portfolio) {
        Err(EngineError::WorkerFailures(failures)) => {
            let workers: Vec<usize> = failures.iter().map(|f| f.worker).collect();
            assert_eq!(workers, vec![1, 2]);
            assert!(failures[0].message.contains("market builder"));
            assert!(failures[0].message.contains("curve bootstrap failed"));
            assert!(failures[1].message.contains("trade builder exploded"));
        }
        other => panic!("expected worker failures, got {other:?}"),
    }
    assert!(engine.output_cubes().is_empty());
}

/// Aggregation data counting writes into a shared counter.
struct CountingAggregationData {
    inner: InMemoryAggregationScenarioData,
    writes: Arc<CallCounter>,
}

impl AggregationScenarioData for CountingAggregationData {
    fn dim_dates(&self) -> usize {
        self.inner.dim_dates()
    }

    fn dim_samples(&self) -> usize {
        self.inner.dim_samples()
    }

    fn set(
        &mut self,
        date: usize,
        sample: usize,
        value: f64,
        data_type: AggregationScenarioDataType,
        qualifier: &str,
    ) -> Result<(), AggregationDataError> {
        self.writes.hit();
        self.inner.set(date, sample, value, data_type, qualifier)
    }

    fn get(&self, date: usize, sample: usize, data_type: AggregationScenarioDataType, qualifier: &str) -> Option<f64> {
        self.inner.get(date, sample, data_type, qualifier)
    }

    fn keys(&self) -> Vec<(AggregationScenarioDataType, String)> {
        self.inner.keys()
    }
}

#[test]
fn test_aggregation_data_written_once_by_first_worker() {
    let scenario = Arc::new(scenario("3,6M", Some(("2W", MporMode::StickyDate))));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 6);
    let request = AggregationDataRequest {
        indices: vec!["EUR-EURIBOR-6M".to_string()],
        currencies: vec!["USD".to_string(), "GBP".to_string()],
    };
    let writes = Arc::new(CallCounter::default());

    let mut engine = AmcValuationEngine::multi_threaded(setup(3), scenario, request).unwrap();
    engine.set_aggregation_scenario_data(Box::new(CountingAggregationData {
        inner: InMemoryAggregationScenarioData::new(3, SAMPLES),
        writes: Arc::clone(&writes),
    }));
    engine.build_cube(&portfolio).unwrap();

    // Numeraire, two FX spots and one fixing per valuation date and sample.
    assert_eq!(writes.count(), 3 * SAMPLES * 4);
    let asd = engine.take_aggregation_scenario_data().unwrap();
    assert_eq!(asd.keys().len(), 4);
    for date in 0..3 {
        for sample in 0..SAMPLES {
            let numeraire = asd
                .get(date, sample, AggregationScenarioDataType::Numeraire, "")
                .unwrap();
            assert!(numeraire > 0.0);
            assert!(asd.get(date, sample, AggregationScenarioDataType::FxSpot, "GBP").unwrap() > 0.0);
        }
    }
    assert!(engine.aggregation_scenario_data().is_none());
}

#[test]
fn test_progress_reported() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let portfolio = demo_portfolio(&model, &scenario, 4);

    let single_progress = Arc::new(RecordingProgress::default());
    let mut single = AmcValuationEngine::single_threaded(
        Arc::clone(&model),
        Arc::clone(&scenario),
        None,
        AggregationDataRequest::default(),
    )
    .unwrap();
    single.register_progress_indicator(single_progress.clone());
    let mut cube = cube_for(&portfolio, &scenario, SAMPLES, 1);
    single.build_cube_into(&portfolio, &mut cube).unwrap();
    assert_eq!(
        single_progress.updates(),
        vec![(0, 5), (1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]
    );

    let multi_progress = Arc::new(RecordingProgress::default());
    let mut multi =
        AmcValuationEngine::multi_threaded(setup(2), scenario, AggregationDataRequest::default()).unwrap();
    multi.register_progress_indicator(multi_progress.clone());
    multi.build_cube(&portfolio).unwrap();
    let updates = multi_progress.updates();
    let (done, total) = *updates.last().unwrap();
    assert!(total > 0);
    assert_eq!(done, total);
    assert!(updates.iter().all(|(d, t)| d <= t));
}

#[test]
fn test_unbuildable_demo_trades_are_dropped() {
    let scenario = Arc::new(scenario("2,1Y", None));
    let model = model();
    let mut definition = demo_portfolio_definition(asof(), 3);
    definition.trades[1].trade_type = "Swaption".to_string();
    let portfolio = DemoPortfolioFactory
        .build(&ctx(), &definition, &EngineData::new(), &model, &market(), scenario.grid().dates())
        .unwrap();
    assert_eq!(portfolio.size(), 2);
    assert!(portfolio.ids().iter().all(|id| id != "DEMO-00001"));
}
