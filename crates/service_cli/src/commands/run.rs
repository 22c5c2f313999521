//! Run command implementation
//!
//! Builds the NPV cube for a portfolio with the multi-threaded engine and
//! the demo collaborators, then reports exposures per netting set.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use pricer_amc::builders::{BoxError, EngineData, MarketBuilder, ModelBuilder, PortfolioFactory};
use pricer_amc::config::AmcEngineConfig;
use pricer_amc::cube::NpvCube;
use pricer_amc::demo::{
    demo_loader, demo_model_builder, demo_portfolio_definition, DemoMarketBuilder, DemoPortfolioFactory,
};
use pricer_amc::engine::{AmcValuationEngine, EvaluationContext, MultiThreadedSetup, ObservationMode};
use pricer_amc::exposure::{ExposureCalculator, ExposureProfile};
use pricer_amc::portfolio::PortfolioDefinition;
use pricer_amc::progress::ProgressLog;
use pricer_amc::scenario::InMemoryAggregationScenarioData;
use serde_json::json;
use tracing::{info, warn};

use crate::{CliError, Result};

/// Run the run command
pub fn run(
    config: &AmcEngineConfig,
    portfolio: Option<&Path>,
    trades: usize,
    confidence: f64,
    output: Option<&Path>,
) -> Result<()> {
    config.validate()?;
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(CliError::InvalidArgument(format!(
            "confidence must lie in (0, 1), got {confidence}"
        )));
    }
    let scenario = Arc::new(config.scenario_generator_data()?);
    let grid = scenario.grid();

    let definition = match portfolio {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|_| CliError::FileNotFound(path.to_path_buf()))?;
            PortfolioDefinition::from_json(&json)?
        }
        None => demo_portfolio_definition(config.asof, trades),
    };
    info!(trades = definition.len(), "Portfolio definition loaded");

    let ctx = EvaluationContext::new(config.asof, ObservationMode::None, 0);
    let loader = demo_loader(config.asof);
    let market_builder = DemoMarketBuilder::new(config.aggregation.indices.clone());
    let model_builder = demo_model_builder(config.day_counter);
    let setup_error = |stage: &'static str| move |e: BoxError| CliError::Setup {
        stage,
        message: e.to_string(),
    };
    let market = market_builder
        .build(&ctx, &loader)
        .map_err(setup_error("market builder"))?;
    let model = model_builder
        .build(&ctx, &market)
        .map_err(setup_error("model builder"))?;
    let portfolio = DemoPortfolioFactory
        .build(&ctx, &definition, &EngineData::new(), &model, &market, grid.dates())
        .map_err(setup_error("portfolio factory"))?;
    if portfolio.is_empty() {
        return Err(CliError::InvalidArgument("no trade could be built".to_string()));
    }

    let setup = MultiThreadedSetup::new(
        config.threads,
        config.asof,
        config.samples,
        Arc::new(loader),
        Arc::new(market_builder),
        Arc::new(model_builder),
        Arc::new(DemoPortfolioFactory),
    );
    let mut engine = AmcValuationEngine::multi_threaded(setup, Arc::clone(&scenario), config.aggregation.clone())?;
    engine.register_progress_indicator(Arc::new(ProgressLog::new("AMC valuation", 10)));
    engine.set_aggregation_scenario_data(Box::new(InMemoryAggregationScenarioData::new(
        grid.valuation_dates().len(),
        config.samples,
    )));

    let report = engine.build_cube(&portfolio)?;
    if !report.extraction_failures.is_empty() || !report.valuation_failures.is_empty() {
        warn!(
            extraction_failures = report.extraction_failures.len(),
            valuation_failures = report.valuation_failures.len(),
            "Some trades were not fully valued"
        );
    }
    let cube = engine.joint_output_cube()?;
    let asd = engine.take_aggregation_scenario_data();

    let mut netting_sets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for trade in portfolio.trades() {
        netting_sets
            .entry(trade.definition().netting_set.to_string())
            .or_default()
            .push(trade.id().to_string());
    }

    let times = &grid.valuation_time_grid().times()[1..];
    let mut profiles = BTreeMap::new();
    for (netting_set, ids) in &netting_sets {
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let profile = ExposureCalculator::profile(&cube, &ids, 0, times, confidence, asd.as_deref())?;
        profiles.insert(netting_set.clone(), profile);
    }

    print_summary(&cube, &report.timings.total, &profiles);
    if let Some(path) = output {
        write_report(path, &profiles)?;
    }
    info!(
        trades = report.trades,
        calculators = report.calculators,
        netting_sets = profiles.len(),
        "AMC run complete"
    );
    Ok(())
}

fn print_summary(cube: &dyn NpvCube, elapsed: &std::time::Duration, profiles: &BTreeMap<String, ExposureProfile>) {
    println!(
        "\nCube: {} trades x {} dates x {} samples x depth {} ({:.2?})",
        cube.num_ids(),
        cube.num_dates(),
        cube.samples(),
        cube.depth(),
        elapsed
    );
    println!("┌──────────────┬────────────────┬────────────────┬────────────────┐");
    println!("│ Netting set  │ EPE            │ Effective EPE  │ Peak PFE       │");
    println!("├──────────────┼────────────────┼────────────────┼────────────────┤");
    for (netting_set, p) in profiles {
        println!(
            "│ {:<12} │ {:>14.2} │ {:>14.2} │ {:>14.2} │",
            netting_set, p.epe, p.effective_epe, p.peak_pfe
        );
    }
    println!("└──────────────┴────────────────┴────────────────┴────────────────┘");
}

fn write_report(path: &Path, profiles: &BTreeMap<String, ExposureProfile>) -> Result<()> {
    let report: serde_json::Map<String, serde_json::Value> = profiles
        .iter()
        .map(|(netting_set, p)| {
            (
                netting_set.clone(),
                json!({
                    "dates": p.dates,
                    "ee": p.ee,
                    "ene": p.ene,
                    "pfe": p.pfe,
                    "confidence": p.confidence,
                    "epe": p.epe,
                    "effective_epe": p.effective_epe,
                    "peak_pfe": p.peak_pfe,
                }),
            )
        })
        .collect();
    let content = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, content).map_err(|source| CliError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Exposure report written");
    Ok(())
}
