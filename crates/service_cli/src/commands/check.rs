//! Check command implementation
//!
//! Validates the configuration and prints the resulting simulation grid.

use pricer_amc::config::AmcEngineConfig;
use tracing::info;

use crate::Result;

/// Run the check command
pub fn run(config: &AmcEngineConfig) -> Result<()> {
    config.validate()?;
    let scenario = config.scenario_generator_data()?;
    let grid = scenario.grid();

    info!("Configuration is valid");
    println!("As of:            {}", config.asof);
    println!("Day counter:      {}", config.day_counter.name());
    println!("Samples:          {}", config.samples);
    println!("Threads:          {}", config.threads);
    println!("Seed:             {}", config.seed);
    println!("Sequence:         {:?}", config.sequence_type);
    println!("Simulation dates: {}", grid.size());
    println!("Valuation dates:  {}", grid.valuation_dates().len());
    println!("Close-out dates:  {}", grid.close_out_dates().len());
    match config.mpor {
        Some(mpor) => println!("MPOR:             {} ({:?})", mpor.lag, mpor.mode),
        None => println!("MPOR:             none"),
    }
    if !config.aggregation.is_empty() {
        println!("Aggregation:      indices {:?}, currencies {:?}", config.aggregation.indices, config.aggregation.currencies);
    }
    Ok(())
}
