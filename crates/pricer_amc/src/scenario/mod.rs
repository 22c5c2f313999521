//! Scenario set-up: simulation dates, generator settings and the
//! aggregation data recorded alongside the cube.

mod aggregation;
mod generator_data;
mod grid;

pub use aggregation::{
    AggregationDataError, AggregationScenarioData, AggregationScenarioDataType,
    InMemoryAggregationScenarioData,
};
pub use generator_data::{MporMode, ScenarioGeneratorData};
pub use grid::{DateGrid, GridError};
