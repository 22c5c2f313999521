//! Collaborators a multi-threaded engine calls to rebuild its inputs.
//!
//! Every worker builds its own market, model and portfolio through these
//! traits, so no built object is shared between threads. The order is
//! fixed: market from a cloned loader, model from the market, portfolio from
//! the transferable definition against that model and market.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use pricer_models::models::CrossAssetModel;
use serde::{Deserialize, Serialize};

use crate::cube::{DoublePrecisionInMemoryCube, NpvCube};
use crate::engine::EvaluationContext;
use crate::market::{Loader, Market};
use crate::portfolio::{Portfolio, PortfolioDefinition};

/// Error type returned by collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pricing engine configuration handed to the portfolio factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineData {
    /// Global parameters such as `RunType`
    #[serde(default)]
    pub global_parameters: BTreeMap<String, String>,
}

impl EngineData {
    /// Empty engine data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a global parameter.
    pub fn set_global_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.global_parameters.insert(name.into(), value.into());
    }

    /// Global parameter by name.
    pub fn global_parameter(&self, name: &str) -> Option<&str> {
        self.global_parameters.get(name).map(String::as_str)
    }

    /// Copy used by engine workers: additional results off, NPV run type.
    pub fn for_amc_worker(&self) -> Self {
        let mut data = self.clone();
        data.set_global_parameter("GenerateAdditionalResults", "false");
        data.set_global_parameter("RunType", "NPV");
        data
    }
}

/// Builds a market from loader data.
pub trait MarketBuilder: Send + Sync {
    /// Builds the market for `ctx.evaluation_date`.
    fn build(&self, ctx: &EvaluationContext, loader: &dyn Loader) -> Result<Arc<dyn Market>, BoxError>;
}

/// Builds the cross-asset model.
pub trait ModelBuilder: Send + Sync {
    /// Builds a calibrated model against `market`.
    fn build(
        &self,
        ctx: &EvaluationContext,
        market: &Arc<dyn Market>,
    ) -> Result<Arc<CrossAssetModel>, BoxError>;
}

/// Builds trades with AMC-capable instruments from their definitions.
pub trait PortfolioFactory: Send + Sync {
    /// Builds `definition` against `model` and `market`.
    ///
    /// `simulation_dates` are the dates the instruments will be simulated
    /// on; calculators may precompute schedules against them.
    fn build(
        &self,
        ctx: &EvaluationContext,
        definition: &PortfolioDefinition,
        engine_data: &EngineData,
        model: &Arc<CrossAssetModel>,
        market: &Arc<dyn Market>,
        simulation_dates: &[NaiveDate],
    ) -> Result<Portfolio, BoxError>;
}

/// Creates the per-worker output cubes of a multi-threaded run.
pub trait CubeFactory: Send + Sync {
    /// Allocates a cube.
    fn create(
        &self,
        asof: NaiveDate,
        ids: &BTreeSet<String>,
        dates: Vec<NaiveDate>,
        samples: usize,
        depth: usize,
    ) -> Box<dyn NpvCube>;
}

/// Default factory producing double precision in-memory cubes.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryCubeFactory;

impl CubeFactory for InMemoryCubeFactory {
    fn create(
        &self,
        asof: NaiveDate,
        ids: &BTreeSet<String>,
        dates: Vec<NaiveDate>,
        samples: usize,
        depth: usize,
    ) -> Box<dyn NpvCube> {
        Box::new(DoublePrecisionInMemoryCube::new(asof, ids, dates, samples, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_engine_data() {
        let mut data = EngineData::new();
        data.set_global_parameter("RunType", "Exposure");
        data.set_global_parameter("Calibrate", "true");
        let worker = data.for_amc_worker();
        assert_eq!(worker.global_parameter("RunType"), Some("NPV"));
        assert_eq!(worker.global_parameter("GenerateAdditionalResults"), Some("false"));
        assert_eq!(worker.global_parameter("Calibrate"), Some("true"));
        assert_eq!(data.global_parameter("RunType"), Some("Exposure"));
    }

    #[test]
    fn test_in_memory_cube_factory() {
        let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let ids: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        let cube = InMemoryCubeFactory.create(asof, &ids, vec![asof.succ_opt().unwrap()], 4, 2);
        assert_eq!(cube.num_ids(), 1);
        assert_eq!(cube.samples(), 4);
        assert_eq!(cube.depth(), 2);
    }
}
