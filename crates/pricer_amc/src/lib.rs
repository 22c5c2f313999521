//! # pricer_amc: American Monte Carlo Valuation Engine
//!
//! Values a portfolio along simulated paths of a cross-asset model and writes
//! per-trade, per-date, per-sample values into an NPV cube.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 pricer_amc (L3)                      │
//! ├──────────────────────────────────────────────────────┤
//! │  engine/     - AmcValuationEngine, core loop,        │
//! │                MPOR write plan, path state buffers   │
//! │  cube/       - NpvCube, InMemoryCube, JointNpvCube   │
//! │  scenario/   - DateGrid, ScenarioGeneratorData,      │
//! │                aggregation scenario data             │
//! │  portfolio/  - Trade, TradeDefinition, Portfolio     │
//! │  market      - Loader, Market, ibor indices          │
//! │  builders    - market/model/portfolio collaborators  │
//! │  exposure    - EE, ENE, PFE over cubes               │
//! │  config      - TOML configuration                    │
//! │  demo        - reference collaborators               │
//! └──────────────────────────────────────────────────────┘
//!          ↓
//! ┌──────────────────────────────────────────────────────┐
//! │  pricer_models (L2): CrossAssetModel, paths, AMC     │
//! │  calculators                                         │
//! └──────────────────────────────────────────────────────┘
//!          ↓
//! ┌──────────────────────────────────────────────────────┐
//! │  pricer_core (L1): currencies, dates, RandomVariable │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use pricer_amc::builders::{EngineData, MarketBuilder, ModelBuilder, PortfolioFactory};
//! use pricer_amc::cube::{InMemoryCube, NpvCube};
//! use pricer_amc::demo::{
//!     demo_loader, demo_model_builder, demo_portfolio_definition, DemoMarketBuilder,
//!     DemoPortfolioFactory,
//! };
//! use pricer_amc::engine::{AggregationDataRequest, AmcValuationEngine, EvaluationContext, ObservationMode};
//! use pricer_amc::scenario::{DateGrid, ScenarioGeneratorData};
//! use pricer_core::types::DayCountConvention;
//!
//! let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let dc = DayCountConvention::ActualActual365;
//! let ctx = EvaluationContext::new(asof, ObservationMode::None, 0);
//!
//! let market = DemoMarketBuilder::default().build(&ctx, &demo_loader(asof)).unwrap();
//! let model = demo_model_builder(dc).build(&ctx, &market).unwrap();
//! let grid = DateGrid::from_spec(asof, "4,6M", dc).unwrap();
//! let definition = demo_portfolio_definition(asof, 3);
//! let portfolio = DemoPortfolioFactory
//!     .build(&ctx, &definition, &EngineData::new(), &model, &market, grid.dates())
//!     .unwrap();
//!
//! let mut cube = InMemoryCube::<f64>::new(asof, &portfolio.ids(), grid.valuation_dates(), 16, 1);
//! let scenario = Arc::new(ScenarioGeneratorData::new(grid, 42));
//! let mut engine =
//!     AmcValuationEngine::single_threaded(model, scenario, Some(market), AggregationDataRequest::default())
//!         .unwrap();
//! let report = engine.build_cube_into(&portfolio, &mut cube).unwrap();
//! assert_eq!(report.calculators, 3);
//! assert!(report.valuation_failures.is_empty());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod builders;
pub mod config;
pub mod cube;
pub mod demo;
pub mod engine;
pub mod error;
pub mod exposure;
pub mod market;
pub mod portfolio;
pub mod progress;
pub mod scenario;

pub use engine::AmcValuationEngine;
pub use error::EngineError;
