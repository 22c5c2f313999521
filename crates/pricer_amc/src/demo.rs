//! Reference collaborators for running the engine end to end.
//!
//! Market, model and portfolio are built from flat quotes:
//!
//! | Quote | Meaning |
//! |-------|---------|
//! | `IR/LGM/RATE/<CCY>` | flat continuously compounded rate |
//! | `IR/LGM/ALPHA/<CCY>` | LGM volatility |
//! | `IR/LGM/KAPPA/<CCY>` | LGM mean reversion |
//! | `FX/RATE/<CCY>/<BASE>` | base currency units per unit of `CCY` |
//! | `FX/VOL/<CCY>/<BASE>` | lognormal FX volatility |
//!
//! Trade types understood by [`DemoPortfolioFactory`]: `ZeroBond`,
//! `ZeroBondVectorised` (batched calculator) and `FxForward`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use pricer_core::types::{Currency, DayCountConvention, Tenor, TenorUnit};
use pricer_models::amc::{AmcCalculator, CalculatorError};
use pricer_models::instruments::{
    FxForward, FxForwardCalculator, ZeroBond, ZeroBondCalculator, ZeroBondVectorCalculator,
};
use pricer_models::ModelError;
use pricer_models::models::{CorrelationMatrix, CrossAssetModel, FxBsParametrization, LgmParametrization};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::builders::{BoxError, EngineData, MarketBuilder, ModelBuilder, PortfolioFactory};
use crate::engine::EvaluationContext;
use crate::market::{IborIndexSpec, InMemoryLoader, Loader, Market, MarketError};
use crate::portfolio::{AmcInstrument, Portfolio, PortfolioDefinition, Position, Trade, TradeDefinition};

/// Market holding quotes and ibor index conventions.
#[derive(Debug, Clone)]
pub struct DemoMarket {
    asof: NaiveDate,
    quotes: BTreeMap<String, f64>,
    indices: BTreeMap<String, IborIndexSpec>,
}

impl Market for DemoMarket {
    fn asof(&self) -> NaiveDate {
        self.asof
    }

    fn ibor_index(&self, name: &str) -> Result<IborIndexSpec, MarketError> {
        self.indices
            .get(name)
            .cloned()
            .ok_or_else(|| MarketError::IndexNotFound(name.to_string()))
    }

    fn quote(&self, name: &str) -> Result<f64, MarketError> {
        self.quotes
            .get(name)
            .copied()
            .ok_or_else(|| MarketError::QuoteNotFound {
                name: name.to_string(),
                date: self.asof,
            })
    }
}

/// Builds a [`DemoMarket`] from the loader quotes of the evaluation date.
#[derive(Debug, Clone, Default)]
pub struct DemoMarketBuilder {
    indices: Vec<String>,
}

impl DemoMarketBuilder {
    /// Builder registering the given ibor indices, e.g. `EUR-EURIBOR-6M`.
    pub fn new(indices: Vec<String>) -> Self {
        Self { indices }
    }
}

impl MarketBuilder for DemoMarketBuilder {
    fn build(&self, ctx: &EvaluationContext, loader: &dyn Loader) -> Result<Arc<dyn Market>, BoxError> {
        let quotes: BTreeMap<String, f64> = loader
            .quotes(ctx.evaluation_date)
            .into_iter()
            .map(|q| (q.name, q.value))
            .collect();
        if quotes.is_empty() {
            return Err(format!("no market quotes for {}", ctx.evaluation_date).into());
        }
        let indices = self
            .indices
            .iter()
            .map(|name| Ok((name.clone(), IborIndexSpec::parse(name)?)))
            .collect::<Result<BTreeMap<_, _>, MarketError>>()?;
        debug!(
            worker = ctx.worker_id,
            quotes = quotes.len(),
            indices = indices.len(),
            "Demo market built"
        );
        Ok(Arc::new(DemoMarket {
            asof: ctx.evaluation_date,
            quotes,
            indices,
        }))
    }
}

/// Builds a cross-asset model from LGM and FX quotes.
///
/// The base currency is IR component 0; `foreign` currencies follow in the
/// given order, each with one FX component.
#[derive(Debug, Clone)]
pub struct DemoModelBuilder {
    base: Currency,
    foreign: Vec<Currency>,
    day_counter: DayCountConvention,
    correlation: Option<CorrelationMatrix>,
}

impl DemoModelBuilder {
    /// Builder with independent factors.
    pub fn new(base: Currency, foreign: Vec<Currency>, day_counter: DayCountConvention) -> Self {
        Self {
            base,
            foreign,
            day_counter,
            correlation: None,
        }
    }

    /// Sets the factor correlation, ordered IR components then FX components.
    pub fn with_correlation(mut self, correlation: CorrelationMatrix) -> Self {
        self.correlation = Some(correlation);
        self
    }

    /// Builds the model from `market` quotes.
    pub fn build_model(&self, market: &dyn Market) -> Result<CrossAssetModel, BoxError> {
        let lgm = |ccy: Currency| -> Result<LgmParametrization, BoxError> {
            Ok(LgmParametrization::new(
                ccy,
                market.quote(&format!("IR/LGM/RATE/{ccy}"))?,
                market.quote(&format!("IR/LGM/ALPHA/{ccy}"))?,
                market.quote(&format!("IR/LGM/KAPPA/{ccy}"))?,
            )?)
        };
        let mut irs = vec![lgm(self.base)?];
        let mut fxs = Vec::with_capacity(self.foreign.len());
        for &ccy in &self.foreign {
            irs.push(lgm(ccy)?);
            fxs.push(FxBsParametrization::new(
                ccy,
                market.quote(&format!("FX/RATE/{ccy}/{}", self.base))?,
                market.quote(&format!("FX/VOL/{ccy}/{}", self.base))?,
            )?);
        }
        let model = match &self.correlation {
            Some(correlation) => CrossAssetModel::new(irs, fxs, correlation.clone(), self.day_counter)?,
            None => CrossAssetModel::uncorrelated(irs, fxs, self.day_counter)?,
        };
        Ok(model)
    }
}

impl ModelBuilder for DemoModelBuilder {
    fn build(
        &self,
        ctx: &EvaluationContext,
        market: &Arc<dyn Market>,
    ) -> Result<Arc<CrossAssetModel>, BoxError> {
        let model = self.build_model(market.as_ref())?;
        debug!(worker = ctx.worker_id, state_size = model.state_size(), "Demo model built");
        Ok(Arc::new(model))
    }
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
struct ZeroBondTerms {
    currency: Currency,
    maturity: NaiveDate,
    notional: f64,
    #[serde(default = "one")]
    multiplier: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct FxForwardTerms {
    foreign: Currency,
    foreign_notional: f64,
    strike: f64,
    maturity: NaiveDate,
    #[serde(default = "one")]
    multiplier: f64,
    #[serde(default)]
    position: Option<Position>,
}

#[derive(Debug, Clone)]
enum DemoTerms {
    ZeroBond(ZeroBond),
    ZeroBondVectorised(ZeroBond),
    FxForward(FxForward),
}

/// Instrument built by [`DemoPortfolioFactory`].
pub struct DemoInstrument {
    terms: DemoTerms,
    model: Arc<CrossAssetModel>,
    multiplier: f64,
    position: Option<Position>,
}

impl AmcInstrument for DemoInstrument {
    fn multiplier(&self) -> f64 {
        self.multiplier
    }

    fn option_position(&self) -> Option<Position> {
        self.position
    }

    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        let model = Arc::clone(&self.model);
        let invalid = |e: ModelError| CalculatorError::InvalidInput(e.to_string());
        Ok(match &self.terms {
            DemoTerms::ZeroBond(bond) => {
                AmcCalculator::SinglePath(Box::new(ZeroBondCalculator::new(bond.clone(), model).map_err(invalid)?))
            }
            DemoTerms::ZeroBondVectorised(bond) => AmcCalculator::MultiVariates(Box::new(
                ZeroBondVectorCalculator::new(bond.clone(), model).map_err(invalid)?,
            )),
            DemoTerms::FxForward(fwd) => {
                AmcCalculator::SinglePath(Box::new(FxForwardCalculator::new(fwd.clone(), model).map_err(invalid)?))
            }
        })
    }
}

/// Builds demo instruments from trade definitions.
///
/// Definitions that cannot be built are logged and left out of the
/// portfolio.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoPortfolioFactory;

impl DemoPortfolioFactory {
    fn build_instrument(
        &self,
        definition: &TradeDefinition,
        model: &Arc<CrossAssetModel>,
        asof: NaiveDate,
    ) -> Result<DemoInstrument, BoxError> {
        let time = |date: NaiveDate| model.day_counter().year_fraction(asof, date);
        let (terms, multiplier, position) = match definition.trade_type.as_str() {
            kind @ ("ZeroBond" | "ZeroBondVectorised") => {
                let t: ZeroBondTerms = serde_json::from_value(definition.data.clone())?;
                let bond = ZeroBond {
                    currency: t.currency,
                    maturity: time(t.maturity),
                    notional: t.notional,
                };
                let terms = if kind == "ZeroBond" {
                    DemoTerms::ZeroBond(bond)
                } else {
                    DemoTerms::ZeroBondVectorised(bond)
                };
                (terms, t.multiplier, None)
            }
            "FxForward" => {
                let t: FxForwardTerms = serde_json::from_value(definition.data.clone())?;
                let fwd = FxForward {
                    foreign: t.foreign,
                    foreign_notional: t.foreign_notional,
                    strike: t.strike,
                    maturity: time(t.maturity),
                };
                (DemoTerms::FxForward(fwd), t.multiplier, t.position)
            }
            other => return Err(format!("unsupported trade type '{other}'").into()),
        };
        Ok(DemoInstrument {
            terms,
            model: Arc::clone(model),
            multiplier,
            position,
        })
    }
}

impl PortfolioFactory for DemoPortfolioFactory {
    fn build(
        &self,
        ctx: &EvaluationContext,
        definition: &PortfolioDefinition,
        _engine_data: &EngineData,
        model: &Arc<CrossAssetModel>,
        _market: &Arc<dyn Market>,
        _simulation_dates: &[NaiveDate],
    ) -> Result<Portfolio, BoxError> {
        let mut portfolio = Portfolio::new();
        for trade in &definition.trades {
            match self.build_instrument(trade, model, ctx.evaluation_date) {
                Ok(instrument) => portfolio.add(Trade::new(trade.clone(), Box::new(instrument)))?,
                Err(e) => warn!(
                    trade_id = %trade.id,
                    trade_type = %trade.trade_type,
                    error = %e,
                    "Trade could not be built, removed from portfolio"
                ),
            }
        }
        Ok(portfolio)
    }
}

/// Loader with EUR, USD and GBP quotes for `asof`.
pub fn demo_loader(asof: NaiveDate) -> InMemoryLoader {
    let mut loader = InMemoryLoader::new();
    for (ccy, rate, alpha, kappa) in [
        (Currency::EUR, 0.025, 0.010, 0.03),
        (Currency::USD, 0.040, 0.012, 0.02),
        (Currency::GBP, 0.035, 0.011, 0.025),
    ] {
        loader.add_quote(asof, format!("IR/LGM/RATE/{ccy}"), rate);
        loader.add_quote(asof, format!("IR/LGM/ALPHA/{ccy}"), alpha);
        loader.add_quote(asof, format!("IR/LGM/KAPPA/{ccy}"), kappa);
    }
    for (ccy, spot, vol) in [(Currency::USD, 0.92, 0.08), (Currency::GBP, 1.16, 0.07)] {
        loader.add_quote(asof, format!("FX/RATE/{ccy}/EUR"), spot);
        loader.add_quote(asof, format!("FX/VOL/{ccy}/EUR"), vol);
    }
    loader
}

/// Model builder matching [`demo_loader`]: EUR base with USD and GBP.
pub fn demo_model_builder(day_counter: DayCountConvention) -> DemoModelBuilder {
    DemoModelBuilder::new(Currency::EUR, vec![Currency::USD, Currency::GBP], day_counter)
}

/// `n` trades cycling through the demo trade types, maturities one to ten
/// years after `asof`.
pub fn demo_portfolio_definition(asof: NaiveDate, n: usize) -> PortfolioDefinition {
    let currencies = [Currency::EUR, Currency::USD, Currency::GBP];
    let trades = (0..n)
        .map(|i| {
            let years = u32::try_from(i % 10 + 1).unwrap_or(1);
            let maturity = Tenor::new(years, TenorUnit::Years)
                .advance(asof)
                .unwrap_or(asof);
            let id = format!("DEMO-{i:05}");
            let (trade_type, data) = match i % 3 {
                0 => (
                    "ZeroBond",
                    serde_json::json!({
                        "currency": currencies[i % currencies.len()],
                        "maturity": maturity,
                        "notional": 1_000_000.0,
                    }),
                ),
                1 => (
                    "ZeroBondVectorised",
                    serde_json::json!({
                        "currency": currencies[(i + 1) % currencies.len()],
                        "maturity": maturity,
                        "notional": 500_000.0,
                    }),
                ),
                _ => (
                    "FxForward",
                    serde_json::json!({
                        "foreign": if i % 2 == 0 { Currency::USD } else { Currency::GBP },
                        "foreign_notional": 1_000_000.0,
                        "strike": if i % 2 == 0 { 0.93 } else { 1.15 },
                        "maturity": maturity,
                    }),
                ),
            };
            TradeDefinition::new(id, trade_type)
                .with_counterparty(format!("CP-{}", i % 4))
                .with_netting_set(format!("NS-{}", i % 4))
                .with_data(data)
        })
        .collect();
    PortfolioDefinition::new(trades)
}
