//! Trades: a serialisable definition plus a built instrument.

use std::fmt;

use pricer_models::amc::{AmcCalculator, CalculatorError};
use serde::{Deserialize, Serialize};

use super::ids::{CounterpartyId, NettingSetId, TradeId};

/// Serialisable description of a trade.
///
/// This is what crosses thread boundaries in multi-threaded runs: each worker
/// receives definitions and rebuilds the instruments against its own model.
/// `data` carries the trade-type specific terms interpreted by the
/// [`PortfolioFactory`](crate::builders::PortfolioFactory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDefinition {
    /// Trade identifier
    pub id: TradeId,
    /// Trade type understood by the portfolio factory
    pub trade_type: String,
    /// Counterparty
    #[serde(default)]
    pub counterparty: CounterpartyId,
    /// Netting set
    #[serde(default)]
    pub netting_set: NettingSetId,
    /// Trade-type specific terms
    #[serde(default)]
    pub data: serde_json::Value,
}

impl TradeDefinition {
    /// Creates a definition with empty envelope and terms.
    pub fn new(id: impl Into<TradeId>, trade_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trade_type: trade_type.into(),
            counterparty: CounterpartyId::default(),
            netting_set: NettingSetId::default(),
            data: serde_json::Value::Null,
        }
    }

    /// Sets the counterparty.
    pub fn with_counterparty(mut self, counterparty: impl Into<CounterpartyId>) -> Self {
        self.counterparty = counterparty.into();
        self
    }

    /// Sets the netting set.
    pub fn with_netting_set(mut self, netting_set: impl Into<NettingSetId>) -> Self {
        self.netting_set = netting_set.into();
        self
    }

    /// Sets the trade terms.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Long or short position of an option wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// Bought option
    Long,
    /// Sold option
    Short,
}

impl Position {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }
}

/// A built instrument that can hand out an AMC calculator.
pub trait AmcInstrument: Send + Sync {
    /// Instrument multiplier applied to every calculator value.
    fn multiplier(&self) -> f64 {
        1.0
    }

    /// Position when the instrument is an option wrapper, `None` otherwise.
    fn option_position(&self) -> Option<Position> {
        None
    }

    /// Creates the calculator used along the simulated paths.
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError>;
}

/// A portfolio trade.
pub struct Trade {
    definition: TradeDefinition,
    instrument: Box<dyn AmcInstrument>,
}

impl Trade {
    /// Pairs a definition with its built instrument.
    pub fn new(definition: TradeDefinition, instrument: Box<dyn AmcInstrument>) -> Self {
        Self {
            definition,
            instrument,
        }
    }

    /// Trade identifier.
    pub fn id(&self) -> &TradeId {
        &self.definition.id
    }

    /// Trade type.
    pub fn trade_type(&self) -> &str {
        &self.definition.trade_type
    }

    /// Serialisable definition.
    pub fn definition(&self) -> &TradeDefinition {
        &self.definition
    }

    /// Built instrument.
    pub fn instrument(&self) -> &dyn AmcInstrument {
        self.instrument.as_ref()
    }

    /// Instrument multiplier, sign-adjusted for short option positions.
    pub fn effective_multiplier(&self) -> f64 {
        let sign = self
            .instrument
            .option_position()
            .map_or(1.0, Position::sign);
        self.instrument.multiplier() * sign
    }
}

impl fmt::Debug for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trade")
            .field("id", &self.definition.id)
            .field("trade_type", &self.definition.trade_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Wrapper {
        multiplier: f64,
        position: Option<Position>,
    }

    impl AmcInstrument for Wrapper {
        fn multiplier(&self) -> f64 {
            self.multiplier
        }

        fn option_position(&self) -> Option<Position> {
            self.position
        }

        fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
            Err(CalculatorError::NotSupported("test".to_string()))
        }
    }

    fn trade(multiplier: f64, position: Option<Position>) -> Trade {
        Trade::new(
            TradeDefinition::new("T1", "Test"),
            Box::new(Wrapper {
                multiplier,
                position,
            }),
        )
    }

    #[test]
    fn test_effective_multiplier() {
        assert_eq!(trade(2.0, None).effective_multiplier(), 2.0);
        assert_eq!(trade(2.0, Some(Position::Long)).effective_multiplier(), 2.0);
        assert_eq!(trade(2.0, Some(Position::Short)).effective_multiplier(), -2.0);
    }

    #[test]
    fn test_definition_builder_and_serde() {
        let def = TradeDefinition::new("T9", "ZeroBond")
            .with_counterparty("CP1")
            .with_netting_set("NS1")
            .with_data(serde_json::json!({"notional": 100.0}));
        let json = serde_json::to_string(&def).unwrap();
        let back: TradeDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
        assert_eq!(back.netting_set.as_str(), "NS1");
    }

    #[test]
    fn test_definition_defaults_when_missing() {
        let def: TradeDefinition =
            serde_json::from_str(r#"{"id":"T1","trade_type":"FxForward"}"#).unwrap();
        assert_eq!(def.counterparty.as_str(), "");
        assert!(def.data.is_null());
    }

    #[test]
    fn test_trade_debug_shows_id() {
        let t = trade(1.0, None);
        assert!(format!("{t:?}").contains("T1"));
        assert_eq!(t.trade_type(), "Test");
    }
}
