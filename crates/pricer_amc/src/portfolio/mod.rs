//! Portfolio management.
//!
//! A [`Portfolio`] holds built trades ordered by trade id. Its transferable
//! form, [`PortfolioDefinition`], is a JSON document of trade definitions
//! used to hand sub-portfolios to engine workers.

mod error;
mod ids;
mod trade;

use std::collections::{BTreeMap, BTreeSet};

pub use error::PortfolioError;
pub use ids::{CounterpartyId, NettingSetId, TradeId};
pub use trade::{AmcInstrument, Position, Trade, TradeDefinition};

use serde::{Deserialize, Serialize};

/// Built trades keyed and ordered by id.
#[derive(Debug, Default)]
pub struct Portfolio {
    trades: BTreeMap<TradeId, Trade>,
}

impl Portfolio {
    /// Empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trade; ids must be unique.
    pub fn add(&mut self, trade: Trade) -> Result<(), PortfolioError> {
        if self.trades.contains_key(trade.id()) {
            return Err(PortfolioError::DuplicateTrade(trade.id().to_string()));
        }
        self.trades.insert(trade.id().clone(), trade);
        Ok(())
    }

    /// Removes a trade and returns it.
    pub fn remove(&mut self, id: &TradeId) -> Result<Trade, PortfolioError> {
        self.trades
            .remove(id)
            .ok_or_else(|| PortfolioError::TradeNotFound(id.to_string()))
    }

    /// Number of trades.
    pub fn size(&self) -> usize {
        self.trades.len()
    }

    /// True when the portfolio holds no trades.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Trade by id.
    pub fn get(&self, id: &TradeId) -> Result<&Trade, PortfolioError> {
        self.trades
            .get(id)
            .ok_or_else(|| PortfolioError::TradeNotFound(id.to_string()))
    }

    /// Trades in id order.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.values()
    }

    /// Trade ids as strings, the key set of an output cube.
    pub fn ids(&self) -> BTreeSet<String> {
        self.trades.keys().map(|id| id.to_string()).collect()
    }

    /// Serialisable form of the portfolio.
    pub fn definition(&self) -> PortfolioDefinition {
        PortfolioDefinition {
            trades: self.trades.values().map(|t| t.definition().clone()).collect(),
        }
    }
}

/// Transferable list of trade definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDefinition {
    /// Trade definitions
    pub trades: Vec<TradeDefinition>,
}

impl PortfolioDefinition {
    /// Wraps trade definitions.
    pub fn new(trades: Vec<TradeDefinition>) -> Self {
        Self { trades }
    }

    /// Number of trades.
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True when there are no trades.
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Trade ids as strings.
    pub fn ids(&self) -> BTreeSet<String> {
        self.trades.iter().map(|t| t.id.to_string()).collect()
    }

    /// Distributes trades round-robin over `parts` definitions: trade `i`
    /// (in the current order) goes to part `i % parts`.
    pub fn split_round_robin(&self, parts: usize) -> Result<Vec<PortfolioDefinition>, PortfolioError> {
        if parts == 0 {
            return Err(PortfolioError::ZeroSplit);
        }
        let mut split = vec![PortfolioDefinition::default(); parts];
        for (i, trade) in self.trades.iter().enumerate() {
            split[i % parts].trades.push(trade.clone());
        }
        Ok(split)
    }

    /// JSON encoding.
    pub fn to_json(&self) -> Result<String, PortfolioError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes the JSON encoding produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self, PortfolioError> {
        Ok(serde_json::from_str(json)?)
    }
}
