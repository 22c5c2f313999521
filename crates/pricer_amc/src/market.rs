//! Market data access consumed by the engine.
//!
//! The engine never builds curves itself. It needs a [`Market`] to resolve
//! ibor indices for aggregation data, and in multi-threaded runs each worker
//! builds its own market from a [`ClonedLoader`] snapshot of the caller's
//! [`Loader`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use pricer_core::types::{Currency, Tenor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Market lookup errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    /// The index is not available in the market.
    #[error("index '{0}' not found in market")]
    IndexNotFound(String),

    /// The index name cannot be parsed.
    #[error("invalid index name '{0}': expected <CCY>-<NAME>-<TENOR>")]
    InvalidIndexName(String),

    /// A required quote is missing.
    #[error("quote '{name}' missing for {date}")]
    QuoteNotFound {
        /// Quote name
        name: String,
        /// Quote date
        date: NaiveDate,
    },
}

/// A named market quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Quote name, e.g. `FX/RATE/USD/EUR`
    pub name: String,
    /// Quote value
    pub value: f64,
}

/// A historical index fixing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixing {
    /// Index name
    pub name: String,
    /// Fixing date
    pub date: NaiveDate,
    /// Fixing value
    pub value: f64,
}

/// Source of market quotes and fixings.
pub trait Loader: Send + Sync {
    /// Quotes available for `date`.
    fn quotes(&self, date: NaiveDate) -> Vec<MarketQuote>;

    /// All fixings.
    fn fixings(&self) -> Vec<Fixing>;

    /// Value of the quote `name` on `date`.
    fn quote(&self, date: NaiveDate, name: &str) -> Result<f64, MarketError> {
        self.quotes(date)
            .into_iter()
            .find(|q| q.name == name)
            .map(|q| q.value)
            .ok_or_else(|| MarketError::QuoteNotFound {
                name: name.to_string(),
                date,
            })
    }
}

/// Loader backed by maps in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    quotes: BTreeMap<NaiveDate, Vec<MarketQuote>>,
    fixings: Vec<Fixing>,
}

impl InMemoryLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quote for `date`.
    pub fn add_quote(&mut self, date: NaiveDate, name: impl Into<String>, value: f64) {
        self.quotes.entry(date).or_default().push(MarketQuote {
            name: name.into(),
            value,
        });
    }

    /// Adds a fixing.
    pub fn add_fixing(&mut self, date: NaiveDate, name: impl Into<String>, value: f64) {
        self.fixings.push(Fixing {
            name: name.into(),
            date,
            value,
        });
    }
}

impl Loader for InMemoryLoader {
    fn quotes(&self, date: NaiveDate) -> Vec<MarketQuote> {
        self.quotes.get(&date).cloned().unwrap_or_default()
    }

    fn fixings(&self) -> Vec<Fixing> {
        self.fixings.clone()
    }
}

/// Owned snapshot of another loader's quotes for one date plus all fixings.
///
/// Each worker of a multi-threaded run gets its own copy, so market building
/// never shares state with the caller's loader.
#[derive(Debug, Clone)]
pub struct ClonedLoader {
    asof: NaiveDate,
    quotes: Vec<MarketQuote>,
    fixings: Vec<Fixing>,
}

impl ClonedLoader {
    /// Copies the quotes for `asof` and all fixings from `source`.
    pub fn new(asof: NaiveDate, source: &dyn Loader) -> Self {
        Self {
            asof,
            quotes: source.quotes(asof),
            fixings: source.fixings(),
        }
    }

    /// Snapshot date.
    pub fn asof(&self) -> NaiveDate {
        self.asof
    }
}

impl Loader for ClonedLoader {
    fn quotes(&self, date: NaiveDate) -> Vec<MarketQuote> {
        if date == self.asof {
            self.quotes.clone()
        } else {
            Vec::new()
        }
    }

    fn fixings(&self) -> Vec<Fixing> {
        self.fixings.clone()
    }
}

/// Ibor index conventions needed to project simulated fixings.
#[derive(Debug, Clone, PartialEq)]
pub struct IborIndexSpec {
    name: String,
    currency: Currency,
    tenor: Tenor,
}

impl IborIndexSpec {
    /// Creates an index description.
    pub fn new(name: impl Into<String>, currency: Currency, tenor: Tenor) -> Self {
        Self {
            name: name.into(),
            currency,
            tenor,
        }
    }

    /// Parses names of the form `EUR-EURIBOR-6M`.
    pub fn parse(name: &str) -> Result<Self, MarketError> {
        let invalid = || MarketError::InvalidIndexName(name.to_string());
        let parts: Vec<&str> = name.split('-').collect();
        if parts.len() < 3 {
            return Err(invalid());
        }
        let currency: Currency = parts[0].parse().map_err(|_| invalid())?;
        let tenor: Tenor = parts[parts.len() - 1].parse().map_err(|_| invalid())?;
        Ok(Self::new(name, currency, tenor))
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Index tenor.
    pub fn tenor(&self) -> Tenor {
        self.tenor
    }
}

impl fmt::Display for IborIndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Built market as seen by the engine.
pub trait Market: Send + Sync {
    /// Market date.
    fn asof(&self) -> NaiveDate;

    /// Ibor index by name.
    fn ibor_index(&self, name: &str) -> Result<IborIndexSpec, MarketError>;

    /// Market quote by name, as of the market date.
    fn quote(&self, name: &str) -> Result<f64, MarketError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricer_core::types::TenorUnit;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_in_memory_loader() {
        let mut loader = InMemoryLoader::new();
        loader.add_quote(ymd(2024, 1, 2), "FX/RATE/USD/EUR", 0.92);
        loader.add_fixing(ymd(2023, 12, 29), "EUR-EURIBOR-6M", 0.039);
        assert_eq!(loader.quote(ymd(2024, 1, 2), "FX/RATE/USD/EUR").unwrap(), 0.92);
        assert!(matches!(
            loader.quote(ymd(2024, 1, 3), "FX/RATE/USD/EUR"),
            Err(MarketError::QuoteNotFound { .. })
        ));
        assert_eq!(loader.fixings().len(), 1);
    }

    #[test]
    fn test_cloned_loader_snapshots_one_date() {
        let mut loader = InMemoryLoader::new();
        loader.add_quote(ymd(2024, 1, 2), "A", 1.0);
        loader.add_quote(ymd(2024, 1, 3), "B", 2.0);
        loader.add_fixing(ymd(2023, 12, 29), "F", 0.5);

        let cloned = ClonedLoader::new(ymd(2024, 1, 2), &loader);
        loader.add_quote(ymd(2024, 1, 2), "C", 3.0);

        assert_eq!(cloned.asof(), ymd(2024, 1, 2));
        assert_eq!(cloned.quotes(ymd(2024, 1, 2)).len(), 1);
        assert!(cloned.quotes(ymd(2024, 1, 3)).is_empty());
        assert_eq!(cloned.fixings().len(), 1);
    }

    #[test]
    fn test_parse_index_name() {
        let idx = IborIndexSpec::parse("EUR-EURIBOR-6M").unwrap();
        assert_eq!(idx.currency(), Currency::EUR);
        assert_eq!(idx.tenor(), Tenor::new(6, TenorUnit::Months));
        assert_eq!(idx.to_string(), "EUR-EURIBOR-6M");

        let libor = IborIndexSpec::parse("USD-LIBOR-3M").unwrap();
        assert_eq!(libor.currency(), Currency::USD);

        assert!(IborIndexSpec::parse("EURIBOR6M").is_err());
        assert!(IborIndexSpec::parse("XXX-EURIBOR-6M").is_err());
        assert!(IborIndexSpec::parse("EUR-EURIBOR-6Q").is_err());
    }
}
