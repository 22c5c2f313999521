//! Aggregation scenario data.
//!
//! Per-date, per-sample market observables recorded during simulation for
//! use by post-processing (collateral, netting, exposure aggregation).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a recorded observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AggregationScenarioDataType {
    /// Index fixing, qualified by index name
    IndexFixing,
    /// FX spot against the base currency, qualified by currency code
    FxSpot,
    /// Base currency numeraire, unqualified
    Numeraire,
}

impl fmt::Display for AggregationScenarioDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationScenarioDataType::IndexFixing => "IndexFixing",
            AggregationScenarioDataType::FxSpot => "FxSpot",
            AggregationScenarioDataType::Numeraire => "Numeraire",
        };
        f.write_str(name)
    }
}

/// Aggregation data access errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationDataError {
    /// A date or sample index is outside the container.
    #[error("aggregation data {dimension} index {index} out of range (size {size})")]
    OutOfRange {
        /// Dimension name
        dimension: &'static str,
        /// Requested index
        index: usize,
        /// Dimension size
        size: usize,
    },
}

/// Store for recorded observables.
pub trait AggregationScenarioData: Send {
    /// Number of valuation dates.
    fn dim_dates(&self) -> usize;

    /// Number of samples.
    fn dim_samples(&self) -> usize;

    /// Records a value.
    fn set(
        &mut self,
        date: usize,
        sample: usize,
        value: f64,
        data_type: AggregationScenarioDataType,
        qualifier: &str,
    ) -> Result<(), AggregationDataError>;

    /// Recorded value, `None` if the key was never written.
    fn get(
        &self,
        date: usize,
        sample: usize,
        data_type: AggregationScenarioDataType,
        qualifier: &str,
    ) -> Option<f64>;

    /// Keys written so far.
    fn keys(&self) -> Vec<(AggregationScenarioDataType, String)>;
}

/// Dense in-memory aggregation data.
#[derive(Debug, Clone)]
pub struct InMemoryAggregationScenarioData {
    dim_dates: usize,
    dim_samples: usize,
    data: BTreeMap<(AggregationScenarioDataType, String), Vec<f64>>,
}

impl InMemoryAggregationScenarioData {
    /// Empty container for `dim_dates` dates and `dim_samples` samples.
    pub fn new(dim_dates: usize, dim_samples: usize) -> Self {
        Self {
            dim_dates,
            dim_samples,
            data: BTreeMap::new(),
        }
    }

    fn offset(&self, date: usize, sample: usize) -> Result<usize, AggregationDataError> {
        if date >= self.dim_dates {
            return Err(AggregationDataError::OutOfRange {
                dimension: "date",
                index: date,
                size: self.dim_dates,
            });
        }
        if sample >= self.dim_samples {
            return Err(AggregationDataError::OutOfRange {
                dimension: "sample",
                index: sample,
                size: self.dim_samples,
            });
        }
        Ok(date * self.dim_samples + sample)
    }
}

impl AggregationScenarioData for InMemoryAggregationScenarioData {
    fn dim_dates(&self) -> usize {
        self.dim_dates
    }

    fn dim_samples(&self) -> usize {
        self.dim_samples
    }

    fn set(
        &mut self,
        date: usize,
        sample: usize,
        value: f64,
        data_type: AggregationScenarioDataType,
        qualifier: &str,
    ) -> Result<(), AggregationDataError> {
        let i = self.offset(date, sample)?;
        let size = self.dim_dates * self.dim_samples;
        self.data
            .entry((data_type, qualifier.to_string()))
            .or_insert_with(|| vec![f64::NAN; size])[i] = value;
        Ok(())
    }

    fn get(
        &self,
        date: usize,
        sample: usize,
        data_type: AggregationScenarioDataType,
        qualifier: &str,
    ) -> Option<f64> {
        let i = self.offset(date, sample).ok()?;
        self.data
            .get(&(data_type, qualifier.to_string()))
            .map(|values| values[i])
    }

    fn keys(&self) -> Vec<(AggregationScenarioDataType, String)> {
        self.data.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut asd = InMemoryAggregationScenarioData::new(2, 3);
        asd.set(1, 2, 0.97, AggregationScenarioDataType::Numeraire, "")
            .unwrap();
        asd.set(0, 0, 1.1, AggregationScenarioDataType::FxSpot, "USD")
            .unwrap();
        assert_eq!(asd.get(1, 2, AggregationScenarioDataType::Numeraire, ""), Some(0.97));
        assert_eq!(asd.get(0, 0, AggregationScenarioDataType::FxSpot, "USD"), Some(1.1));
        assert_eq!(asd.get(0, 0, AggregationScenarioDataType::FxSpot, "GBP"), None);
        assert!(asd
            .get(0, 1, AggregationScenarioDataType::FxSpot, "USD")
            .unwrap()
            .is_nan());
        assert_eq!(asd.keys().len(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut asd = InMemoryAggregationScenarioData::new(1, 1);
        assert_eq!(
            asd.set(0, 1, 1.0, AggregationScenarioDataType::Numeraire, ""),
            Err(AggregationDataError::OutOfRange {
                dimension: "sample",
                index: 1,
                size: 1
            })
        );
        assert_eq!(asd.get(5, 0, AggregationScenarioDataType::Numeraire, ""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(AggregationScenarioDataType::IndexFixing.to_string(), "IndexFixing");
    }
}
