//! Simulation date grid.
//!
//! A grid holds the simulation dates after the as-of date, each tagged as a
//! valuation date, a close-out date or both. Without a close-out lag every
//! date is a valuation date. Adding a lag inserts `d + lag` for every
//! valuation date `d` and merges the two sets.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pricer_core::types::{DayCountConvention, Tenor, TenorError};
use pricer_models::paths::TimeGrid;
use pricer_models::ModelError;
use thiserror::Error;

/// Grid construction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// No valuation dates were given.
    #[error("date grid has no valuation dates")]
    Empty,

    /// A date is on or before the as-of date.
    #[error("grid date {date} is not after as-of date {asof}")]
    NotAfterAsof {
        /// Offending date
        date: NaiveDate,
        /// As-of date
        asof: NaiveDate,
    },

    /// Dates are not strictly increasing.
    #[error("grid dates must be strictly increasing ({previous} followed by {next})")]
    NotIncreasing {
        /// Earlier date in input order
        previous: NaiveDate,
        /// Later date in input order
        next: NaiveDate,
    },

    /// The textual grid specification is malformed.
    #[error("invalid grid specification '{0}': expected '<count>,<tenor>'")]
    InvalidSpec(String),

    /// A close-out lag was added twice.
    #[error("grid already has a close-out lag")]
    LagAlreadySet,

    /// Sticky-date simulation needs one close-out date per valuation date.
    #[error("sticky date mode needs as many close-out dates ({close_out}) as valuation dates ({valuation})")]
    StickyDateMismatch {
        /// Number of valuation dates
        valuation: usize,
        /// Number of close-out dates
        close_out: usize,
    },

    /// Tenor arithmetic failed.
    #[error(transparent)]
    Tenor(#[from] TenorError),

    /// Dates map to an invalid model time grid.
    #[error(transparent)]
    Time(#[from] ModelError),
}

/// Ordered simulation dates with valuation and close-out flags.
#[derive(Debug, Clone, PartialEq)]
pub struct DateGrid {
    asof: NaiveDate,
    day_counter: DayCountConvention,
    dates: Vec<NaiveDate>,
    is_valuation_date: Vec<bool>,
    is_close_out_date: Vec<bool>,
    close_out_lag: Option<Tenor>,
    time_grid: TimeGrid,
    valuation_time_grid: TimeGrid,
    close_out_time_grid: TimeGrid,
}

impl DateGrid {
    /// Grid whose dates are all valuation dates.
    pub fn new(
        asof: NaiveDate,
        valuation_dates: Vec<NaiveDate>,
        day_counter: DayCountConvention,
    ) -> Result<Self, GridError> {
        if valuation_dates.is_empty() {
            return Err(GridError::Empty);
        }
        for w in valuation_dates.windows(2) {
            if w[1] <= w[0] {
                return Err(GridError::NotIncreasing {
                    previous: w[0],
                    next: w[1],
                });
            }
        }
        if valuation_dates[0] <= asof {
            return Err(GridError::NotAfterAsof {
                date: valuation_dates[0],
                asof,
            });
        }
        let n = valuation_dates.len();
        Self::build(asof, day_counter, valuation_dates, vec![true; n], vec![false; n], None)
    }

    /// Grid from a specification such as `"10,1Y"` or `"12,3M"`: `count`
    /// dates spaced by `tenor` from the as-of date.
    pub fn from_spec(
        asof: NaiveDate,
        spec: &str,
        day_counter: DayCountConvention,
    ) -> Result<Self, GridError> {
        let invalid = || GridError::InvalidSpec(spec.to_string());
        let (count, tenor) = spec.split_once(',').ok_or_else(invalid)?;
        let count: u32 = count.trim().parse().map_err(|_| invalid())?;
        let tenor: Tenor = tenor.parse()?;
        if tenor.length() == 0 {
            return Err(invalid());
        }
        let dates = (1..=count)
            .map(|i| {
                let length = i.checked_mul(tenor.length()).ok_or_else(invalid)?;
                Ok(Tenor::new(length, tenor.unit()).advance(asof)?)
            })
            .collect::<Result<Vec<_>, GridError>>()?;
        Self::new(asof, dates, day_counter)
    }

    /// Copy of this grid with a close-out date `d + lag` for every
    /// valuation date `d`.
    pub fn with_close_out_lag(&self, lag: Tenor) -> Result<Self, GridError> {
        if self.close_out_lag.is_some() {
            return Err(GridError::LagAlreadySet);
        }
        let mut flags: BTreeMap<NaiveDate, (bool, bool)> = BTreeMap::new();
        for d in self.valuation_dates() {
            flags.entry(d).or_default().0 = true;
            flags.entry(lag.advance(d)?).or_default().1 = true;
        }
        let dates = flags.keys().copied().collect();
        let is_valuation_date = flags.values().map(|f| f.0).collect();
        let is_close_out_date = flags.values().map(|f| f.1).collect();
        Self::build(
            self.asof,
            self.day_counter,
            dates,
            is_valuation_date,
            is_close_out_date,
            Some(lag),
        )
    }

    fn build(
        asof: NaiveDate,
        day_counter: DayCountConvention,
        dates: Vec<NaiveDate>,
        is_valuation_date: Vec<bool>,
        is_close_out_date: Vec<bool>,
        close_out_lag: Option<Tenor>,
    ) -> Result<Self, GridError> {
        let time = |d: &NaiveDate| day_counter.year_fraction(asof, *d);
        let times: Vec<f64> = dates.iter().map(time).collect();
        let select = |flags: &[bool]| -> Vec<f64> {
            times
                .iter()
                .zip(flags)
                .filter(|(_, f)| **f)
                .map(|(t, _)| *t)
                .collect()
        };
        let time_grid = TimeGrid::from_positive_times(&times)?;
        let valuation_time_grid = TimeGrid::from_positive_times(&select(&is_valuation_date))?;
        let close_out_time_grid = TimeGrid::from_positive_times(&select(&is_close_out_date))?;

        Ok(Self {
            asof,
            day_counter,
            dates,
            is_valuation_date,
            is_close_out_date,
            close_out_lag,
            time_grid,
            valuation_time_grid,
            close_out_time_grid,
        })
    }

    /// As-of date.
    pub fn asof(&self) -> NaiveDate {
        self.asof
    }

    /// Day counter mapping dates to times.
    pub fn day_counter(&self) -> DayCountConvention {
        self.day_counter
    }

    /// All simulation dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of simulation dates.
    pub fn size(&self) -> usize {
        self.dates.len()
    }

    /// Valuation flag per simulation date.
    pub fn is_valuation_date(&self) -> &[bool] {
        &self.is_valuation_date
    }

    /// Close-out flag per simulation date.
    pub fn is_close_out_date(&self) -> &[bool] {
        &self.is_close_out_date
    }

    /// Close-out lag, if any.
    pub fn close_out_lag(&self) -> Option<Tenor> {
        self.close_out_lag
    }

    /// Valuation dates in order.
    pub fn valuation_dates(&self) -> Vec<NaiveDate> {
        self.flagged(&self.is_valuation_date)
    }

    /// Close-out dates in order.
    pub fn close_out_dates(&self) -> Vec<NaiveDate> {
        self.flagged(&self.is_close_out_date)
    }

    /// Model times of all simulation dates, with `t_0 = 0` first.
    pub fn time_grid(&self) -> &TimeGrid {
        &self.time_grid
    }

    /// `t_0` followed by the valuation date times.
    pub fn valuation_time_grid(&self) -> &TimeGrid {
        &self.valuation_time_grid
    }

    /// `t_0` followed by the close-out date times.
    pub fn close_out_time_grid(&self) -> &TimeGrid {
        &self.close_out_time_grid
    }

    fn flagged(&self, flags: &[bool]) -> Vec<NaiveDate> {
        self.dates
            .iter()
            .zip(flags)
            .filter(|(_, f)| **f)
            .map(|(d, _)| *d)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricer_core::types::TenorUnit;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const DC: DayCountConvention = DayCountConvention::ActualActual365;

    #[test]
    fn test_new_all_valuation() {
        let g = DateGrid::new(ymd(2024, 1, 1), vec![ymd(2024, 7, 1), ymd(2025, 1, 1)], DC).unwrap();
        assert_eq!(g.size(), 2);
        assert_eq!(g.is_valuation_date(), &[true, true]);
        assert_eq!(g.is_close_out_date(), &[false, false]);
        assert_eq!(g.time_grid().len(), 3);
        assert_eq!(g.valuation_time_grid(), g.time_grid());
        assert_eq!(g.close_out_time_grid().len(), 1);
    }

    #[test]
    fn test_new_validation() {
        let asof = ymd(2024, 1, 1);
        assert_eq!(DateGrid::new(asof, vec![], DC), Err(GridError::Empty));
        assert!(matches!(
            DateGrid::new(asof, vec![asof], DC),
            Err(GridError::NotAfterAsof { .. })
        ));
        assert!(matches!(
            DateGrid::new(asof, vec![ymd(2025, 1, 1), ymd(2024, 6, 1)], DC),
            Err(GridError::NotIncreasing { .. })
        ));
    }

    #[test]
    fn test_from_spec() {
        let g = DateGrid::from_spec(ymd(2024, 1, 31), "3,1M", DC).unwrap();
        assert_eq!(
            g.dates(),
            &[ymd(2024, 2, 29), ymd(2024, 3, 31), ymd(2024, 4, 30)]
        );
        assert!(DateGrid::from_spec(ymd(2024, 1, 1), "3;1M", DC).is_err());
        assert!(DateGrid::from_spec(ymd(2024, 1, 1), "x,1M", DC).is_err());
        assert!(DateGrid::from_spec(ymd(2024, 1, 1), "3,0M", DC).is_err());
    }

    #[test]
    fn test_close_out_lag_interleaves() {
        let g = DateGrid::from_spec(ymd(2024, 1, 1), "2,1M", DC)
            .unwrap()
            .with_close_out_lag(Tenor::new(2, TenorUnit::Weeks))
            .unwrap();
        assert_eq!(
            g.dates(),
            &[ymd(2024, 2, 1), ymd(2024, 2, 15), ymd(2024, 3, 1), ymd(2024, 3, 15)]
        );
        assert_eq!(g.is_valuation_date(), &[true, false, true, false]);
        assert_eq!(g.is_close_out_date(), &[false, true, false, true]);
        assert_eq!(g.valuation_dates(), vec![ymd(2024, 2, 1), ymd(2024, 3, 1)]);
        assert_eq!(g.close_out_dates(), vec![ymd(2024, 2, 15), ymd(2024, 3, 15)]);
        assert_eq!(g.valuation_time_grid().len(), 3);
        assert_eq!(g.close_out_time_grid().len(), 3);
        assert_eq!(g.close_out_lag(), Some(Tenor::new(2, TenorUnit::Weeks)));
    }

    #[test]
    fn test_close_out_coinciding_with_valuation() {
        let g = DateGrid::from_spec(ymd(2024, 1, 1), "2,1M", DC)
            .unwrap()
            .with_close_out_lag(Tenor::new(1, TenorUnit::Months))
            .unwrap();
        assert_eq!(g.dates(), &[ymd(2024, 2, 1), ymd(2024, 3, 1), ymd(2024, 4, 1)]);
        assert_eq!(g.is_valuation_date(), &[true, true, false]);
        assert_eq!(g.is_close_out_date(), &[false, true, true]);
    }

    #[test]
    fn test_lag_cannot_be_added_twice() {
        let g = DateGrid::from_spec(ymd(2024, 1, 1), "1,1Y", DC)
            .unwrap()
            .with_close_out_lag(Tenor::new(10, TenorUnit::Days))
            .unwrap();
        assert_eq!(
            g.with_close_out_lag(Tenor::new(10, TenorUnit::Days)),
            Err(GridError::LagAlreadySet)
        );
    }
}
