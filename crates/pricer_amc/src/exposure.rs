//! Exposure statistics over NPV cubes.
//!
//! Cube values are deflated by the base currency numeraire. Undeflate them
//! with the recorded numeraires ([`ExposureCalculator::undeflate`]) before
//! computing exposures in currency units.
//!
//! - Expected Exposure (EE), Expected Negative Exposure (ENE)
//! - Potential Future Exposure (PFE)
//! - Expected Positive Exposure (EPE) and Effective EPE
//! - Netting over a set of trades

use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;

use crate::cube::{CubeError, NpvCube};
use crate::scenario::{AggregationScenarioData, AggregationScenarioDataType};

/// Errors raised while computing exposures.
#[derive(Error, Debug)]
pub enum ExposureError {
    /// Cube access failed.
    #[error(transparent)]
    Cube(#[from] CubeError),

    /// No trades were given.
    #[error("no trade ids given")]
    NoTrades,

    /// A numeraire was not recorded for a date and sample.
    #[error("numeraire missing for date index {date}, sample {sample}")]
    MissingNumeraire {
        /// Date index
        date: usize,
        /// Sample index
        sample: usize,
    },

    /// Times do not line up with the cube dates.
    #[error("{times} times given for {dates} cube dates")]
    TimeMismatch {
        /// Times given
        times: usize,
        /// Cube dates
        dates: usize,
    },
}

/// Exposure profile of one trade or netting set.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureProfile {
    /// Cube dates
    pub dates: Vec<NaiveDate>,
    /// Year fractions of the dates
    pub times: Vec<f64>,
    /// Expected exposure per date
    pub ee: Vec<f64>,
    /// Expected negative exposure per date
    pub ene: Vec<f64>,
    /// PFE per date at `confidence`
    pub pfe: Vec<f64>,
    /// PFE confidence level
    pub confidence: f64,
    /// Time-averaged EE
    pub epe: f64,
    /// Time-averaged non-decreasing EE up to one year
    pub effective_epe: f64,
    /// Largest PFE
    pub peak_pfe: f64,
}

/// Exposure calculation utilities.
pub struct ExposureCalculator;

impl ExposureCalculator {
    /// Sum of the values of `ids` as `[sample][date]` at `depth`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use pricer_amc::cube::{InMemoryCube, NpvCube};
    /// use pricer_amc::exposure::ExposureCalculator;
    ///
    /// let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    /// let dates = vec![NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()];
    /// let ids = ["A".to_string(), "B".to_string()].into_iter().collect();
    /// let mut cube = InMemoryCube::<f64>::new(asof, &ids, dates, 2, 1);
    /// cube.set(10.0, 0, 0, 0, 0).unwrap();
    /// cube.set(-4.0, 1, 0, 0, 0).unwrap();
    ///
    /// let values = ExposureCalculator::netted_values(&cube, &["A", "B"], 0).unwrap();
    /// assert_eq!(values, vec![vec![6.0], vec![0.0]]);
    /// ```
    pub fn netted_values(
        cube: &dyn NpvCube,
        ids: &[&str],
        depth: usize,
    ) -> Result<Vec<Vec<f64>>, ExposureError> {
        if ids.is_empty() {
            return Err(ExposureError::NoTrades);
        }
        let rows = ids
            .iter()
            .map(|id| cube.index_of(id))
            .collect::<Result<Vec<_>, _>>()?;
        let mut values = vec![vec![0.0; cube.num_dates()]; cube.samples()];
        for (sample, row_values) in values.iter_mut().enumerate() {
            for (date, value) in row_values.iter_mut().enumerate() {
                for &row in &rows {
                    *value += cube.get(row, date, sample, depth)?;
                }
            }
        }
        Ok(values)
    }

    /// Multiplies `[sample][date]` values by the recorded base numeraire.
    pub fn undeflate(
        values: &mut [Vec<f64>],
        asd: &dyn AggregationScenarioData,
    ) -> Result<(), ExposureError> {
        for (sample, row) in values.iter_mut().enumerate() {
            for (date, value) in row.iter_mut().enumerate() {
                let numeraire = asd
                    .get(date, sample, AggregationScenarioDataType::Numeraire, "")
                    .filter(|n| n.is_finite())
                    .ok_or(ExposureError::MissingNumeraire { date, sample })?;
                *value *= numeraire;
            }
        }
        Ok(())
    }

    /// Expected Exposure per date, `EE(t) = E[max(V(t), 0)]`.
    ///
    /// `values` is `[sample][date]`.
    pub fn expected_exposure(values: &[Vec<f64>]) -> Vec<f64> {
        Self::mean_per_date(values, |v| v.max(0.0))
    }

    /// Expected Negative Exposure per date, `ENE(t) = E[max(-V(t), 0)]`.
    pub fn expected_negative_exposure(values: &[Vec<f64>]) -> Vec<f64> {
        Self::mean_per_date(values, |v| (-v).max(0.0))
    }

    fn mean_per_date(values: &[Vec<f64>], f: impl Fn(f64) -> f64 + Sync) -> Vec<f64> {
        let Some(first) = values.first() else {
            return Vec::new();
        };
        let n = values.len() as f64;
        (0..first.len())
            .into_par_iter()
            .map(|t| values.iter().map(|path| f(path[t])).sum::<f64>() / n)
            .collect()
    }

    /// Potential Future Exposure per date at `confidence`, the
    /// nearest-rank quantile of `max(V(t), 0)`.
    pub fn potential_future_exposure(values: &[Vec<f64>], confidence: f64) -> Vec<f64> {
        let Some(first) = values.first() else {
            return Vec::new();
        };
        let n = values.len();
        let confidence = confidence.clamp(0.0, 1.0);
        let quantile_idx = (((n as f64 - 1.0) * confidence).round() as usize).min(n - 1);

        (0..first.len())
            .into_par_iter()
            .map(|t| {
                let mut exposures: Vec<f64> = values.iter().map(|path| path[t].max(0.0)).collect();
                exposures.sort_by(f64::total_cmp);
                exposures[quantile_idx]
            })
            .collect()
    }

    /// Largest PFE of a profile.
    #[inline]
    pub fn peak_pfe(pfe: &[f64]) -> f64 {
        pfe.iter().copied().fold(0.0_f64, f64::max)
    }

    /// Time-weighted average of `ee` by trapezoidal integration over `times`.
    pub fn expected_positive_exposure(ee: &[f64], times: &[f64]) -> f64 {
        match (times.first(), times.last()) {
            (Some(&first), Some(&last)) if times.len() >= 2 && ee.len() == times.len() && last > first => {
                let integral: f64 = times
                    .windows(2)
                    .zip(ee.windows(2))
                    .map(|(t, e)| 0.5 * (e[0] + e[1]) * (t[1] - t[0]))
                    .sum();
                integral / (last - first)
            }
            _ => ee.first().copied().unwrap_or(0.0),
        }
    }

    /// Effective EPE: time-weighted average of the running maximum of `ee`
    /// up to `horizon`.
    pub fn effective_epe(ee: &[f64], times: &[f64], horizon: f64) -> f64 {
        if times.is_empty() || ee.len() != times.len() {
            return 0.0;
        }
        let effective_ee: Vec<f64> = ee
            .iter()
            .scan(0.0_f64, |running, &v| {
                *running = running.max(v);
                Some(*running)
            })
            .collect();

        let mut integral = 0.0;
        let mut covered = 0.0;
        for i in 0..times.len() - 1 {
            let t0 = times[i];
            if t0 >= horizon {
                break;
            }
            let dt = times[i + 1].min(horizon) - t0;
            if dt > 0.0 {
                integral += 0.5 * (effective_ee[i] + effective_ee[i + 1]) * dt;
                covered += dt;
            }
        }
        if covered > 0.0 {
            integral / covered
        } else {
            effective_ee[0]
        }
    }

    /// Gross and net exposure of a set of trade values.
    ///
    /// ```
    /// use pricer_amc::exposure::ExposureCalculator;
    ///
    /// let (gross, net) = ExposureCalculator::netting_benefit(&[10.0, -5.0, 3.0]);
    /// assert_eq!(gross, 18.0);
    /// assert_eq!(net, 8.0);
    /// ```
    pub fn netting_benefit(trade_values: &[f64]) -> (f64, f64) {
        let gross: f64 = trade_values.iter().map(|v| v.abs()).sum();
        let net: f64 = trade_values.iter().sum::<f64>().max(0.0);
        (gross, net)
    }

    /// Exposure profile of the netted values of `ids` at `depth`.
    ///
    /// `times` are the year fractions of the cube dates. With `asd` the
    /// values are undeflated first.
    pub fn profile(
        cube: &dyn NpvCube,
        ids: &[&str],
        depth: usize,
        times: &[f64],
        confidence: f64,
        asd: Option<&dyn AggregationScenarioData>,
    ) -> Result<ExposureProfile, ExposureError> {
        if times.len() != cube.num_dates() {
            return Err(ExposureError::TimeMismatch {
                times: times.len(),
                dates: cube.num_dates(),
            });
        }
        let mut values = Self::netted_values(cube, ids, depth)?;
        if let Some(asd) = asd {
            Self::undeflate(&mut values, asd)?;
        }

        let ee = Self::expected_exposure(&values);
        let ene = Self::expected_negative_exposure(&values);
        let pfe = Self::potential_future_exposure(&values, confidence);
        let epe = Self::expected_positive_exposure(&ee, times);
        let effective_epe = Self::effective_epe(&ee, times, 1.0);
        let peak_pfe = Self::peak_pfe(&pfe);
        Ok(ExposureProfile {
            dates: cube.dates().to_vec(),
            times: times.to_vec(),
            ee,
            ene,
            pfe,
            confidence,
            epe,
            effective_epe,
            peak_pfe,
        })
    }
}
