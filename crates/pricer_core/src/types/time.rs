//! Time types: day count conventions and tenors.
//!
//! Simulation grids are expressed in dates and converted to model time with a
//! [`DayCountConvention`]. The same convention must be used by the grid and
//! the model so that a grid time and a model time refer to the same instant.
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use pricer_core::types::time::{DayCountConvention, Tenor};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = "6M".parse::<Tenor>().unwrap().advance(start).unwrap();
//! assert_eq!(end, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
//!
//! let yf = DayCountConvention::ActualActual365.year_fraction(start, end);
//! assert!((yf - 182.0 / 365.0).abs() < 1e-12);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::{DayCountError, TenorError};

/// Day count convention for converting date differences into year fractions.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DayCountConvention {
    /// Actual/365 Fixed: actual_days / 365.0
    #[default]
    ActualActual365,

    /// Actual/360: actual_days / 360.0
    ActualActual360,

    /// 30/360 US Bond Basis
    Thirty360,
}

impl DayCountConvention {
    /// Returns the standard convention name.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::types::time::DayCountConvention;
    ///
    /// assert_eq!(DayCountConvention::ActualActual365.name(), "ACT/365");
    /// assert_eq!(DayCountConvention::Thirty360.name(), "30/360");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            DayCountConvention::ActualActual365 => "ACT/365",
            DayCountConvention::ActualActual360 => "ACT/360",
            DayCountConvention::Thirty360 => "30/360",
        }
    }

    /// Year fraction between two dates.
    ///
    /// Negative when `end` precedes `start`.
    pub fn year_fraction(&self, start: NaiveDate, end: NaiveDate) -> f64 {
        match self {
            DayCountConvention::ActualActual365 => (end - start).num_days() as f64 / 365.0,
            DayCountConvention::ActualActual360 => (end - start).num_days() as f64 / 360.0,
            DayCountConvention::Thirty360 => {
                let (a, b, sign) = if start <= end {
                    (start, end, 1.0)
                } else {
                    (end, start, -1.0)
                };
                let d1 = if a.day() == 31 { 30 } else { a.day() };
                let d2 = if b.day() == 31 && d1 == 30 { 30 } else { b.day() };
                let days = 360 * (b.year() - a.year())
                    + 30 * (b.month() as i32 - a.month() as i32)
                    + (d2 as i32 - d1 as i32);
                sign * days as f64 / 360.0
            }
        }
    }
}

impl FromStr for DayCountConvention {
    type Err = DayCountError;

    /// Accepts "ACT/365", "A365", "Actual/360", "30/360" and similar aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(['/', ' '], "").as_str() {
            "ACT365" | "ACTUAL365" | "A365" | "ACT365F" | "ACTUAL365FIXED" => {
                Ok(DayCountConvention::ActualActual365)
            }
            "ACT360" | "ACTUAL360" | "A360" => Ok(DayCountConvention::ActualActual360),
            "30360" | "THIRTY360" => Ok(DayCountConvention::Thirty360),
            _ => Err(DayCountError::UnknownConvention(s.to_string())),
        }
    }
}

impl TryFrom<String> for DayCountConvention {
    type Error = DayCountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayCountConvention> for String {
    fn from(value: DayCountConvention) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unit of a [`Tenor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenorUnit {
    /// Calendar days
    Days,
    /// Weeks of seven calendar days
    Weeks,
    /// Calendar months
    Months,
    /// Calendar years
    Years,
}

impl TenorUnit {
    fn symbol(&self) -> char {
        match self {
            TenorUnit::Days => 'D',
            TenorUnit::Weeks => 'W',
            TenorUnit::Months => 'M',
            TenorUnit::Years => 'Y',
        }
    }
}

/// A period such as `2W`, `3M` or `10Y`.
///
/// Used for grid spacing, close-out lags and index tenors. Date arithmetic is
/// unadjusted: no calendar or business day rolling is applied.
///
/// # Examples
///
/// ```
/// use pricer_core::types::time::{Tenor, TenorUnit};
///
/// let t: Tenor = "2w".parse().unwrap();
/// assert_eq!(t, Tenor::new(2, TenorUnit::Weeks));
/// assert_eq!(t.to_string(), "2W");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tenor {
    length: u32,
    unit: TenorUnit,
}

impl Tenor {
    /// Creates a tenor from a length and unit.
    pub fn new(length: u32, unit: TenorUnit) -> Self {
        Self { length, unit }
    }

    /// Number of units.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Unit of the tenor.
    pub fn unit(&self) -> TenorUnit {
        self.unit
    }

    /// Returns `date` moved forward by this tenor.
    ///
    /// Month arithmetic clamps to the end of the target month
    /// (31 Jan + 1M = 29 Feb in a leap year).
    pub fn advance(&self, date: NaiveDate) -> Result<NaiveDate, TenorError> {
        let moved = match self.unit {
            TenorUnit::Days => date.checked_add_days(Days::new(u64::from(self.length))),
            TenorUnit::Weeks => date.checked_add_days(Days::new(7 * u64::from(self.length))),
            TenorUnit::Months => date.checked_add_months(Months::new(self.length)),
            TenorUnit::Years => self
                .length
                .checked_mul(12)
                .and_then(|m| date.checked_add_months(Months::new(m))),
        };
        moved.ok_or_else(|| TenorError::DateOverflow {
            tenor: self.to_string(),
            date: date.to_string(),
        })
    }

    /// Approximate length in years (D/365, W·7/365, M/12, Y).
    pub fn year_fraction(&self) -> f64 {
        let n = f64::from(self.length);
        match self.unit {
            TenorUnit::Days => n / 365.0,
            TenorUnit::Weeks => 7.0 * n / 365.0,
            TenorUnit::Months => n / 12.0,
            TenorUnit::Years => n,
        }
    }
}

impl FromStr for Tenor {
    type Err = TenorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || TenorError::InvalidFormat(s.to_string());

        let unit_char = trimmed.chars().last().ok_or_else(invalid)?;
        let unit = match unit_char.to_ascii_uppercase() {
            'D' => TenorUnit::Days,
            'W' => TenorUnit::Weeks,
            'M' => TenorUnit::Months,
            'Y' => TenorUnit::Years,
            _ => return Err(invalid()),
        };
        let digits = &trimmed[..trimmed.len() - unit_char.len_utf8()];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let length = digits.parse::<u32>().map_err(|_| invalid())?;
        Ok(Tenor::new(length, unit))
    }
}

impl TryFrom<String> for Tenor {
    type Error = TenorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Tenor> for String {
    fn from(value: Tenor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.length, self.unit.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========================================
    // DayCountConvention
    // ========================================

    #[test]
    fn test_act365_year_fraction() {
        let yf = DayCountConvention::ActualActual365.year_fraction(ymd(2024, 1, 1), ymd(2025, 1, 1));
        assert_relative_eq!(yf, 366.0 / 365.0, epsilon = 1e-14);
    }

    #[test]
    fn test_act360_negative_direction() {
        let yf = DayCountConvention::ActualActual360.year_fraction(ymd(2024, 7, 1), ymd(2024, 1, 1));
        assert_relative_eq!(yf, -182.0 / 360.0, epsilon = 1e-14);
    }

    #[test]
    fn test_thirty360_month_end() {
        let yf = DayCountConvention::Thirty360.year_fraction(ymd(2024, 1, 31), ymd(2024, 3, 31));
        assert_relative_eq!(yf, 60.0 / 360.0, epsilon = 1e-14);
    }

    #[test]
    fn test_day_count_parse_aliases() {
        assert_eq!(
            "A365".parse::<DayCountConvention>().unwrap(),
            DayCountConvention::ActualActual365
        );
        assert_eq!(
            "Actual/360".parse::<DayCountConvention>().unwrap(),
            DayCountConvention::ActualActual360
        );
        assert!("ACT/999".parse::<DayCountConvention>().is_err());
    }

    #[test]
    fn test_day_count_serde_as_name() {
        let json = serde_json::to_string(&DayCountConvention::Thirty360).unwrap();
        assert_eq!(json, "\"30/360\"");
        let back: DayCountConvention = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DayCountConvention::Thirty360);
    }

    // ========================================
    // Tenor
    // ========================================

    #[test]
    fn test_tenor_parse() {
        assert_eq!("3M".parse::<Tenor>().unwrap(), Tenor::new(3, TenorUnit::Months));
        assert_eq!("10y".parse::<Tenor>().unwrap(), Tenor::new(10, TenorUnit::Years));
        assert_eq!(" 14D ".parse::<Tenor>().unwrap(), Tenor::new(14, TenorUnit::Days));
    }

    #[test]
    fn test_tenor_parse_invalid() {
        for bad in ["", "M", "3X", "-1M", "1.5Y", "M3"] {
            assert!(bad.parse::<Tenor>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_tenor_advance_clamps_month_end() {
        let t = Tenor::new(1, TenorUnit::Months);
        assert_eq!(t.advance(ymd(2024, 1, 31)).unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_tenor_advance_weeks_and_years() {
        assert_eq!(
            Tenor::new(2, TenorUnit::Weeks).advance(ymd(2024, 1, 1)).unwrap(),
            ymd(2024, 1, 15)
        );
        assert_eq!(
            Tenor::new(1, TenorUnit::Years).advance(ymd(2024, 2, 29)).unwrap(),
            ymd(2025, 2, 28)
        );
    }

    #[test]
    fn test_tenor_year_fraction() {
        assert_relative_eq!(Tenor::new(6, TenorUnit::Months).year_fraction(), 0.5);
        assert_relative_eq!(Tenor::new(2, TenorUnit::Years).year_fraction(), 2.0);
    }

    #[test]
    fn test_tenor_serde_as_string() {
        let json = serde_json::to_string(&Tenor::new(2, TenorUnit::Weeks)).unwrap();
        assert_eq!(json, "\"2W\"");
        let back: Tenor = serde_json::from_str("\"6M\"").unwrap();
        assert_eq!(back, Tenor::new(6, TenorUnit::Months));
    }

    proptest! {
        #[test]
        fn prop_tenor_display_parse_roundtrip(n in 0u32..500, u in 0usize..4) {
            let unit = [TenorUnit::Days, TenorUnit::Weeks, TenorUnit::Months, TenorUnit::Years][u];
            let t = Tenor::new(n, unit);
            prop_assert_eq!(t.to_string().parse::<Tenor>().unwrap(), t);
        }

        #[test]
        fn prop_advance_is_monotone(n in 1u32..120, offset in 0i64..3000) {
            let start = ymd(2020, 1, 1) + chrono::Duration::days(offset);
            let end = Tenor::new(n, TenorUnit::Months).advance(start).unwrap();
            prop_assert!(end > start);
        }
    }
}
