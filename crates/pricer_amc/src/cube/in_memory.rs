//! Dense in-memory cube.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use num_traits::{Float, NumCast};

use super::{check_index, CubeError, NpvCube};

/// Dense cube storing values in precision `T`.
///
/// Ids are assigned row indices in sorted order. All cells start at zero.
///
/// ```
/// use std::collections::BTreeSet;
/// use chrono::NaiveDate;
/// use pricer_amc::cube::{DoublePrecisionInMemoryCube, NpvCube};
///
/// let asof = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
/// let ids: BTreeSet<String> = ["B", "A"].iter().map(|s| s.to_string()).collect();
/// let dates = vec![NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()];
/// let mut cube = DoublePrecisionInMemoryCube::new(asof, &ids, dates, 3, 1);
///
/// assert_eq!(cube.index_of("A").unwrap(), 0);
/// cube.set(1.5, 1, 0, 2, 0).unwrap();
/// assert_eq!(cube.get(1, 0, 2, 0).unwrap(), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryCube<T> {
    asof: NaiveDate,
    ids: BTreeMap<String, usize>,
    dates: Vec<NaiveDate>,
    samples: usize,
    depth: usize,
    t0: Vec<T>,
    data: Vec<T>,
}

/// Cube storing `f64` values.
pub type DoublePrecisionInMemoryCube = InMemoryCube<f64>;

/// Cube storing `f32` values.
pub type SinglePrecisionInMemoryCube = InMemoryCube<f32>;

impl<T: Float> InMemoryCube<T> {
    /// Allocates a zero-filled cube.
    pub fn new(
        asof: NaiveDate,
        ids: &BTreeSet<String>,
        dates: Vec<NaiveDate>,
        samples: usize,
        depth: usize,
    ) -> Self {
        let ids: BTreeMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let n = ids.len();
        Self {
            asof,
            t0: vec![T::zero(); n * depth],
            data: vec![T::zero(); n * dates.len() * samples * depth],
            ids,
            dates,
            samples,
            depth,
        }
    }

    fn offset(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<usize, CubeError> {
        check_index("id", id, self.ids.len())?;
        check_index("date", date, self.dates.len())?;
        check_index("sample", sample, self.samples)?;
        check_index("depth", depth, self.depth)?;
        Ok(((id * self.dates.len() + date) * self.samples + sample) * self.depth + depth)
    }

    fn t0_offset(&self, id: usize, depth: usize) -> Result<usize, CubeError> {
        check_index("id", id, self.ids.len())?;
        check_index("depth", depth, self.depth)?;
        Ok(id * self.depth + depth)
    }

    fn convert(value: f64) -> Result<T, CubeError> {
        <T as NumCast>::from(value).ok_or(CubeError::Unrepresentable(value))
    }
}

impl<T: Float + Send> NpvCube for InMemoryCube<T> {
    fn num_ids(&self) -> usize {
        self.ids.len()
    }

    fn num_dates(&self) -> usize {
        self.dates.len()
    }

    fn samples(&self) -> usize {
        self.samples
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn ids_and_indexes(&self) -> &BTreeMap<String, usize> {
        &self.ids
    }

    fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn asof(&self) -> NaiveDate {
        self.asof
    }

    fn get_t0(&self, id: usize, depth: usize) -> Result<f64, CubeError> {
        let i = self.t0_offset(id, depth)?;
        Ok(self.t0[i].to_f64().unwrap_or(f64::NAN))
    }

    fn set_t0(&mut self, value: f64, id: usize, depth: usize) -> Result<(), CubeError> {
        let i = self.t0_offset(id, depth)?;
        self.t0[i] = Self::convert(value)?;
        Ok(())
    }

    fn get(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<f64, CubeError> {
        let i = self.offset(id, date, sample, depth)?;
        Ok(self.data[i].to_f64().unwrap_or(f64::NAN))
    }

    fn set(
        &mut self,
        value: f64,
        id: usize,
        date: usize,
        sample: usize,
        depth: usize,
    ) -> Result<(), CubeError> {
        let i = self.offset(id, date, sample, depth)?;
        self.data[i] = Self::convert(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2025 + i as i32, 1, 2).unwrap())
            .collect()
    }

    fn asof() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn test_dimensions() {
        let cube = DoublePrecisionInMemoryCube::new(asof(), &ids(&["a", "b"]), dates(3), 4, 2);
        assert_eq!(cube.num_ids(), 2);
        assert_eq!(cube.num_dates(), 3);
        assert_eq!(cube.samples(), 4);
        assert_eq!(cube.depth(), 2);
        assert_eq!(cube.asof(), asof());
        assert_eq!(cube.ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_cells_are_independent() {
        let mut cube = DoublePrecisionInMemoryCube::new(asof(), &ids(&["a", "b"]), dates(2), 3, 2);
        cube.set(1.0, 0, 1, 2, 1).unwrap();
        cube.set(2.0, 1, 0, 0, 0).unwrap();
        assert_eq!(cube.get(0, 1, 2, 1).unwrap(), 1.0);
        assert_eq!(cube.get(1, 0, 0, 0).unwrap(), 2.0);
        assert_eq!(cube.get(0, 1, 2, 0).unwrap(), 0.0);
        assert_eq!(cube.get(1, 1, 2, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_t0_slice() {
        let mut cube = DoublePrecisionInMemoryCube::new(asof(), &ids(&["a"]), dates(1), 1, 2);
        cube.set_t0(5.0, 0, 1).unwrap();
        assert_eq!(cube.get_t0(0, 1).unwrap(), 5.0);
        assert_eq!(cube.get_t0(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_out_of_range() {
        let mut cube = DoublePrecisionInMemoryCube::new(asof(), &ids(&["a"]), dates(1), 2, 1);
        assert_eq!(
            cube.get(0, 0, 2, 0),
            Err(CubeError::OutOfRange {
                dimension: "sample",
                index: 2,
                size: 2
            })
        );
        assert!(cube.set(1.0, 1, 0, 0, 0).is_err());
        assert!(cube.set_t0(1.0, 0, 1).is_err());
    }

    #[test]
    fn test_single_precision_rounds() {
        let mut cube = SinglePrecisionInMemoryCube::new(asof(), &ids(&["a"]), dates(1), 1, 1);
        cube.set(0.1, 0, 0, 0, 0).unwrap();
        let v = cube.get(0, 0, 0, 0).unwrap();
        assert_eq!(v, 0.1_f32 as f64);
        assert_relative_eq!(v, 0.1, epsilon = 1e-7);
    }

    #[test]
    fn test_unknown_id_and_io_unsupported() {
        let cube = DoublePrecisionInMemoryCube::new(asof(), &ids(&["a"]), dates(1), 1, 1);
        assert_eq!(cube.index_of("zz"), Err(CubeError::UnknownId("zz".to_string())));
        assert_eq!(
            cube.save(std::path::Path::new("cube.csv")),
            Err(CubeError::Unsupported("save"))
        );
    }
}
