//! NPV cubes.
//!
//! An NPV cube stores simulated trade values indexed by
//! `(id, date, sample, depth)`, plus a time-zero slice indexed by
//! `(id, depth)`. Depth 0 holds valuation-date values; depth 1 holds
//! close-out values when a margin period of risk is simulated.
//!
//! - [`InMemoryCube`]: dense storage in double or single precision
//! - [`JointNpvCube`]: several cubes presented under one id space

mod in_memory;
mod joint;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

pub use in_memory::{DoublePrecisionInMemoryCube, InMemoryCube, SinglePrecisionInMemoryCube};
pub use joint::JointNpvCube;

/// Cube access errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CubeError {
    /// An index is outside its dimension.
    #[error("{dimension} index {index} out of range (size {size})")]
    OutOfRange {
        /// Dimension name
        dimension: &'static str,
        /// Requested index
        index: usize,
        /// Dimension size
        size: usize,
    },

    /// The id is not a row of the cube.
    #[error("id '{0}' not found in cube")]
    UnknownId(String),

    /// An id occurs in more than one input cube where uniqueness is required.
    #[error("duplicate id '{0}' in joint cube input")]
    DuplicateId(String),

    /// A write would have to go to more than one underlying cube.
    #[error("id '{0}' is backed by {1} cubes, cannot set a single value")]
    AmbiguousWrite(String, usize),

    /// Input cubes disagree on a dimension.
    #[error("cube dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The operation is not implemented by this cube.
    #[error("{0} is not supported by this cube")]
    Unsupported(&'static str),

    /// The value cannot be represented in the cube precision.
    #[error("value {0} cannot be stored in cube precision")]
    Unrepresentable(f64),
}

/// Storage for simulated trade values.
pub trait NpvCube: Send {
    /// Number of ids (trades).
    fn num_ids(&self) -> usize;

    /// Number of simulation dates.
    fn num_dates(&self) -> usize;

    /// Number of samples.
    fn samples(&self) -> usize;

    /// Number of values stored per cell.
    fn depth(&self) -> usize;

    /// Id to row index map.
    fn ids_and_indexes(&self) -> &BTreeMap<String, usize>;

    /// Simulation dates.
    fn dates(&self) -> &[NaiveDate];

    /// Valuation date of the time-zero slice.
    fn asof(&self) -> NaiveDate;

    /// Time-zero value by row index.
    fn get_t0(&self, id: usize, depth: usize) -> Result<f64, CubeError>;

    /// Sets a time-zero value by row index.
    fn set_t0(&mut self, value: f64, id: usize, depth: usize) -> Result<(), CubeError>;

    /// Value by row, date, sample and depth index.
    fn get(&self, id: usize, date: usize, sample: usize, depth: usize) -> Result<f64, CubeError>;

    /// Sets a value by row, date, sample and depth index.
    fn set(
        &mut self,
        value: f64,
        id: usize,
        date: usize,
        sample: usize,
        depth: usize,
    ) -> Result<(), CubeError>;

    /// Row index of `id`.
    fn index_of(&self, id: &str) -> Result<usize, CubeError> {
        self.ids_and_indexes()
            .get(id)
            .copied()
            .ok_or_else(|| CubeError::UnknownId(id.to_string()))
    }

    /// Ids ordered by row index.
    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<(&String, &usize)> = self.ids_and_indexes().iter().collect();
        ids.sort_by_key(|entry| *entry.1);
        ids.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Loads cube contents from a file.
    fn load(&mut self, _path: &Path) -> Result<(), CubeError> {
        Err(CubeError::Unsupported("load"))
    }

    /// Saves cube contents to a file.
    fn save(&self, _path: &Path) -> Result<(), CubeError> {
        Err(CubeError::Unsupported("save"))
    }
}

pub(crate) fn check_index(dimension: &'static str, index: usize, size: usize) -> Result<(), CubeError> {
    if index < size {
        Ok(())
    } else {
        Err(CubeError::OutOfRange {
            dimension,
            index,
            size,
        })
    }
}
