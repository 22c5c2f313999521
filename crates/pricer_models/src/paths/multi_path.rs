//! Joint multi-factor path.

use std::ops::{Index, IndexMut};

use super::grid::TimeGrid;

/// One realisation of the model state on a time grid, indexed `[asset][time]`.
///
/// ```
/// use pricer_models::paths::{MultiPath, TimeGrid};
///
/// let mut path = MultiPath::new(2, TimeGrid::new(vec![0.0, 1.0]).unwrap());
/// path[1][1] = 0.5;
/// assert_eq!(path.asset_number(), 2);
/// assert_eq!(path.path_size(), 2);
/// assert_eq!(path[1][1], 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPath {
    values: Vec<Vec<f64>>,
    time_grid: TimeGrid,
}

impl MultiPath {
    /// Zero-initialised path for `asset_number` state components.
    pub fn new(asset_number: usize, time_grid: TimeGrid) -> Self {
        Self {
            values: vec![vec![0.0; time_grid.len()]; asset_number],
            time_grid,
        }
    }

    /// Number of state components.
    #[inline]
    pub fn asset_number(&self) -> usize {
        self.values.len()
    }

    /// Number of time points including `t_0`.
    #[inline]
    pub fn path_size(&self) -> usize {
        self.time_grid.len()
    }

    /// Time of grid point `k`.
    #[inline]
    pub fn time(&self, k: usize) -> f64 {
        self.time_grid[k]
    }

    /// Underlying time grid.
    pub fn time_grid(&self) -> &TimeGrid {
        &self.time_grid
    }
}

impl Index<usize> for MultiPath {
    type Output = [f64];

    fn index(&self, asset: usize) -> &[f64] {
        &self.values[asset]
    }
}

impl IndexMut<usize> for MultiPath {
    fn index_mut(&mut self, asset: usize) -> &mut [f64] {
        &mut self.values[asset]
    }
}
