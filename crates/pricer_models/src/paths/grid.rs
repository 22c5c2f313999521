//! Simulation time grid.

use std::ops::Index;

use crate::error::ModelError;

/// Strictly increasing model times starting at `t_0 = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Creates a grid; the first time must be zero and times must increase.
    pub fn new(times: Vec<f64>) -> Result<Self, ModelError> {
        match times.first() {
            None => return Err(ModelError::InvalidTimeGrid("empty time grid".to_string())),
            Some(&t0) if t0 != 0.0 => {
                return Err(ModelError::InvalidTimeGrid(format!(
                    "first time must be 0, got {t0}"
                )))
            }
            _ => {}
        }
        if let Some(w) = times.windows(2).find(|w| !(w[1] > w[0]) || !w[1].is_finite()) {
            return Err(ModelError::InvalidTimeGrid(format!(
                "times must be strictly increasing and finite ({} followed by {})",
                w[0], w[1]
            )));
        }
        Ok(Self { times })
    }

    /// Grid built from positive times, with `t_0 = 0` prepended.
    pub fn from_positive_times(times: &[f64]) -> Result<Self, ModelError> {
        let mut all = Vec::with_capacity(times.len() + 1);
        all.push(0.0);
        all.extend_from_slice(times);
        Self::new(all)
    }

    /// Number of grid points including `t_0`.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false; a grid holds at least `t_0`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// All times including `t_0`.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Step length `t_{i+1} - t_i`.
    #[inline]
    pub fn dt(&self, i: usize) -> f64 {
        self.times[i + 1] - self.times[i]
    }
}

impl Index<usize> for TimeGrid {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.times[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_grid() {
        let g = TimeGrid::new(vec![0.0, 0.25, 1.0]).unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g[2], 1.0);
        assert_eq!(g.dt(0), 0.25);
    }

    #[test]
    fn test_from_positive_times() {
        let g = TimeGrid::from_positive_times(&[0.5, 1.0]).unwrap();
        assert_eq!(g.times(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_invalid_grids() {
        assert!(TimeGrid::new(vec![]).is_err());
        assert!(TimeGrid::new(vec![0.1, 0.2]).is_err());
        assert!(TimeGrid::new(vec![0.0, 0.5, 0.5]).is_err());
        assert!(TimeGrid::new(vec![0.0, f64::NAN]).is_err());
        assert!(TimeGrid::from_positive_times(&[-1.0]).is_err());
    }
}
