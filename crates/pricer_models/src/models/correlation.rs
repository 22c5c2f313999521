//! Instantaneous correlation between model factors.
//!
//! Independent standard normals `Z` are turned into correlated increments
//! `W = L Z`, with `L` the lower Cholesky factor of the correlation matrix
//! `C = L L^T`.
//!
//! ```
//! use pricer_models::models::correlation::CorrelationMatrix;
//!
//! let corr = CorrelationMatrix::new(&[1.0, 0.5, 0.5, 1.0], 2).unwrap();
//! let chol = corr.cholesky().unwrap();
//! let mut w = [0.0; 2];
//! chol.transform_into(&[0.5, 0.8], &mut w);
//! assert_eq!(w[0], 0.5);
//! ```

use thiserror::Error;

const TOLERANCE: f64 = 1e-10;

/// Error types for correlation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    /// Matrix is not positive definite
    #[error("Correlation matrix is not positive definite")]
    NotPositiveDefinite,

    /// Wrong number of elements for the stated dimension
    #[error("Invalid matrix dimensions: expected {expected} elements, got {got}")]
    InvalidDimensions {
        /// Expected element count
        expected: usize,
        /// Provided element count
        got: usize,
    },

    /// Diagonal element differs from one
    #[error("Diagonal element at index {index} is {value}, expected 1.0")]
    InvalidDiagonal {
        /// Diagonal index
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Matrix is not symmetric
    #[error("Matrix is not symmetric at ({i}, {j})")]
    NotSymmetric {
        /// Row
        i: usize,
        /// Column
        j: usize,
    },

    /// Correlation outside [-1, 1]
    #[error("Correlation at ({i}, {j}) is {value}, must be in [-1, 1]")]
    OutOfRange {
        /// Row
        i: usize,
        /// Column
        j: usize,
        /// Offending value
        value: f64,
    },
}

/// Validated, row-major correlation matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    data: Vec<f64>,
    dim: usize,
}

impl CorrelationMatrix {
    /// Creates a correlation matrix from `dim * dim` row-major elements.
    ///
    /// Rejects non-unit diagonals, asymmetry and entries outside [-1, 1].
    pub fn new(data: &[f64], dim: usize) -> Result<Self, CorrelationError> {
        let expected = dim * dim;
        if data.len() != expected {
            return Err(CorrelationError::InvalidDimensions {
                expected,
                got: data.len(),
            });
        }

        for i in 0..dim {
            let diag = data[i * dim + i];
            if (diag - 1.0).abs() > TOLERANCE {
                return Err(CorrelationError::InvalidDiagonal {
                    index: i,
                    value: diag,
                });
            }
            for j in (i + 1)..dim {
                let upper = data[i * dim + j];
                if (upper - data[j * dim + i]).abs() > TOLERANCE {
                    return Err(CorrelationError::NotSymmetric { i, j });
                }
                if !(-1.0..=1.0).contains(&upper) {
                    return Err(CorrelationError::OutOfRange { i, j, value: upper });
                }
            }
        }

        Ok(Self {
            data: data.to_vec(),
            dim,
        })
    }

    /// Identity matrix (independent factors).
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Lower triangular factor `L` with `C = L L^T`.
    pub fn cholesky(&self) -> Result<CholeskyFactor, CorrelationError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let sum: f64 = (0..j).map(|k| lower[i * n + k] * lower[j * n + k]).sum();
                if i == j {
                    let diag = self.get(i, i) - sum;
                    if diag <= 0.0 {
                        return Err(CorrelationError::NotPositiveDefinite);
                    }
                    lower[i * n + i] = diag.sqrt();
                } else {
                    lower[i * n + j] = (self.get(i, j) - sum) / lower[j * n + j];
                }
            }
        }

        Ok(CholeskyFactor { data: lower, dim: n })
    }
}

/// Lower triangular Cholesky factor.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    data: Vec<f64>,
    dim: usize,
}

impl CholeskyFactor {
    /// Factor dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j); zero above the diagonal.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if j > i {
            0.0
        } else {
            self.data[i * self.dim + j]
        }
    }

    /// Writes `L z` into `w`.
    ///
    /// # Panics
    /// Panics if either slice is shorter than `dim()`.
    pub fn transform_into(&self, z: &[f64], w: &mut [f64]) {
        let n = self.dim;
        assert!(z.len() >= n && w.len() >= n, "slice shorter than factor dimension {n}");
        for i in 0..n {
            let row = &self.data[i * n..i * n + i + 1];
            w[i] = row.iter().zip(z).map(|(l, x)| l * x).sum();
        }
    }
}
