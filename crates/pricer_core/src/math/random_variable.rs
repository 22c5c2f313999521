//! A vector of Monte Carlo samples treated as a single value.
//!
//! Batched AMC calculators receive the simulated states for all samples at a
//! time point as one `RandomVariable` per state component, and return their
//! deflated values in the same form.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

/// Sample vector with element-wise arithmetic.
///
/// Binary operations between two random variables require equal sizes.
///
/// # Examples
///
/// ```
/// use pricer_core::math::RandomVariable;
///
/// let a = RandomVariable::from_vec(vec![1.0, 2.0]);
/// let b = RandomVariable::constant(2, 3.0);
/// let c = &(&a * &b) + 1.0;
/// assert_eq!(c.values(), &[4.0, 7.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RandomVariable {
    values: Vec<f64>,
}

impl RandomVariable {
    /// Zero-valued random variable with `size` samples.
    pub fn new(size: usize) -> Self {
        Self::constant(size, 0.0)
    }

    /// Random variable with every sample equal to `value`.
    pub fn constant(size: usize, value: f64) -> Self {
        Self {
            values: vec![value; size],
        }
    }

    /// Wraps existing sample values.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of samples.
    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// True if there are no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of sample `i`.
    ///
    /// # Panics
    /// Panics if `i >= size()`.
    #[inline]
    pub fn at(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Sets sample `i`.
    ///
    /// # Panics
    /// Panics if `i >= size()`.
    #[inline]
    pub fn set(&mut self, i: usize, value: f64) {
        self.values[i] = value;
    }

    /// Sample values as a slice.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consumes the random variable and returns its samples.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Sample mean; zero for an empty random variable.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Applies `f` to every sample.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self.values.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Element-wise exponential.
    pub fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    /// Element-wise maximum with a scalar.
    pub fn max_scalar(&self, floor: f64) -> Self {
        self.map(|x| x.max(floor))
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        assert_eq!(
            self.size(),
            other.size(),
            "random variable size mismatch ({} vs {})",
            self.size(),
            other.size()
        );
        Self {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }
}

impl From<Vec<f64>> for RandomVariable {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

impl Add<&RandomVariable> for &RandomVariable {
    type Output = RandomVariable;

    fn add(self, rhs: &RandomVariable) -> RandomVariable {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub<&RandomVariable> for &RandomVariable {
    type Output = RandomVariable;

    fn sub(self, rhs: &RandomVariable) -> RandomVariable {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul<&RandomVariable> for &RandomVariable {
    type Output = RandomVariable;

    fn mul(self, rhs: &RandomVariable) -> RandomVariable {
        self.zip_with(rhs, |a, b| a * b)
    }
}

impl Div<&RandomVariable> for &RandomVariable {
    type Output = RandomVariable;

    fn div(self, rhs: &RandomVariable) -> RandomVariable {
        self.zip_with(rhs, |a, b| a / b)
    }
}

impl Add<f64> for &RandomVariable {
    type Output = RandomVariable;

    fn add(self, rhs: f64) -> RandomVariable {
        self.map(|x| x + rhs)
    }
}

impl Mul<f64> for &RandomVariable {
    type Output = RandomVariable;

    fn mul(self, rhs: f64) -> RandomVariable {
        self.map(|x| x * rhs)
    }
}

impl AddAssign<&RandomVariable> for RandomVariable {
    fn add_assign(&mut self, rhs: &RandomVariable) {
        assert_eq!(self.size(), rhs.size(), "random variable size mismatch");
        for (a, b) in self.values.iter_mut().zip(&rhs.values) {
            *a += b;
        }
    }
}

impl MulAssign<f64> for RandomVariable {
    fn mul_assign(&mut self, rhs: f64) {
        for a in &mut self.values {
            *a *= rhs;
        }
    }
}
