//! Seeded pseudo-random number generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Seeded, reproducible random number generator.
///
/// Two instances created with the same seed produce identical sequences,
/// which is what lets every engine worker regenerate the same paths.
///
/// # Examples
///
/// ```rust
/// use pricer_models::rng::PricerRng;
///
/// let mut a = PricerRng::from_seed(7);
/// let mut b = PricerRng::from_seed(7);
/// assert_eq!(a.gen_normal(), b.gen_normal());
///
/// let mut buffer = vec![0.0; 16];
/// a.fill_normal(&mut buffer);
/// ```
#[derive(Debug, Clone)]
pub struct PricerRng {
    inner: StdRng,
    seed: u64,
}

impl PricerRng {
    /// Creates a generator initialised with `seed`.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed used for initialisation.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw in [0, 1).
    #[inline]
    pub fn gen_uniform(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Standard normal draw.
    #[inline]
    pub fn gen_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Fills `buffer` with standard normal draws.
    pub fn fill_normal(&mut self, buffer: &mut [f64]) {
        for x in buffer.iter_mut() {
            *x = StandardNormal.sample(&mut self.inner);
        }
    }
}
