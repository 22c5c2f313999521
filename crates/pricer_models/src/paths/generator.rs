//! Multi-factor path generation for the cross-asset model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::grid::TimeGrid;
use super::multi_path::MultiPath;
use crate::error::ModelError;
use crate::models::CrossAssetModel;
use crate::rng::PricerRng;

/// Source of joint paths, one per Monte Carlo sample.
///
/// Implementations are deterministic given their seed: the `n`-th call to
/// [`next`](MultiPathGenerator::next) always yields the same path.
pub trait MultiPathGenerator: Send {
    /// Draws the next path. The reference is valid until the following call.
    fn next(&mut self) -> &MultiPath;
}

/// Random sequence used to drive the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequenceType {
    /// Independent pseudo-random normals per path
    #[default]
    PseudoRandom,
    /// Pseudo-random normals where every second path mirrors the previous one
    PseudoRandomAntithetic,
}

/// Euler path generator for a [`CrossAssetModel`].
pub struct CrossAssetPathGenerator {
    model: Arc<CrossAssetModel>,
    rng: PricerRng,
    antithetic: bool,
    draws: usize,
    normals: Vec<f64>,
    correlated: Vec<f64>,
    path: MultiPath,
}

impl CrossAssetPathGenerator {
    /// Creates a generator over `time_grid` seeded with `seed`.
    pub fn new(
        model: Arc<CrossAssetModel>,
        time_grid: TimeGrid,
        sequence_type: SequenceType,
        seed: u64,
    ) -> Result<Self, ModelError> {
        let dim = model.state_size();
        let steps = time_grid.len() - 1;
        let mut path = MultiPath::new(dim, time_grid);
        for (j, x0) in model.initial_state().into_iter().enumerate() {
            path[j][0] = x0;
        }
        debug!(
            dim,
            steps,
            seed,
            ?sequence_type,
            "Initialised cross asset path generator"
        );
        Ok(Self {
            model,
            rng: PricerRng::from_seed(seed),
            antithetic: sequence_type == SequenceType::PseudoRandomAntithetic,
            draws: 0,
            normals: vec![0.0; steps * dim],
            correlated: vec![0.0; dim],
            path,
        })
    }
}

impl MultiPathGenerator for CrossAssetPathGenerator {
    fn next(&mut self) -> &MultiPath {
        if self.antithetic && self.draws % 2 == 1 {
            for z in &mut self.normals {
                *z = -*z;
            }
        } else {
            self.rng.fill_normal(&mut self.normals);
        }
        self.draws += 1;

        let dim = self.model.state_size();
        let mut current = vec![0.0; dim];
        let mut next = vec![0.0; dim];
        for (j, x) in current.iter_mut().enumerate() {
            *x = self.path[j][0];
        }

        for step in 0..self.path.path_size() - 1 {
            let t = self.path.time(step);
            let dt = self.path.time_grid().dt(step);
            let z = &self.normals[step * dim..(step + 1) * dim];
            self.model.cholesky().transform_into(z, &mut self.correlated);
            self.model
                .evolve(t, dt, &current, &self.correlated, &mut next);
            for (j, &x) in next.iter().enumerate() {
                self.path[j][step + 1] = x;
            }
            std::mem::swap(&mut current, &mut next);
        }

        &self.path
    }
}

/// Builds the generator for `sequence_type` over `time_grid`.
pub fn make_multi_path_generator(
    sequence_type: SequenceType,
    model: Arc<CrossAssetModel>,
    time_grid: TimeGrid,
    seed: u64,
) -> Result<Box<dyn MultiPathGenerator>, ModelError> {
    Ok(Box::new(CrossAssetPathGenerator::new(
        model,
        time_grid,
        sequence_type,
        seed,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FxBsParametrization, LgmParametrization};
    use approx::assert_relative_eq;
    use pricer_core::types::{Currency, DayCountConvention};

    fn model() -> Arc<CrossAssetModel> {
        Arc::new(
            CrossAssetModel::uncorrelated(
                vec![
                    LgmParametrization::new(Currency::EUR, 0.02, 0.01, 0.03).unwrap(),
                    LgmParametrization::new(Currency::USD, 0.03, 0.012, 0.02).unwrap(),
                ],
                vec![FxBsParametrization::new(Currency::USD, 0.9, 0.15).unwrap()],
                DayCountConvention::ActualActual365,
            )
            .unwrap(),
        )
    }

    fn grid() -> TimeGrid {
        TimeGrid::new(vec![0.0, 0.5, 1.0, 2.0]).unwrap()
    }

    #[test]
    fn test_path_shape_and_initial_state() {
        let mut gen = make_multi_path_generator(SequenceType::PseudoRandom, model(), grid(), 42).unwrap();
        let path = gen.next();
        assert_eq!(path.asset_number(), 3);
        assert_eq!(path.path_size(), 4);
        assert_eq!(path[0][0], 0.0);
        assert_relative_eq!(path[2][0], 0.9_f64.ln());
    }

    #[test]
    fn test_same_seed_same_paths() {
        let mut a = make_multi_path_generator(SequenceType::PseudoRandom, model(), grid(), 7).unwrap();
        let mut b = make_multi_path_generator(SequenceType::PseudoRandom, model(), grid(), 7).unwrap();
        for _ in 0..5 {
            assert_eq!(a.next().clone(), b.next().clone());
        }
    }

    #[test]
    fn test_successive_paths_differ() {
        let mut gen = make_multi_path_generator(SequenceType::PseudoRandom, model(), grid(), 7).unwrap();
        let first = gen.next().clone();
        let second = gen.next().clone();
        assert_ne!(first, second);
    }

    #[test]
    fn test_antithetic_mirrors_base_state() {
        let mut gen =
            make_multi_path_generator(SequenceType::PseudoRandomAntithetic, model(), grid(), 11).unwrap();
        let p = gen.next().clone();
        let q = gen.next().clone();
        // The base LGM state is driftless, so the mirrored path is its negative.
        for k in 0..p.path_size() {
            assert_relative_eq!(p[0][k], -q[0][k], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_base_state_variance() {
        let m = model();
        let mut gen = make_multi_path_generator(SequenceType::PseudoRandom, m.clone(), grid(), 2024).unwrap();
        let n = 20_000;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let z = gen.next()[0][3];
            sum_sq += z * z;
        }
        let var = sum_sq / n as f64;
        assert_relative_eq!(var, m.ir(0).zeta(2.0), max_relative = 0.05);
    }
}
