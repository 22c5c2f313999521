//! Per-run path state buffers.

use pricer_core::math::RandomVariable;
use pricer_models::models::{AssetType, CrossAssetModel};
use pricer_models::paths::MultiPath;

use super::mpor::{CubeSlot, NumeraireConvention};

/// FX spots and IR states of every sample on the full grid, plus the
/// optional state cache for batched calculators.
///
/// FX and IR storage is `[component][time][sample]` in flat vectors, sized
/// once for the run.
pub(crate) struct PathStateBuffers {
    times: usize,
    samples: usize,
    fx: Vec<f64>,
    ir: Vec<f64>,
    // [path time (excluding t_0)][state]
    paths: Option<Vec<Vec<RandomVariable>>>,
}

impl PathStateBuffers {
    /// Allocates buffers for `times` grid times (including `t_0`).
    pub(crate) fn new(model: &CrossAssetModel, times: usize, samples: usize, with_path_cache: bool) -> Self {
        let n_fx = model.components(AssetType::FX);
        let n_ir = model.components(AssetType::IR);
        let paths = with_path_cache.then(|| {
            vec![vec![RandomVariable::new(samples); model.state_size()]; times.saturating_sub(1)]
        });
        Self {
            times,
            samples,
            fx: vec![0.0; n_fx * times * samples],
            ir: vec![0.0; n_ir * times * samples],
            paths,
        }
    }

    #[inline]
    fn offset(&self, component: usize, k: usize, sample: usize) -> usize {
        (component * self.times + k) * self.samples + sample
    }

    /// Stores the states of `path` as sample `sample`.
    pub(crate) fn fill(&mut self, model: &CrossAssetModel, path: &MultiPath, sample: usize) {
        for c in 0..model.components(AssetType::FX) {
            let state = &path[model.p_idx(AssetType::FX, c)];
            for k in 0..self.times {
                let i = self.offset(c, k, sample);
                self.fx[i] = state[k].exp();
            }
        }
        for c in 0..model.components(AssetType::IR) {
            let state = &path[model.p_idx(AssetType::IR, c)];
            for k in 0..self.times {
                let i = self.offset(c, k, sample);
                self.ir[i] = state[k];
            }
        }
        if let Some(paths) = self.paths.as_mut() {
            for (j, states) in paths.iter_mut().enumerate() {
                for (s, rv) in states.iter_mut().enumerate() {
                    rv.set(sample, path[s][j + 1]);
                }
            }
        }
    }

    /// FX rate of currency `ccy` into the base currency; 1 for the base.
    #[inline]
    pub(crate) fn fx(&self, ccy: usize, k: usize, sample: usize) -> f64 {
        if ccy == 0 {
            1.0
        } else {
            self.fx[self.offset(ccy - 1, k, sample)]
        }
    }

    /// IR state of currency `ccy`.
    #[inline]
    pub(crate) fn state(&self, ccy: usize, k: usize, sample: usize) -> f64 {
        self.ir[self.offset(ccy, k, sample)]
    }

    /// Numeraire of currency `ccy` at `t`.
    pub(crate) fn num(&self, model: &CrossAssetModel, ccy: usize, k: usize, t: f64, sample: usize) -> f64 {
        model.numeraire(ccy, t, self.state(ccy, k, sample))
    }

    /// `N(ccy, t) / N(base, t)`; 1 for the base currency.
    pub(crate) fn num_ratio(&self, model: &CrossAssetModel, ccy: usize, k: usize, t: f64, sample: usize) -> f64 {
        if ccy == 0 {
            1.0
        } else {
            self.num(model, ccy, k, t, sample) / self.num(model, 0, k, t, sample)
        }
    }

    /// Factor converting a calculator value into the base currency for `slot`.
    pub(crate) fn conversion(&self, model: &CrossAssetModel, ccy: usize, slot: &CubeSlot, sample: usize) -> f64 {
        let k = slot.buffer_index;
        let numeraire = match slot.numeraire {
            NumeraireConvention::Ratio => self.num_ratio(model, ccy, k, slot.time, sample),
            NumeraireConvention::Plain => self.num(model, ccy, k, slot.time, sample),
        };
        self.fx(ccy, k, sample) * numeraire
    }

    /// Conversion factor of time-zero values.
    pub(crate) fn t0_conversion(&self, model: &CrossAssetModel, ccy: usize) -> f64 {
        self.fx(ccy, 0, 0) * self.num_ratio(model, ccy, 0, 0.0, 0)
    }

    /// Cached states for batched calculators, if allocated.
    pub(crate) fn paths(&self) -> Option<&[Vec<RandomVariable>]> {
        self.paths.as_deref()
    }
}
