use crate::errors::{GpboError, Result};
use gpbo_gp::{
    DefaultLogPrior, KernelFitter, KernelParams, Matern52Kernel, Posterior, StandardizedData,
    Status,
};
use gpbo_infill::{
    optimize_acqf_mixed, AcquisitionKind, AcquisitionParams, MixedOptimizerConfig, SearchSpace,
};
use linfa::prelude::{Dataset, Fit};
use log::info;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Env variable to set the log level (default: info)
pub const GPBO_LOG: &str = "GPBO_LOG";

/// Default noise variance floor
pub const MINIMUM_NOISE_DEFAULT: f64 = 1e-6;

/// Sampler configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GpSamplerConfig {
    /// Random generator seed, entropy based when None
    pub seed: Option<u64>,
    /// Lower bound of the fitted noise variance
    pub minimum_noise: f64,
    /// Whether the objective is noiseless, noise is then fixed to `minimum_noise`
    pub deterministic_objective: bool,
    /// Acquisition function maximized to propose candidates
    pub acquisition: AcquisitionKind,
    /// Acquisition optimizer settings
    pub optimizer: MixedOptimizerConfig,
    /// Number of best observations used as warm start points of the local searches
    pub n_warmstart: usize,
    /// Whether kernel parameters fitted at previous suggestion are used as initial guess
    pub reuse_kernel_params: bool,
}

impl Default for GpSamplerConfig {
    fn default() -> Self {
        GpSamplerConfig {
            seed: None,
            minimum_noise: MINIMUM_NOISE_DEFAULT,
            deterministic_objective: false,
            acquisition: AcquisitionKind::default(),
            optimizer: MixedOptimizerConfig::default(),
            n_warmstart: 1,
            reuse_kernel_params: true,
        }
    }
}

impl GpSamplerConfig {
    /// Sets a random generator seed to get reproducible suggestions
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the noise variance floor
    pub fn minimum_noise(mut self, minimum_noise: f64) -> Self {
        self.minimum_noise = minimum_noise;
        self
    }

    /// Sets whether the objective is noiseless
    pub fn deterministic_objective(mut self, deterministic_objective: bool) -> Self {
        self.deterministic_objective = deterministic_objective;
        self
    }

    /// Sets the acquisition function
    pub fn acquisition(mut self, acquisition: AcquisitionKind) -> Self {
        self.acquisition = acquisition;
        self
    }

    /// Sets the acquisition optimizer settings.
    /// Warm start points are overridden by the best observations.
    pub fn optimizer(mut self, optimizer: MixedOptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the number of best observations used as warm start points
    pub fn n_warmstart(mut self, n_warmstart: usize) -> Self {
        self.n_warmstart = n_warmstart;
        self
    }

    /// Sets whether previously fitted kernel parameters seed the next fit
    pub fn reuse_kernel_params(mut self, reuse_kernel_params: bool) -> Self {
        self.reuse_kernel_params = reuse_kernel_params;
        self
    }

    fn check(&self) -> Result<()> {
        if !(self.minimum_noise.is_finite() && self.minimum_noise > 0.) {
            return Err(GpboError::InvalidValue(format!(
                "minimum noise should be strictly positive, got {}",
                self.minimum_noise
            )));
        }
        self.optimizer.check()?;
        Ok(())
    }
}

/// A proposed point
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Suggestion {
    /// Point in the raw domain (categorical values as choice indices)
    pub params: Array1<f64>,
    /// Point in the normalized domain
    pub x: Array1<f64>,
    /// Acquisition score at `x`
    pub score: f64,
}

/// Gaussian process based sampler proposing the next point to evaluate
/// given the history of evaluated points and their scores.
///
/// Scores are maximized. A single random generator seeded at construction
/// drives every suggestion, hence for a given seed the sequence of suggestions
/// only depends on the successive histories.
#[derive(Debug)]
pub struct GpSampler {
    config: GpSamplerConfig,
    rng: Xoshiro256Plus,
    kernel_params: Option<KernelParams>,
}

impl Default for GpSampler {
    fn default() -> Self {
        GpSampler::new(GpSamplerConfig::default())
    }
}

impl GpSampler {
    /// Constructor, initializes logging from `GPBO_LOG` env variable
    pub fn new(config: GpSamplerConfig) -> Self {
        let env = env_logger::Env::new().filter_or(GPBO_LOG, "info");
        let mut builder = env_logger::Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        let rng = match config.seed {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        GpSampler {
            config,
            rng,
            kernel_params: None,
        }
    }

    /// Sampler configuration
    pub fn config(&self) -> &GpSamplerConfig {
        &self.config
    }

    /// Kernel parameters fitted at last suggestion if any
    pub fn kernel_params(&self) -> Option<&KernelParams> {
        self.kernel_params.as_ref()
    }

    /// Propose the next point to evaluate.
    ///
    /// `params` holds evaluated points as rows in the raw domain of `space`,
    /// `scores` the corresponding values to be maximized.
    pub fn suggest(
        &mut self,
        space: &SearchSpace,
        params: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        scores: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> Result<Status<Suggestion>> {
        self.config.check()?;
        if params.nrows() == 0 {
            return Err(GpboError::InvalidValue(
                "at least one observation is required".to_string(),
            ));
        }
        if params.nrows() != scores.len() {
            return Err(GpboError::InvalidValue(format!(
                "number of points {} should match number of scores {}",
                params.nrows(),
                scores.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(GpboError::InvalidValue(
                "scores should be finite".to_string(),
            ));
        }

        let now = Instant::now();
        let mut x = Array2::zeros((params.nrows(), space.ndim()));
        for (mut row, raw) in x.outer_iter_mut().zip(params.outer_iter()) {
            row.assign(&space.normalize(&raw)?);
        }
        let y = StandardizedData::new(scores).data;
        let mask = space.is_categorical_mask();

        let initial_params = self
            .kernel_params
            .clone()
            .filter(|p| self.config.reuse_kernel_params && p.dim() == space.ndim());
        let fitted = KernelFitter::params(Matern52Kernel(), DefaultLogPrior)
            .is_categorical(&mask)
            .minimum_noise(self.config.minimum_noise)
            .deterministic_objective(self.config.deterministic_objective)
            .initial_params(initial_params)
            .fit(&Dataset::new(x.clone(), y.clone()))?;
        let (kernel_params, fit_diagnostics) = fitted.into_parts();

        let posterior = Posterior::new(Matern52Kernel(), &kernel_params, &x, &y, &mask)?
            .with_upstream(fit_diagnostics);
        self.kernel_params = Some(kernel_params);
        let acqf = AcquisitionParams::new(self.config.acquisition, posterior, space.clone())?;

        let warmstart = best_rows(&x, &y, self.config.n_warmstart);
        let optimizer = self.config.optimizer.clone().warmstart(warmstart);
        let candidate = optimize_acqf_mixed(&acqf, &optimizer, &mut self.rng)?;

        let raw = space.denormalize(&candidate.value().x)?;
        let suggestion = candidate.map(|c| Suggestion {
            params: raw,
            x: c.x,
            score: c.score,
        });
        info!(
            "Suggestion {} ({}={:.4}) from {} observations in {:?}",
            suggestion.value().params,
            self.config.acquisition,
            suggestion.value().score,
            scores.len(),
            now.elapsed()
        );
        Ok(suggestion)
    }
}

/// Rows of `x` with the `n` largest `y` values, best first
fn best_rows(x: &Array2<f64>, y: &Array1<f64>, n: usize) -> Option<Array2<f64>> {
    if n == 0 {
        return None;
    }
    let mut indices: Vec<usize> = (0..y.len()).collect();
    indices.sort_by(|&i, &j| y[j].total_cmp(&y[i]));
    indices.truncate(n);
    Some(x.select(Axis(0), &indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use gpbo_gp::Diagnostic;
    use gpbo_infill::Dimension;
    use ndarray::{array, Array};
    use ndarray_rand::rand::Rng;

    fn mixed_space() -> SearchSpace {
        SearchSpace::new(vec![
            Dimension::log(1e-3, 1.),
            Dimension::int(1, 10),
            Dimension::categorical(3),
        ])
        .unwrap()
    }

    fn history(n: usize) -> (Array2<f64>, Array1<f64>) {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let mut params: Array2<f64> = Array2::zeros((n, 3));
        for mut row in params.outer_iter_mut() {
            row[0] = 10f64.powf(rng.gen_range(-3.0..0.0));
            row[1] = rng.gen_range(1..=10) as f64;
            row[2] = rng.gen_range(0..3) as f64;
        }
        let scores = params.map_axis(Axis(1), |r| {
            -(r[0].log10() + 2.).powi(2) - 0.1 * (r[1] - 7.).powi(2) + if r[2] == 1. { 1. } else { 0. }
        });
        (params, scores)
    }

    fn light_config() -> GpSamplerConfig {
        GpSamplerConfig::default()
            .seed(42)
            .optimizer(MixedOptimizerConfig::default().n_preliminary_samples(256))
    }

    #[test]
    fn test_suggest_in_space() {
        let space = mixed_space();
        let (params, scores) = history(12);
        let mut sampler = GpSampler::new(light_config());
        let suggestion = sampler.suggest(&space, &params, &scores).unwrap().into_value();

        let p = &suggestion.params;
        assert!((1e-3..=1.).contains(&p[0]));
        assert_eq!(0., p[1].fract());
        assert!((1. ..=10.).contains(&p[1]));
        assert!([0., 1., 2.].contains(&p[2]));
        assert!(space.contains(&suggestion.x));
        assert!(suggestion.score.is_finite());
        let renormalized = space.normalize(p).unwrap();
        assert_abs_diff_eq!(renormalized[1], suggestion.x[1], epsilon = 1e-12);
        assert_eq!(renormalized[2], suggestion.x[2]);
        assert!(sampler.kernel_params().is_some());
    }

    #[test]
    fn test_suggest_reproducible() {
        let space = mixed_space();
        let (params, scores) = history(10);
        let mut sampler1 = GpSampler::new(light_config());
        let mut sampler2 = GpSampler::new(light_config());
        for _ in 0..2 {
            let s1 = sampler1.suggest(&space, &params, &scores).unwrap().into_value();
            let s2 = sampler2.suggest(&space, &params, &scores).unwrap().into_value();
            assert_eq!(s1, s2);
        }
    }

    #[test]
    fn test_suggest_continuous_improves() {
        let space = SearchSpace::new(vec![Dimension::continuous(-2., 2.)]).unwrap();
        let params = array![[-2.], [-1.], [0.], [1.5], [2.]];
        let scores = params.column(0).mapv(|v| -(v - 0.5) * (v - 0.5));
        let mut sampler = GpSampler::new(
            light_config()
                .acquisition(AcquisitionKind::Ucb { beta: 0. })
                .deterministic_objective(true),
        );
        let suggestion = sampler.suggest(&space, &params, &scores).unwrap().into_value();
        assert!((-1. ..=1.5).contains(&suggestion.params[0]));
    }

    #[test]
    fn test_suggest_invalid_history() {
        let space = mixed_space();
        let (params, scores) = history(5);
        let mut sampler = GpSampler::new(light_config());
        assert!(sampler
            .suggest(&space, &params, &scores.slice(ndarray::s![..4]))
            .is_err());
        assert!(sampler
            .suggest(&space, &Array2::<f64>::zeros((0, 3)), &Array1::<f64>::zeros(0))
            .is_err());
        let mut bad = scores.clone();
        bad[0] = f64::NAN;
        assert!(sampler.suggest(&space, &params, &bad).is_err());
        let mut out = params.clone();
        out[[0, 2]] = 5.;
        assert!(sampler.suggest(&space, &out, &scores).is_err());

        let mut sampler = GpSampler::new(light_config().minimum_noise(0.));
        assert!(sampler.suggest(&space, &params, &scores).is_err());
    }

    #[test]
    fn test_suggest_with_redundant_observations() {
        let x = Array::range(1., 11., 1.)
            .mapv(|i| i / 10.)
            .into_iter()
            .chain(Array::range(1., 21., 1.).mapv(|i| i / 1e5))
            .chain(std::iter::repeat(0.).take(10))
            .collect::<Array1<f64>>();
        let mean = x.mean().unwrap();
        let std = x.std(0.);
        let scores = x.mapv(|v| -(v - mean) / std);
        let params = x.insert_axis(Axis(1));

        let space = SearchSpace::new(vec![Dimension::continuous(0., 1.)]).unwrap();
        let mut sampler = GpSampler::new(GpSamplerConfig::default().seed(0));
        let res = sampler.suggest(&space, &params, &scores).unwrap();
        assert!(res.is_degraded());
        let diagnostics = res.diagnostics();
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NearSingularCovariance { .. })));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ConvergedAcquisition { .. } | Diagnostic::FlatAcquisition { .. }
        )));
        assert!((0. ..=1.).contains(&res.value().params[0]));
    }
}
