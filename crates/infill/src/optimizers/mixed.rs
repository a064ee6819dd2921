use super::start_points::select_start_points;
use crate::criteria::AcquisitionParams;
use crate::errors::{InfillError, Result};
use crate::types::Candidate;
use gpbo_gp::optimization::{Algorithm, Optimizer};
use gpbo_gp::{Diagnostic, Status, StationaryKernel};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1};
use ndarray_rand::rand::Rng;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default number of random samples scored to pick local search starting points
pub const N_PRELIMINARY_SAMPLES_DEFAULT: usize = 2048;
/// Default number of local searches
pub const N_LOCAL_SEARCH_DEFAULT: usize = 10;

/// Configuration of the mixed acquisition optimizer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct MixedOptimizerConfig {
    /// Number of random samples scored to pick starting points
    pub n_preliminary_samples: usize,
    /// Number of local searches (warm start points included)
    pub n_local_search: usize,
    /// Minimal score improvement for a local search move to be accepted
    pub tol: f64,
    /// Max number of alternation rounds of a local search
    pub max_iter: usize,
    /// Max number of acquisition evaluations of a gradient ascent
    pub max_eval: usize,
    /// Normalized points always used as starting points (typically best observations)
    pub warmstart: Option<Array2<f64>>,
}

impl Default for MixedOptimizerConfig {
    fn default() -> Self {
        MixedOptimizerConfig {
            n_preliminary_samples: N_PRELIMINARY_SAMPLES_DEFAULT,
            n_local_search: N_LOCAL_SEARCH_DEFAULT,
            tol: 1e-4,
            max_iter: 100,
            max_eval: 200,
            warmstart: None,
        }
    }
}

impl MixedOptimizerConfig {
    /// Sets number of preliminary samples
    pub fn n_preliminary_samples(mut self, n_preliminary_samples: usize) -> Self {
        self.n_preliminary_samples = n_preliminary_samples;
        self
    }

    /// Sets number of local searches
    pub fn n_local_search(mut self, n_local_search: usize) -> Self {
        self.n_local_search = n_local_search;
        self
    }

    /// Sets improvement tolerance
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets max number of alternation rounds
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets max number of evaluations of a gradient ascent
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.max_eval = max_eval;
        self
    }

    /// Sets warm start points
    pub fn warmstart(mut self, warmstart: Option<Array2<f64>>) -> Self {
        self.warmstart = warmstart;
        self
    }

    /// Check configuration consistency
    pub fn check(&self) -> Result<()> {
        if self.n_preliminary_samples == 0 || self.n_local_search == 0 {
            return Err(InfillError::InvalidConfigError(format!(
                "Numbers of preliminary samples ({}) and local searches ({}) should be positive",
                self.n_preliminary_samples, self.n_local_search
            )));
        }
        if !(self.tol.is_finite() && self.tol >= 0.) {
            return Err(InfillError::InvalidConfigError(format!(
                "Tolerance should be positive, got {}",
                self.tol
            )));
        }
        if self.max_iter == 0 || self.max_eval == 0 {
            return Err(InfillError::InvalidConfigError(
                "Iteration and evaluation budgets should be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a local search from one starting point
#[derive(Debug)]
struct LocalSearchResult {
    x: Array1<f64>,
    score: f64,
    improved: bool,
    converged: bool,
}

/// Maximize the acquisition function over the mixed search space.
///
/// Starting points are the best of `n_preliminary_samples` random samples, other samples
/// picked by roulette wheel selection and warm start points. From each of them a local search
/// alternates gradient ascent on continuous and stepped coordinates with exhaustive search
/// of categorical values and neighbouring grid values, until no move improves the score.
///
/// The best point is always returned, degraded convergence being reported as diagnostics:
/// * [`Diagnostic::ConvergedAcquisition`] when too few samples have a non negligible score
///   to run `n_local_search` searches,
/// * [`Diagnostic::LocalSearchNotConverged`] when a local search runs out of iterations,
/// * [`Diagnostic::FlatAcquisition`] when the returned point could not be improved at all
///   from its starting point.
///
/// Diagnostics raised when building the acquisition parameters come first.
pub fn optimize_acqf_mixed<K: StationaryKernel, R: Rng>(
    params: &AcquisitionParams<K>,
    config: &MixedOptimizerConfig,
    rng: &mut R,
) -> Result<Status<Candidate>> {
    config.check()?;
    let space = params.search_space();
    let warmstart = match config.warmstart.as_ref() {
        Some(w) if w.ncols() != space.ndim() => {
            return Err(InfillError::InvalidValue(format!(
                "Warm start points dimension {} should match search space dimension {}",
                w.ncols(),
                space.ndim()
            )));
        }
        Some(w) => w
            .outer_iter()
            .map(|x| space.round_to_grid(&x))
            .collect::<Vec<_>>(),
        None => vec![],
    };

    let now = Instant::now();
    let samples = space.sample(config.n_preliminary_samples, rng);
    let values = params.values(&samples);

    let n_additional = config
        .n_local_search
        .saturating_sub(1)
        .saturating_sub(warmstart.len());
    let pool = select_start_points(&values, n_additional, rng).ok_or_else(|| {
        InfillError::InvalidValue("No preliminary sample to start from".to_string())
    })?;

    let mut diagnostics = vec![];
    let mut starts: Vec<Array1<f64>> = pool
        .indices
        .iter()
        .map(|&i| samples.index_axis(Axis(0), i).to_owned())
        .collect();
    starts.extend(warmstart);
    if pool.reduced {
        diagnostics.push(
            Diagnostic::ConvergedAcquisition {
                n_local_search: starts.len(),
            }
            .emit(),
        );
    }
    debug!(
        "{} local searches ({} candidates among preliminary samples)",
        starts.len(),
        pool.n_candidates
    );

    let mut best: Option<LocalSearchResult> = None;
    let mut not_converged = false;
    for start in starts.iter() {
        let res = local_search(params, start, config);
        not_converged |= !res.converged;
        debug!("Local search: score={} at {}", res.score, res.x);
        if best.as_ref().map_or(true, |b| res.score > b.score) {
            best = Some(res);
        }
    }
    let best = best.ok_or_else(|| {
        InfillError::InvalidValue("No local search could be run".to_string())
    })?;

    if not_converged {
        diagnostics.push(
            Diagnostic::LocalSearchNotConverged {
                max_iter: config.max_iter,
            }
            .emit(),
        );
    }
    if !best.improved {
        diagnostics.push(Diagnostic::FlatAcquisition { score: best.score }.emit());
    }
    info!(
        "{} optimized in {}ms: score={} at {}",
        params.kind(),
        now.elapsed().as_millis(),
        best.score,
        best.x
    );
    Ok(Status::new(
        Candidate {
            x: best.x,
            score: best.score,
        },
        diagnostics,
    )
    .with_upstream(params.diagnostics().to_vec()))
}

/// Alternate gradient ascent on continuous coordinates and discrete coordinate-wise
/// search until a round brings no improvement above tolerance
fn local_search<K: StationaryKernel>(
    params: &AcquisitionParams<K>,
    start: &Array1<f64>,
    config: &MixedOptimizerConfig,
) -> LocalSearchResult {
    let space = params.search_space();
    let continuous = space.continuous_indices();
    let mut x = space.round_to_grid(start);
    let mut score = params.value(&x);
    let mut improved = false;

    for _ in 0..config.max_iter {
        let mut changed = false;

        if !continuous.is_empty() {
            if let Some((xn, fnew)) = gradient_ascent(params, &x, &continuous, config.max_eval) {
                if fnew > score + config.tol {
                    x = xn;
                    score = fnew;
                    changed = true;
                }
            }
        }

        for i in 0..space.ndim() {
            let choices: Vec<f64> = match space.n_choices(i) {
                Some(k) => (0..k).map(|c| c as f64).filter(|c| *c != x[i]).collect(),
                None => space.grid_neighbours(i, x[i]),
            };
            let mut xi_best = None;
            let mut fi_best = score + config.tol;
            for c in choices {
                let mut xc = x.clone();
                xc[i] = c;
                let fc = params.value(&xc);
                if fc > fi_best {
                    fi_best = fc;
                    xi_best = Some(c);
                }
            }
            if let Some(c) = xi_best {
                x[i] = c;
                score = fi_best;
                changed = true;
            }
        }

        if !changed {
            return LocalSearchResult {
                x,
                score,
                improved,
                converged: true,
            };
        }
        improved = true;
    }
    LocalSearchResult {
        x,
        score,
        improved,
        converged: false,
    }
}

/// Maximize the acquisition with regard to `continuous` coordinates of `x` with
/// SLSQP within `[0, 1]`, the result being snapped onto the grid.
/// Returns `None` when no finite score is reached.
fn gradient_ascent<K: StationaryKernel>(
    params: &AcquisitionParams<K>,
    x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    continuous: &[usize],
    max_eval: usize,
) -> Option<(Array1<f64>, f64)> {
    let space = params.search_space();
    let xfull = x.to_owned();
    let z0: Array1<f64> = continuous.iter().map(|&i| xfull[i]).collect();
    let bounds = Array2::from_shape_fn((continuous.len(), 2), |(_, j)| j as f64);

    let neg_acqf = |z: &[f64], gradient: Option<&mut [f64]>, _u: &mut ()| -> f64 {
        let mut xz = xfull.clone();
        for (k, &i) in continuous.iter().enumerate() {
            xz[i] = z[k];
        }
        match gradient {
            Some(g) => {
                let (value, grad) = params.evaluate(&xz);
                for (k, &i) in continuous.iter().enumerate() {
                    g[k] = -grad[i];
                }
                -value
            }
            None => -params.value(&xz),
        }
    };

    let (_, zopt) = Optimizer::new(Algorithm::Slsqp, &neg_acqf, &bounds)
        .xinit(&z0.view())
        .max_eval(max_eval)
        .ftol_rel(1e-9)
        .minimize();

    let mut xopt = xfull;
    for (k, &i) in continuous.iter().enumerate() {
        xopt[i] = zopt[k];
    }
    let xopt = space.round_to_grid(&xopt);
    let fopt = params.value(&xopt);
    fopt.is_finite().then_some((xopt, fopt))
}
