use crate::errors::{GpError, Result};
use crate::kernels::{Matern52Kernel, StationaryKernel};
use crate::likelihood::{count_redundant, covariance, factorize, NegLogPosterior};
use crate::optimization::{Algorithm, Optimizer};
use crate::parameters::{GpFitParams, GpFitValidParams, KernelParams};
use crate::prior::{DefaultLogPrior, LogPrior};
use crate::status::{Diagnostic, Status};
use crate::utils::PairwiseComponents;

use linfa::prelude::{DatasetBase, Fit};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use std::time::Instant;

/// Kernel hyperparameters fitting by maximum a posteriori estimation.
///
/// The negative log posterior `-(log_likelihood + log_prior)` is minimized in log space
/// with SLSQP using analytic gradients, COBYLA being used as fallback.
///
/// # Example
///
/// ```no_run
/// use gpbo_gp::{KernelFitter, Matern52Kernel, DefaultLogPrior};
/// use linfa::prelude::*;
/// use ndarray::array;
///
/// let xt = array![[0.0], [0.25], [0.5], [0.75], [1.0]];
/// let yt = array![0.0, 1.0, 1.5, 0.9, 1.0];
///
/// let fitted = KernelFitter::params(Matern52Kernel(), DefaultLogPrior)
///     .is_categorical(&[false])
///     .fit(&Dataset::new(xt, yt))
///     .expect("kernel fitted");
/// println!("{:?}", fitted.value());
/// ```
pub struct KernelFitter;

impl KernelFitter {
    /// Fitting parameters with default kernel and prior
    pub fn default_params() -> GpFitParams<Matern52Kernel, DefaultLogPrior> {
        GpFitParams::new(Matern52Kernel(), DefaultLogPrior)
    }

    /// Fitting parameters given kernel and log prior
    pub fn params<K: StationaryKernel, P: LogPrior>(kernel: K, log_prior: P) -> GpFitParams<K, P> {
        GpFitParams::new(kernel, log_prior)
    }
}

impl<K: StationaryKernel, P: LogPrior, D: Data<Elem = f64>>
    Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError> for GpFitValidParams<K, P>
{
    type Object = Status<KernelParams>;

    /// Fit kernel parameters using maximum a posteriori estimation
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        let x = dataset.records();
        let y = dataset.targets();
        let is_categorical = if self.is_categorical().is_empty() {
            vec![false; x.ncols()]
        } else {
            self.is_categorical().to_vec()
        };
        check_observations(x, y, &is_categorical)?;

        let comps = PairwiseComponents::new(x, &is_categorical);
        let y = y.to_owned();
        let dim = x.ncols();
        let default_params =
            KernelParams::default_params(dim, self.deterministic_objective(), self.minimum_noise());

        let objective = NegLogPosterior {
            kernel: self.kernel(),
            log_prior: self.log_prior(),
            comps: &comps,
            y: &y,
            minimum_noise: self.minimum_noise(),
            deterministic_objective: self.deterministic_objective(),
        };

        let mut starts = vec![];
        if let Some(init) = self.initial_params() {
            if init.dim() != dim {
                return Err(GpError::InvalidValueError(format!(
                    "Initial kernel parameters dimension {} should match input dimension {}",
                    init.dim(),
                    dim
                )));
            }
            starts.push(init.clone());
        }
        starts.push(default_params.clone());

        let now = Instant::now();
        let mut diagnostics = vec![];
        let mut params = None;
        for start in starts.iter() {
            match self.optimize_from(&objective, start, dim) {
                Some(p) => {
                    params = Some(p);
                    break;
                }
                None => debug!("Kernel parameters optimization failed from {start:?}"),
            }
        }
        let mut params = match params {
            Some(p) => p,
            None => {
                diagnostics.push(
                    Diagnostic::KernelFitFallback {
                        reason: "no valid optimum from initial nor default parameters".to_string(),
                    }
                    .emit(),
                );
                default_params
            }
        };
        debug!("elapsed kernel fit = {:?}", now.elapsed().as_millis());

        let cov = covariance(self.kernel(), &comps, &params);
        let factor = factorize(&cov, params.kernel_scale + params.noise_var)?;
        if factor.jitter > 0. {
            params.noise_var += factor.jitter;
            diagnostics.push(
                Diagnostic::JitterEscalated {
                    jitter: factor.jitter,
                    attempts: factor.attempts,
                }
                .emit(),
            );
        }

        let redundant = count_redundant(self.kernel(), &comps, &params);
        if redundant > 0 {
            diagnostics.push(Diagnostic::NearSingularCovariance { redundant }.emit());
        }

        info!(
            "Kernel {} fitted: lengthscales={}, scale={}, noise={}",
            self.kernel(),
            params.lengthscales(),
            params.kernel_scale,
            params.noise_var
        );
        Ok(Status::new(params, diagnostics))
    }
}

impl<K: StationaryKernel, P: LogPrior> GpFitValidParams<K, P> {
    /// Minimize the negative log posterior from `start`, SLSQP first then COBYLA.
    /// Returns `None` when no algorithm reaches a finite value.
    fn optimize_from(
        &self,
        objective: &NegLogPosterior<K, P>,
        start: &KernelParams,
        dim: usize,
    ) -> Option<KernelParams> {
        let raw0 = Array1::from(start.to_raw(self.minimum_noise(), self.deterministic_objective()));
        let bounds = KernelParams::raw_bounds(dim, self.deterministic_objective());
        let bounds = Array2::from_shape_fn((bounds.len(), 2), |(i, j)| {
            if j == 0 {
                bounds[i].0
            } else {
                bounds[i].1
            }
        });

        let objfn = |x: &[f64], gradient: Option<&mut [f64]>, _params: &mut ()| -> f64 {
            match objective.value_grad(x) {
                Some((value, grad)) => {
                    if let Some(g) = gradient {
                        g.copy_from_slice(&grad);
                    }
                    value
                }
                None => {
                    if let Some(g) = gradient {
                        g.iter_mut().for_each(|v| *v = 0.);
                    }
                    f64::INFINITY
                }
            }
        };

        for algo in [Algorithm::Slsqp, Algorithm::Cobyla] {
            let (fmin, raw_opt) = Optimizer::new(algo, &objfn, &bounds)
                .xinit(&raw0.view())
                .max_eval(self.max_eval())
                .ftol_rel(1e-8)
                .minimize();
            if fmin.is_finite() {
                let params = KernelParams::from_raw(
                    raw_opt.as_slice()?,
                    dim,
                    self.minimum_noise(),
                    self.deterministic_objective(),
                );
                if params.is_valid() {
                    debug!("{algo:?} kernel fit: -log posterior = {fmin}");
                    return Some(params);
                }
            }
            debug!("{algo:?} kernel fit failed");
        }
        None
    }
}

fn check_observations(
    x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    y: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    is_categorical: &[bool],
) -> Result<()> {
    if x.nrows() == 0 {
        return Err(GpError::InvalidValueError(
            "At least one observation is required".to_string(),
        ));
    }
    if x.nrows() != y.len() {
        return Err(GpError::InvalidValueError(format!(
            "Number of observations {} should match number of scores {}",
            x.nrows(),
            y.len()
        )));
    }
    if is_categorical.len() != x.ncols() {
        return Err(GpError::InvalidValueError(format!(
            "Categorical mask length {} should match input dimension {}",
            is_categorical.len(),
            x.ncols()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(GpError::InvalidValueError(
            "Observations should be finite".to_string(),
        ));
    }
    Ok(())
}

/// Fit kernel parameters of observations `(x, y)`, `y` being oriented for maximization.
///
/// Convenience function over [`KernelFitter`] with the default Matern 5/2 kernel.
/// See [`GpFitParams`] to customize kernel, initial parameters or evaluation budget.
pub fn fit_kernel_params<P: LogPrior>(
    x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    y: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    is_categorical: &[bool],
    log_prior: P,
    minimum_noise: f64,
    deterministic_objective: bool,
) -> Result<Status<KernelParams>> {
    let dataset = DatasetBase::new(x.to_owned(), y.to_owned());
    KernelFitter::params(Matern52Kernel(), log_prior)
        .is_categorical(is_categorical)
        .minimum_noise(minimum_noise)
        .deterministic_objective(deterministic_objective)
        .fit(&dataset)
}
