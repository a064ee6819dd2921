use crate::errors::{GpError, Result};
use crate::kernels::StationaryKernel;
use crate::prior::{LogPrior, DEFAULT_MINIMUM_NOISE_VAR};
use crate::GP_FIT_MAX_EVAL;
use linfa::ParamGuard;

use ndarray::{Array1, ArrayBase, Data, Ix1};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Bounds of the log of inverse squared lengthscales and kernel scale during fitting
pub(crate) const LOG_PARAM_BOUNDS: (f64, f64) = (-13.815510557964274, 13.815510557964274); // ln(1e-6), ln(1e6)
/// Bounds of the log of the noise variance excess over the noise floor
pub(crate) const LOG_NOISE_BOUNDS: (f64, f64) = (-27.631021115928547, 4.605170185988092); // ln(1e-12), ln(1e2)

/// Kernel hyperparameters of the GP
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct KernelParams {
    /// Inverse squared lengthscales, one per input dimension
    pub inverse_squared_lengthscales: Array1<f64>,
    /// Output scale of the kernel
    pub kernel_scale: f64,
    /// Observation noise variance
    pub noise_var: f64,
}

impl KernelParams {
    /// Constructor
    pub fn new(
        inverse_squared_lengthscales: Array1<f64>,
        kernel_scale: f64,
        noise_var: f64,
    ) -> KernelParams {
        KernelParams {
            inverse_squared_lengthscales,
            kernel_scale,
            noise_var,
        }
    }

    /// Default kernel parameters used as starting point of the fitting
    /// and as fallback when fitting fails
    pub fn default_params(dim: usize, deterministic_objective: bool, minimum_noise: f64) -> Self {
        KernelParams {
            inverse_squared_lengthscales: Array1::ones(dim),
            kernel_scale: 1.,
            noise_var: if deterministic_objective {
                minimum_noise
            } else {
                1.
            },
        }
    }

    /// Number of input dimensions
    pub fn dim(&self) -> usize {
        self.inverse_squared_lengthscales.len()
    }

    /// Lengthscales, ie `1 / sqrt(theta)`
    pub fn lengthscales(&self) -> Array1<f64> {
        self.inverse_squared_lengthscales.mapv(|t| 1. / t.sqrt())
    }

    /// Whether all parameters are finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.inverse_squared_lengthscales
            .iter()
            .all(|t| t.is_finite() && *t > 0.)
            && self.kernel_scale.is_finite()
            && self.kernel_scale > 0.
            && self.noise_var.is_finite()
            && self.noise_var > 0.
    }

    /// Flatten as (theta_1..d, scale, noise)
    pub(crate) fn to_natural(&self) -> Array1<f64> {
        let d = self.dim();
        let mut v = Array1::zeros(d + 2);
        v.slice_mut(ndarray::s![..d])
            .assign(&self.inverse_squared_lengthscales);
        v[d] = self.kernel_scale;
        v[d + 1] = self.noise_var;
        v
    }

    /// Inverse of [`KernelParams::to_natural`]
    pub(crate) fn from_natural(v: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Self {
        let d = v.len() - 2;
        KernelParams {
            inverse_squared_lengthscales: v.slice(ndarray::s![..d]).to_owned(),
            kernel_scale: v[d],
            noise_var: v[d + 1],
        }
    }

    /// Unconstrained log space representation used by the optimizer:
    /// (ln theta_1..d, ln scale[, ln(noise - minimum_noise)])
    pub(crate) fn to_raw(&self, minimum_noise: f64, deterministic_objective: bool) -> Vec<f64> {
        let mut raw: Vec<f64> = self
            .inverse_squared_lengthscales
            .iter()
            .map(|t| t.ln().clamp(LOG_PARAM_BOUNDS.0, LOG_PARAM_BOUNDS.1))
            .collect();
        raw.push(
            self.kernel_scale
                .ln()
                .clamp(LOG_PARAM_BOUNDS.0, LOG_PARAM_BOUNDS.1),
        );
        if !deterministic_objective {
            let excess = (self.noise_var - minimum_noise).max(f64::MIN_POSITIVE);
            raw.push(excess.ln().clamp(LOG_NOISE_BOUNDS.0, LOG_NOISE_BOUNDS.1));
        }
        raw
    }

    /// Inverse of [`KernelParams::to_raw`]
    pub(crate) fn from_raw(
        raw: &[f64],
        dim: usize,
        minimum_noise: f64,
        deterministic_objective: bool,
    ) -> Self {
        let noise_var = if deterministic_objective {
            minimum_noise
        } else {
            raw[dim + 1].exp() + minimum_noise
        };
        KernelParams {
            inverse_squared_lengthscales: raw[..dim].iter().map(|v| v.exp()).collect(),
            kernel_scale: raw[dim].exp(),
            noise_var,
        }
    }

    /// Bounds of the raw parameters
    pub(crate) fn raw_bounds(dim: usize, deterministic_objective: bool) -> Vec<(f64, f64)> {
        let mut bounds = vec![LOG_PARAM_BOUNDS; dim + 1];
        if !deterministic_objective {
            bounds.push(LOG_NOISE_BOUNDS);
        }
        bounds
    }
}

/// A set of validated kernel fitting parameters.
#[derive(Clone, Debug)]
pub struct GpFitValidParams<K: StationaryKernel, P: LogPrior> {
    /// Kernel used to build the covariance
    pub(crate) kernel: K,
    /// Log prior density regularizing the likelihood
    pub(crate) log_prior: P,
    /// Categorical mask of input dimensions, all continuous when empty
    pub(crate) is_categorical: Vec<bool>,
    /// Lower bound of the noise variance
    pub(crate) minimum_noise: f64,
    /// Whether the objective is exact, noise variance is then pinned to its minimum
    pub(crate) deterministic_objective: bool,
    /// Optional starting point of the optimization (previous fit for instance)
    pub(crate) initial_params: Option<KernelParams>,
    /// Max number of likelihood evaluations during optimization
    pub(crate) max_eval: usize,
}

impl<K: StationaryKernel, P: LogPrior + Default> Default for GpFitValidParams<K, P> {
    fn default() -> GpFitValidParams<K, P> {
        GpFitValidParams {
            kernel: K::default(),
            log_prior: P::default(),
            is_categorical: vec![],
            minimum_noise: DEFAULT_MINIMUM_NOISE_VAR,
            deterministic_objective: false,
            initial_params: None,
            max_eval: GP_FIT_MAX_EVAL,
        }
    }
}

impl<K: StationaryKernel, P: LogPrior> GpFitValidParams<K, P> {
    /// Get kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Get log prior
    pub fn log_prior(&self) -> &P {
        &self.log_prior
    }

    /// Get categorical mask
    pub fn is_categorical(&self) -> &[bool] {
        &self.is_categorical
    }

    /// Get noise variance floor
    pub fn minimum_noise(&self) -> f64 {
        self.minimum_noise
    }

    /// Whether the objective is considered exact
    pub fn deterministic_objective(&self) -> bool {
        self.deterministic_objective
    }

    /// Get starting point of the optimization
    pub fn initial_params(&self) -> Option<&KernelParams> {
        self.initial_params.as_ref()
    }

    /// Get max number of likelihood evaluations
    pub fn max_eval(&self) -> usize {
        self.max_eval
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the fitting of
/// [`KernelParams`](crate::KernelParams).
pub struct GpFitParams<K: StationaryKernel, P: LogPrior>(GpFitValidParams<K, P>);

impl<K: StationaryKernel, P: LogPrior> GpFitParams<K, P> {
    /// A constructor for kernel fitting parameters given kernel and log prior
    pub fn new(kernel: K, log_prior: P) -> GpFitParams<K, P> {
        Self(GpFitValidParams {
            kernel,
            log_prior,
            is_categorical: vec![],
            minimum_noise: DEFAULT_MINIMUM_NOISE_VAR,
            deterministic_objective: false,
            initial_params: None,
            max_eval: GP_FIT_MAX_EVAL,
        })
    }

    /// Set kernel
    pub fn kernel(mut self, kernel: K) -> Self {
        self.0.kernel = kernel;
        self
    }

    /// Set log prior
    pub fn log_prior(mut self, log_prior: P) -> Self {
        self.0.log_prior = log_prior;
        self
    }

    /// Set categorical mask of the input dimensions
    pub fn is_categorical(mut self, is_categorical: &[bool]) -> Self {
        self.0.is_categorical = is_categorical.to_vec();
        self
    }

    /// Set noise variance floor
    pub fn minimum_noise(mut self, minimum_noise: f64) -> Self {
        self.0.minimum_noise = minimum_noise;
        self
    }

    /// Set whether the objective is exact
    pub fn deterministic_objective(mut self, deterministic_objective: bool) -> Self {
        self.0.deterministic_objective = deterministic_objective;
        self
    }

    /// Set starting point of the optimization
    pub fn initial_params(mut self, initial_params: Option<KernelParams>) -> Self {
        self.0.initial_params = initial_params;
        self
    }

    /// Set max number of likelihood evaluations
    pub fn max_eval(mut self, max_eval: usize) -> Self {
        self.0.max_eval = max_eval;
        self
    }
}

impl<K: StationaryKernel, P: LogPrior> From<GpFitValidParams<K, P>> for GpFitParams<K, P> {
    fn from(valid: GpFitValidParams<K, P>) -> Self {
        GpFitParams(valid)
    }
}

impl<K: StationaryKernel, P: LogPrior> ParamGuard for GpFitParams<K, P> {
    type Checked = GpFitValidParams<K, P>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if !(self.0.minimum_noise.is_finite() && self.0.minimum_noise > 0.) {
            return Err(GpError::InvalidValueError(format!(
                "Minimum noise variance should be strictly positive, got {}",
                self.0.minimum_noise
            )));
        }
        if self.0.max_eval == 0 {
            return Err(GpError::InvalidValueError(
                "Max number of likelihood evaluations should be positive".to_string(),
            ));
        }
        if let Some(init) = self.0.initial_params.as_ref() {
            if !init.is_valid() {
                return Err(GpError::InvalidValueError(format!(
                    "Initial kernel parameters should be finite and strictly positive, got {init:?}"
                )));
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultLogPrior, Matern52Kernel};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_raw_roundtrip_keeps_noise_floor() {
        let params = KernelParams::new(array![0.5, 4.], 2., 1e-3);
        let raw = params.to_raw(1e-6, false);
        assert_eq!(4, raw.len());
        let back = KernelParams::from_raw(&raw, 2, 1e-6, false);
        assert_abs_diff_eq!(
            back.inverse_squared_lengthscales,
            params.inverse_squared_lengthscales,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(back.noise_var, 1e-3, epsilon = 1e-12);

        let raw = params.to_raw(1e-6, true);
        assert_eq!(3, raw.len());
        let back = KernelParams::from_raw(&raw, 2, 1e-6, true);
        assert_abs_diff_eq!(back.noise_var, 1e-6);
    }

    #[test]
    fn test_check_params() {
        let params = GpFitParams::new(Matern52Kernel(), DefaultLogPrior).minimum_noise(0.);
        assert!(params.check_ref().is_err());
        let params = GpFitParams::new(Matern52Kernel(), DefaultLogPrior).initial_params(Some(
            KernelParams::new(array![-1.], 1., 1.),
        ));
        assert!(params.check().is_err());
        let params = GpFitParams::new(Matern52Kernel(), DefaultLogPrior)
            .is_categorical(&[false, true])
            .deterministic_objective(true);
        let valid = params.check().unwrap();
        assert_eq!(valid.is_categorical(), &[false, true]);
        assert!(valid.deterministic_objective());
    }

    #[test]
    fn test_lengthscales() {
        let params = KernelParams::new(array![4., 0.25], 1., 1.);
        assert_abs_diff_eq!(params.lengthscales(), array![0.5, 2.], epsilon = 1e-12);
    }

    #[cfg(feature = "serializable")]
    #[test]
    fn test_kernel_params_json() {
        let params = KernelParams::new(array![4., 0.25], 1.5, 1e-6);
        let json = serde_json::to_string(&params).unwrap();
        let loaded: KernelParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, loaded);
    }
}
