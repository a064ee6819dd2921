use crate::errors::{GpError, Result};
use crate::kernels::StationaryKernel;
use crate::likelihood::{covariance, factorize, inverse_from_cholesky};
use crate::parameters::KernelParams;
use crate::status::{Diagnostic, Status};
use crate::utils::{components, differences, PairwiseComponents};

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// GP posterior given frozen kernel parameters and observations.
///
/// Mean and variance at `x` follow the standard predictive equations
/// ```text
/// mean(x) = k(x)^T K^-1 y
/// var(x)  = scale - k(x)^T K^-1 k(x)
/// ```
/// where `K` is the covariance of the observations (noise included).
/// Gradients are computed with respect to continuous components of `x` only,
/// they are zero along categorical dimensions.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(serialize = "K: Serialize", deserialize = "K: Deserialize<'de>"))
)]
pub struct Posterior<K: StationaryKernel> {
    kernel: K,
    params: KernelParams,
    xtrain: Array2<f64>,
    ytrain: Array1<f64>,
    is_categorical: Vec<bool>,
    /// Inverse of the observations covariance
    cov_inv: Array2<f64>,
    /// K^-1 y
    alpha: Array1<f64>,
}

impl<K: StationaryKernel> fmt::Display for Posterior<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "GP(kernel={}, lengthscales={}, scale={}, noise={}, n_obs={})",
            self.kernel,
            self.params.lengthscales(),
            self.params.kernel_scale,
            self.params.noise_var,
            self.xtrain.nrows()
        )
    }
}

impl<K: StationaryKernel> Posterior<K> {
    /// Build the posterior, factorizing the observations covariance.
    ///
    /// Jitter is added to the covariance diagonal if required (reported as
    /// [`Diagnostic::JitterEscalated`]), the error [`GpError::LinearAlgebraFailure`]
    /// is returned when it is not enough.
    pub fn new(
        kernel: K,
        params: &KernelParams,
        x: &ArrayBase<impl Data<Elem = f64>, Ix2>,
        y: &ArrayBase<impl Data<Elem = f64>, Ix1>,
        is_categorical: &[bool],
    ) -> Result<Status<Self>> {
        if x.nrows() != y.len() || x.nrows() == 0 {
            return Err(GpError::InvalidValueError(format!(
                "Expected as many (>0) observations as scores, got {} and {}",
                x.nrows(),
                y.len()
            )));
        }
        if is_categorical.len() != x.ncols() || params.dim() != x.ncols() {
            return Err(GpError::InvalidValueError(format!(
                "Input dimension {} should match categorical mask ({}) and kernel parameters ({})",
                x.ncols(),
                is_categorical.len(),
                params.dim()
            )));
        }
        if !params.is_valid() {
            return Err(GpError::InvalidValueError(format!(
                "Kernel parameters should be finite and strictly positive, got {params:?}"
            )));
        }
        let comps = PairwiseComponents::new(x, is_categorical);
        let cov = covariance(&kernel, &comps, params);
        let factor = factorize(&cov, params.kernel_scale + params.noise_var)?;
        let mut params = params.clone();
        let mut diagnostics = vec![];
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
        let cov_inv = inverse_from_cholesky(&factor.chol)?;
        let alpha = cov_inv.dot(y);
        Ok(Status::new(
            Posterior {
                kernel,
                params,
                xtrain: x.to_owned(),
                ytrain: y.to_owned(),
                is_categorical: is_categorical.to_vec(),
                cov_inv,
                alpha,
            },
            diagnostics,
        ))
    }

    /// Kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Kernel parameters (noise including jitter if any)
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Training inputs
    pub fn xtrain(&self) -> &Array2<f64> {
        &self.xtrain
    }

    /// Training outputs
    pub fn ytrain(&self) -> &Array1<f64> {
        &self.ytrain
    }

    /// Categorical mask of input dimensions
    pub fn is_categorical(&self) -> &[bool] {
        &self.is_categorical
    }

    /// Input dimension
    pub fn dim(&self) -> usize {
        self.xtrain.ncols()
    }

    /// Kernel values and their derivatives wrt d2 between x and training points
    fn kernel_vector(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> (Array1<f64>, Array1<f64>) {
        let d2 = components(x, &self.xtrain, &self.is_categorical)
            .dot(&self.params.inverse_squared_lengthscales);
        let scale = self.params.kernel_scale;
        let mut k = Array1::zeros(d2.len());
        let mut dk = Array1::zeros(d2.len());
        Zip::from(&mut k)
            .and(&mut dk)
            .and(&d2)
            .for_each(|k, dk, d2| {
                let (v, dv) = self.kernel.valder(*d2);
                *k = scale * v;
                *dk = scale * dv;
            });
        (k, dk)
    }

    /// Predict mean and variance at a single point. Variance is clamped to zero
    /// when numerical errors make it negative.
    pub fn predict_valvar_single(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> (f64, f64) {
        let (k, _) = self.kernel_vector(x);
        let mean = k.dot(&self.alpha);
        let var = self.params.kernel_scale - k.dot(&self.cov_inv.dot(&k));
        (mean, var.max(0.))
    }

    /// Predict mean and variance at a single point together with their gradients
    /// with respect to `x`: returns (mean, var, dmean/dx, dvar/dx).
    /// Variance gradient is zero when variance is clamped.
    pub fn predict_valvar_gradients_single(
        &self,
        x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    ) -> (f64, f64, Array1<f64>, Array1<f64>) {
        let (k, dk_dd2) = self.kernel_vector(x);
        // dk_j/dx_i = scale k'(d2_j) 2 theta_i (x_i - xt_ji) for continuous i
        let mut dk = differences(x, &self.xtrain);
        let theta = &self.params.inverse_squared_lengthscales;
        for (i, mut col) in dk.axis_iter_mut(Axis(1)).enumerate() {
            if self.is_categorical[i] {
                col.fill(0.);
            } else {
                Zip::from(&mut col)
                    .and(&dk_dd2)
                    .for_each(|c, dd2| *c *= 2. * theta[i] * dd2);
            }
        }

        let mean = k.dot(&self.alpha);
        let dmean = dk.t().dot(&self.alpha);

        let kinv_k = self.cov_inv.dot(&k);
        let var = self.params.kernel_scale - k.dot(&kinv_k);
        if var > 0. {
            let dvar = dk.t().dot(&kinv_k) * -2.;
            (mean, var, dmean, dvar)
        } else {
            (mean, 0., dmean, Array1::zeros(x.len()))
        }
    }

    /// Predict means at given points
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| self.predict_valvar_single(&row).0)
            .collect()
    }

    /// Predict variances at given points
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array1<f64> {
        x.outer_iter()
            .map(|row| self.predict_valvar_single(&row).1)
            .collect()
    }
}
