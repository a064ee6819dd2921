//! Covariance assembly, stabilized Cholesky factorization and log marginal likelihood.

use crate::errors::{GpError, Result};
use crate::kernels::StationaryKernel;
use crate::parameters::KernelParams;
use crate::prior::LogPrior;
use crate::utils::PairwiseComponents;

use linfa_linalg::{cholesky::*, triangular::*};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1};

/// Relative magnitudes of the jitter successively added to the covariance diagonal
pub const JITTER_SEQUENCE: [f64; 5] = [0., 1e-10, 1e-8, 1e-6, 1e-4];

const LOG_2PI: f64 = 1.8378770664093453;

/// Cholesky factorization of a covariance matrix with the jitter required to get it
#[derive(Clone, Debug)]
pub(crate) struct CovarianceFactor {
    /// Lower triangular factor
    pub chol: Array2<f64>,
    /// Jitter added to the diagonal
    pub jitter: f64,
    /// Number of factorization attempts
    pub attempts: usize,
}

/// Build covariance matrix `scale * k(d2) + noise * I` of the training points
pub(crate) fn covariance<K: StationaryKernel>(
    kernel: &K,
    comps: &PairwiseComponents,
    params: &KernelParams,
) -> Array2<f64> {
    let n = comps.n_obs;
    let scale = params.kernel_scale;
    let d2 = comps.sq_distances(&params.inverse_squared_lengthscales);
    let mut cov = Array2::eye(n) * (scale + params.noise_var);
    for (p, ij) in comps.indices.outer_iter().enumerate() {
        let v = scale * kernel.value(d2[p]);
        cov[[ij[0], ij[1]]] = v;
        cov[[ij[1], ij[0]]] = v;
    }
    cov
}

/// Cholesky factor, `None` when the matrix is not numerically positive definite
fn try_cholesky(cov: &Array2<f64>) -> Option<Array2<f64>> {
    match cov.cholesky() {
        Ok(chol) if chol.iter().all(|v| v.is_finite()) => Some(chol),
        _ => None,
    }
}

/// Factorize the covariance adding an increasing jitter to its diagonal when needed.
/// `magnitude` scales [`JITTER_SEQUENCE`].
pub(crate) fn factorize(cov: &Array2<f64>, magnitude: f64) -> Result<CovarianceFactor> {
    let mut jitter = 0.;
    for (attempt, rel) in JITTER_SEQUENCE.iter().enumerate() {
        jitter = rel * magnitude;
        let chol = if jitter > 0. {
            let mut jittered = cov.to_owned();
            jittered.diag_mut().mapv_inplace(|v| v + jitter);
            try_cholesky(&jittered)
        } else {
            try_cholesky(cov)
        };
        if let Some(chol) = chol {
            return Ok(CovarianceFactor {
                chol,
                jitter,
                attempts: attempt + 1,
            });
        }
        log::debug!("Cholesky factorization failed with jitter {jitter:e}");
    }
    Err(GpError::LinearAlgebraFailure {
        attempts: JITTER_SEQUENCE.len(),
        jitter,
    })
}

/// Inverse of the covariance given its Cholesky factor
pub(crate) fn inverse_from_cholesky(chol: &Array2<f64>) -> Result<Array2<f64>> {
    let n = chol.nrows();
    let chol_inv = chol.solve_triangular(&Array2::eye(n), UPLO::Lower)?;
    Ok(chol_inv.t().dot(&chol_inv))
}

/// Negative log posterior `-(log_likelihood + log_prior)` and its gradient
/// with respect to the raw (log space) parameters
pub(crate) struct NegLogPosterior<'a, K: StationaryKernel, P: LogPrior> {
    pub kernel: &'a K,
    pub log_prior: &'a P,
    pub comps: &'a PairwiseComponents,
    pub y: &'a Array1<f64>,
    pub minimum_noise: f64,
    pub deterministic_objective: bool,
}

impl<'a, K: StationaryKernel, P: LogPrior> NegLogPosterior<'a, K, P> {
    fn dim(&self) -> usize {
        self.comps.d.ncols()
    }

    /// Value and gradient at raw parameters, `None` when the covariance can not be factorized
    pub fn value_grad(&self, raw: &[f64]) -> Option<(f64, Vec<f64>)> {
        let dim = self.dim();
        let params =
            KernelParams::from_raw(raw, dim, self.minimum_noise, self.deterministic_objective);
        if !params.is_valid() {
            return None;
        }
        let (lml, lml_grad) = log_marginal_likelihood(self.kernel, self.comps, &params, self.y)?;

        let prior = self.log_prior.log_density(&params);
        let prior_grad = self.log_prior.gradient(&params);

        let theta = &params.inverse_squared_lengthscales;
        let mut grad = Vec::with_capacity(raw.len());
        for i in 0..dim {
            grad.push(-(lml_grad[i] + prior_grad[i] * theta[i]));
        }
        grad.push(-(lml_grad[dim] + prior_grad[dim] * params.kernel_scale));
        if !self.deterministic_objective {
            let excess = params.noise_var - self.minimum_noise;
            grad.push(-(lml_grad[dim + 1] + prior_grad[dim + 1]) * excess);
        }
        let value = -(lml + prior);
        if value.is_finite() && grad.iter().all(|g| g.is_finite()) {
            Some((value, grad))
        } else {
            None
        }
    }
}

/// Log marginal likelihood of `y` and its gradient with respect to
/// (ln theta_1..d, ln scale, noise_var).
/// Returns `None` when the covariance is not positive definite.
pub(crate) fn log_marginal_likelihood<K: StationaryKernel>(
    kernel: &K,
    comps: &PairwiseComponents,
    params: &KernelParams,
    y: &ArrayBase<impl Data<Elem = f64>, Ix1>,
) -> Option<(f64, Array1<f64>)> {
    let n = comps.n_obs;
    let dim = comps.d.ncols();
    let scale = params.kernel_scale;
    let theta = &params.inverse_squared_lengthscales;

    let d2 = comps.sq_distances(theta);
    let valder: Vec<(f64, f64)> = d2.iter().map(|v| kernel.valder(*v)).collect();
    let mut cov = Array2::eye(n) * (scale + params.noise_var);
    for (p, ij) in comps.indices.outer_iter().enumerate() {
        let v = scale * valder[p].0;
        cov[[ij[0], ij[1]]] = v;
        cov[[ij[1], ij[0]]] = v;
    }

    let chol = try_cholesky(&cov)?;
    let cov_inv = inverse_from_cholesky(&chol).ok()?;
    let alpha = cov_inv.dot(y);

    let logdet = 2. * chol.diag().mapv(f64::ln).sum();
    let lml = -0.5 * y.dot(&alpha) - 0.5 * logdet - 0.5 * n as f64 * LOG_2PI;

    // dL/dp = 1/2 tr((alpha alpha^T - K^-1) dK/dp)
    let w_diag_sum: f64 = (0..n).map(|i| alpha[i] * alpha[i] - cov_inv[[i, i]]).sum();
    let mut w_pairs = Array1::zeros(d2.len());
    let mut scale_term = w_diag_sum;
    for (p, ij) in comps.indices.outer_iter().enumerate() {
        let w = alpha[ij[0]] * alpha[ij[1]] - cov_inv[[ij[0], ij[1]]];
        scale_term += 2. * w * valder[p].0;
        w_pairs[p] = w * scale * valder[p].1;
    }
    let mut grad = Array1::zeros(dim + 2);
    let theta_grad = comps.d.t().dot(&w_pairs) * theta;
    grad.slice_mut(ndarray::s![..dim]).assign(&theta_grad);
    grad[dim] = 0.5 * scale * scale_term;
    grad[dim + 1] = 0.5 * w_diag_sum;

    Some((lml, grad))
}

/// Count observations which can not be distinguished from a previous one
/// above the noise level, ie `scale * (1 - k(d2)) <= noise`
pub(crate) fn count_redundant<K: StationaryKernel>(
    kernel: &K,
    comps: &PairwiseComponents,
    params: &KernelParams,
) -> usize {
    let d2 = comps.sq_distances(&params.inverse_squared_lengthscales);
    let mut redundant = vec![false; comps.n_obs];
    for (p, ij) in comps.indices.outer_iter().enumerate() {
        if params.kernel_scale * (1. - kernel.value(d2[p])) <= params.noise_var {
            redundant[ij[1]] = true;
        }
    }
    redundant.iter().filter(|r| **r).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultLogPrior, Matern52Kernel, SquaredExponentialKernel};
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::array;

    fn training_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.1, 0.],
            [0.35, 1.],
            [0.5, 0.],
            [0.72, 2.],
            [0.9, 1.],
            [0.05, 2.]
        ];
        let y = array![0.3, -1.2, 0.8, 1.1, -0.4, -0.6];
        (x, y)
    }

    #[test]
    fn test_factorize_needs_no_jitter() {
        let cov = array![[2., 0.5], [0.5, 1.]];
        let factor = factorize(&cov, 1.).unwrap();
        assert_eq!(factor.attempts, 1);
        assert_abs_diff_eq!(factor.jitter, 0.);
        assert_abs_diff_eq!(factor.chol.dot(&factor.chol.t()), cov, epsilon = 1e-12);
    }

    #[test]
    fn test_factorize_escalates_jitter() {
        // singular matrix: duplicated rows
        let cov = array![[1., 1., 0.], [1., 1., 0.], [0., 0., 1.]];
        let factor = factorize(&cov, 1.).unwrap();
        assert!(factor.jitter > 0.);
        assert!(factor.attempts > 1);
    }

    #[test]
    fn test_factorize_fails() {
        let cov = array![[1., 0.], [0., -1.]];
        match factorize(&cov, 1.) {
            Err(GpError::LinearAlgebraFailure { attempts, .. }) => {
                assert_eq!(attempts, JITTER_SEQUENCE.len())
            }
            _ => panic!("factorization should fail"),
        }
    }

    #[test]
    fn test_inverse_from_cholesky() {
        let cov = array![[2., 0.5, 0.1], [0.5, 1., 0.2], [0.1, 0.2, 3.]];
        let factor = factorize(&cov, 1.).unwrap();
        let inv = inverse_from_cholesky(&factor.chol).unwrap();
        assert_abs_diff_eq!(inv.dot(&cov), Array2::eye(3), epsilon = 1e-10);
    }

    #[test]
    fn test_log_likelihood_gradient() {
        let (x, y) = training_data();
        let comps = PairwiseComponents::new(&x, &[false, true]);
        let kernel = Matern52Kernel();
        let min_noise = 1e-6;
        let lml = |raw: &Vec<f64>| {
            let params = KernelParams::from_raw(raw, 2, min_noise, false);
            log_marginal_likelihood(&kernel, &comps, &params, &y).unwrap().0
        };
        let raw = vec![0.7, -0.4, 0.2, -2.];
        let params = KernelParams::from_raw(&raw, 2, min_noise, false);
        let (_, grad) = log_marginal_likelihood(&kernel, &comps, &params, &y).unwrap();
        let fdiff = raw.central_diff(&lml);
        for i in 0..3 {
            assert_abs_diff_eq!(grad[i], fdiff[i], epsilon = 1e-5);
        }
        // noise gradient is given wrt noise_var
        let excess = params.noise_var - min_noise;
        assert_abs_diff_eq!(grad[3] * excess, fdiff[3], epsilon = 1e-5);
    }

    #[test]
    fn test_neg_log_posterior_gradient() {
        let (x, y) = training_data();
        let comps = PairwiseComponents::new(&x, &[false, true]);
        let kernel = SquaredExponentialKernel();
        for deterministic in [false, true] {
            let obj = NegLogPosterior {
                kernel: &kernel,
                log_prior: &DefaultLogPrior,
                comps: &comps,
                y: &y,
                minimum_noise: 1e-6,
                deterministic_objective: deterministic,
            };
            let raw = if deterministic {
                vec![1.2, 0.3, -0.5]
            } else {
                vec![1.2, 0.3, -0.5, -3.]
            };
            let (_, grad) = obj.value_grad(&raw).unwrap();
            let fdiff = raw.central_diff(&|r: &Vec<f64>| obj.value_grad(r).unwrap().0);
            for i in 0..raw.len() {
                assert_abs_diff_eq!(grad[i], fdiff[i], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_count_redundant() {
        let x = array![[0.], [0.], [0.5], [1e-9]];
        let comps = PairwiseComponents::new(&x, &[false]);
        let params = KernelParams::new(array![1.], 1., 1e-6);
        assert_eq!(2, count_redundant(&Matern52Kernel(), &comps, &params));
    }
}
