//! Prior densities over kernel parameters used as regularizer of the likelihood (MAP estimation).

use crate::parameters::KernelParams;
use finitediff::FiniteDiff;
use ndarray::Array1;

/// Default lower bound of the noise variance
pub const DEFAULT_MINIMUM_NOISE_VAR: f64 = 1e-6;

/// A trait for the log density of a prior over kernel parameters
///
/// Any `Fn(&KernelParams) -> f64` closure is a `LogPrior` whose gradient
/// is computed by finite differences.
pub trait LogPrior {
    /// Log density (up to a constant) of the given parameters
    fn log_density(&self, params: &KernelParams) -> f64;

    /// Gradient of the log density with respect to
    /// (theta_1..d, kernel_scale, noise_var)
    fn gradient(&self, params: &KernelParams) -> Array1<f64> {
        params
            .to_natural()
            .central_diff(&|v: &Array1<f64>| self.log_density(&KernelParams::from_natural(v)))
    }
}

impl<F> LogPrior for F
where
    F: Fn(&KernelParams) -> f64,
{
    fn log_density(&self, params: &KernelParams) -> f64 {
        self(params)
    }
}

/// Gamma log density with constant factor omitted
fn gamma_log_prior(x: f64, concentration: f64, rate: f64) -> f64 {
    (concentration - 1.) * x.ln() - rate * x
}

fn gamma_log_prior_deriv(x: f64, concentration: f64, rate: f64) -> f64 {
    (concentration - 1.) / x - rate
}

/// Weakly informative prior:
/// * `-(0.1 / theta + 0.1 theta)` on each inverse squared lengthscale,
/// * Gamma(2, 1) on the kernel scale,
/// * Gamma(1.1, 30) on the noise variance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultLogPrior;

impl LogPrior for DefaultLogPrior {
    fn log_density(&self, params: &KernelParams) -> f64 {
        -params
            .inverse_squared_lengthscales
            .mapv(|t| 0.1 / t + 0.1 * t)
            .sum()
            + gamma_log_prior(params.kernel_scale, 2., 1.)
            + gamma_log_prior(params.noise_var, 1.1, 30.)
    }

    fn gradient(&self, params: &KernelParams) -> Array1<f64> {
        let d = params.dim();
        let mut grad = Array1::zeros(d + 2);
        for (g, t) in grad
            .iter_mut()
            .zip(params.inverse_squared_lengthscales.iter())
        {
            *g = 0.1 / (t * t) - 0.1;
        }
        grad[d] = gamma_log_prior_deriv(params.kernel_scale, 2., 1.);
        grad[d + 1] = gamma_log_prior_deriv(params.noise_var, 1.1, 30.);
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_default_log_prior_value() {
        let params = KernelParams::new(array![1., 1.], 1., 1.);
        // -(0.2 + 0.2) + (0 - 1) + (0 - 30)
        assert_abs_diff_eq!(DefaultLogPrior.log_density(&params), -31.4, epsilon = 1e-12);
    }

    #[test]
    fn test_default_log_prior_gradient() {
        let params = KernelParams::new(array![0.3, 2.5], 1.7, 1e-2);
        let grad = DefaultLogPrior.gradient(&params);
        let fdiff = params
            .to_natural()
            .central_diff(&|v: &Array1<f64>| {
                DefaultLogPrior.log_density(&KernelParams::from_natural(v))
            });
        assert_abs_diff_eq!(grad, fdiff, epsilon = 1e-5);
    }

    #[test]
    fn test_closure_log_prior() {
        let flat = |_: &KernelParams| 0.;
        let params = KernelParams::new(array![0.3], 1., 0.1);
        assert_abs_diff_eq!(flat.log_density(&params), 0.);
        assert_abs_diff_eq!(flat.gradient(&params), array![0., 0., 0.], epsilon = 1e-12);

        let scale_only = |p: &KernelParams| -p.kernel_scale * p.kernel_scale;
        assert_abs_diff_eq!(
            scale_only.gradient(&params),
            array![0., -2., 0.],
            epsilon = 1e-6
        );
    }
}
