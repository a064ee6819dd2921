//! A module for stationary kernels used to model the covariance of the GP.
//!
//! Kernels are functions of a separable scaled squared distance
//!
//! ```text
//! d2(x, x') = sum_cont theta_i (x_i - x'_i)^2 + sum_cat theta_i [x_i != x'_i]
//! ```
//!
//! where `theta` are inverse squared lengthscales. The categorical term is a Hamming
//! distance which is a squared euclidean distance of one-hot encodings, hence any
//! kernel positive definite on euclidean distances remains so on mixed inputs.
//!
//! The following kernels are implemented:
//! * matern 5/2 (default),
//! * squared exponential.

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trait for a stationary kernel k(d2) with k(0) = 1
pub trait StationaryKernel: Clone + Copy + Default + fmt::Display + Sync {
    /// Correlation given the scaled squared distance `d2`
    fn value(&self, d2: f64) -> f64;

    /// Derivative of the correlation with respect to `d2`
    fn d2_derivative(&self, d2: f64) -> f64;

    /// Compute both correlation value and its derivative with respect to `d2`
    fn valder(&self, d2: f64) -> (f64, f64) {
        (self.value(d2), self.d2_derivative(d2))
    }
}

/// Matern 5/2 kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct Matern52Kernel();

impl From<Matern52Kernel> for String {
    fn from(_item: Matern52Kernel) -> String {
        "Matern52".to_string()
    }
}

impl TryFrom<String> for Matern52Kernel {
    type Error = &'static str;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "Matern52" {
            Ok(Self::default())
        } else {
            Err("Bad string value for Matern52Kernel, should be \'Matern52\'")
        }
    }
}

impl StationaryKernel for Matern52Kernel {
    /// (1 + r + r^2/3) exp(-r) with r = sqrt(5 d2)
    fn value(&self, d2: f64) -> f64 {
        let r = (5. * d2).sqrt();
        (1. + r + 5. / 3. * d2) * (-r).exp()
    }

    /// -5/6 (1 + r) exp(-r), smooth at d2 = 0
    fn d2_derivative(&self, d2: f64) -> f64 {
        let r = (5. * d2).sqrt();
        -5. / 6. * (1. + r) * (-r).exp()
    }

    fn valder(&self, d2: f64) -> (f64, f64) {
        let r = (5. * d2).sqrt();
        let exp_r = (-r).exp();
        (
            (1. + r + 5. / 3. * d2) * exp_r,
            -5. / 6. * (1. + r) * exp_r,
        )
    }
}

impl fmt::Display for Matern52Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

/// Squared exponential kernel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(into = "String"),
    serde(try_from = "String")
)]
pub struct SquaredExponentialKernel();

impl From<SquaredExponentialKernel> for String {
    fn from(_item: SquaredExponentialKernel) -> String {
        "SquaredExponential".to_string()
    }
}

impl TryFrom<String> for SquaredExponentialKernel {
    type Error = &'static str;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "SquaredExponential" {
            Ok(Self::default())
        } else {
            Err("Bad string value for SquaredExponentialKernel, should be \'SquaredExponential\'")
        }
    }
}

impl StationaryKernel for SquaredExponentialKernel {
    /// exp(-d2 / 2)
    fn value(&self, d2: f64) -> f64 {
        (-0.5 * d2).exp()
    }

    fn d2_derivative(&self, d2: f64) -> f64 {
        -0.5 * (-0.5 * d2).exp()
    }
}

impl fmt::Display for SquaredExponentialKernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::PairwiseComponents;
    use approx::assert_abs_diff_eq;
    use linfa_linalg::cholesky::*;
    use ndarray::{array, Array2};
    use paste::paste;

    macro_rules! test_kernel {
        ($kernel:ident) => {
            paste! {
                #[test]
                fn [<test_ $kernel:snake _at_zero>]() {
                    let k = [<$kernel Kernel>]::default();
                    assert_abs_diff_eq!(k.value(0.), 1.);
                    assert!(k.d2_derivative(0.) < 0.);
                }

                #[test]
                fn [<test_ $kernel:snake _derivative>]() {
                    let k = [<$kernel Kernel>]::default();
                    let h = 1e-6;
                    for d2 in [1e-3, 0.1, 0.5, 1., 3., 10.] {
                        let fdiff = (k.value(d2 + h) - k.value(d2 - h)) / (2. * h);
                        assert_abs_diff_eq!(k.d2_derivative(d2), fdiff, epsilon = 1e-6);
                        let (v, dv) = k.valder(d2);
                        assert_abs_diff_eq!(v, k.value(d2), epsilon = 1e-12);
                        assert_abs_diff_eq!(dv, k.d2_derivative(d2), epsilon = 1e-12);
                    }
                }

                #[test]
                fn [<test_ $kernel:snake _mixed_positive_definite>]() {
                    let k = [<$kernel Kernel>]::default();
                    // continuous, categorical, continuous columns
                    let x = array![
                        [0.1, 0., 0.3],
                        [0.4, 1., 0.9],
                        [0.7, 2., 0.2],
                        [0.2, 1., 0.5],
                        [0.9, 0., 0.8],
                        [0.5, 2., 0.1]
                    ];
                    let comps = PairwiseComponents::new(&x, &[false, true, false]);
                    let d2 = comps.sq_distances(&array![2., 0.5, 3.]);
                    let mut r = Array2::<f64>::eye(x.nrows());
                    for (p, ij) in comps.indices.outer_iter().enumerate() {
                        let v = k.value(d2[p]);
                        r[[ij[0], ij[1]]] = v;
                        r[[ij[1], ij[0]]] = v;
                    }
                    assert!(r.cholesky().is_ok());
                }
            }
        };
    }

    test_kernel!(Matern52);
    test_kernel!(SquaredExponential);

    #[test]
    fn test_kernel_display() {
        assert_eq!("Matern52", Matern52Kernel().to_string());
        assert_eq!("SquaredExponential", SquaredExponentialKernel().to_string());
    }

    #[test]
    fn test_kernel_from_string() {
        assert!(Matern52Kernel::try_from("Matern52".to_string()).is_ok());
        assert!(Matern52Kernel::try_from("Matern32".to_string()).is_err());
    }
}
