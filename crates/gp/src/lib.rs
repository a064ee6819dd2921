//! This library implements the Gaussian process surrogate used to propose new candidates
//! in a sequential model-based optimization loop.
//!
//! Inputs are expected normalized, scores standardized (see [`StandardizedData`]).
//! Dimensions may be continuous or categorical: the stationary kernel is evaluated on a separable
//! squared distance
//! ```text
//! d2(x, x') = sum_{i continuous} theta_i (x_i - x'_i)^2 + sum_{i categorical} theta_i 1[x_i != x'_i]
//! ```
//! and the covariance reads `K = scale * kernel(d2) + noise * I`.
//!
//! Kernel parameters (inverse squared lengthscales `theta`, `scale` and `noise`) are fitted
//! by maximum a posteriori with [`KernelFitter`] (or the [`fit_kernel_params`] shortcut), the resulting
//! [`Posterior`] then gives predictive mean and variance together with their gradients.
//!
//! Numerical difficulties do not abort the computation unless there is no usable result:
//! they are reported as [`Diagnostic`] values carried by a [`Status`].
//!
//! Example:
//!
//! ```no_run
//! use gpbo_gp::{fit_kernel_params, DefaultLogPrior, Matern52Kernel, Posterior};
//! use ndarray::array;
//!
//! let x = array![[0.1], [0.3], [0.5], [0.9]];
//! let y = array![-0.8, 0.4, 1.1, -0.7];
//!
//! let params = fit_kernel_params(&x, &y, &[false], DefaultLogPrior, 1e-6, false)
//!     .expect("kernel fitted")
//!     .into_value();
//! let gp = Posterior::new(Matern52Kernel(), &params, &x, &y, &[false])
//!     .expect("posterior")
//!     .into_value();
//! let (mean, var) = gp.predict_valvar_single(&array![0.4]);
//! println!("mean={mean} var={var}");
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
mod errors;
pub mod kernels;
mod likelihood;
pub mod optimization;
mod parameters;
mod posterior;
mod prior;
mod status;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use kernels::*;
pub use likelihood::JITTER_SEQUENCE;
pub use parameters::*;
pub use posterior::*;
pub use prior::*;
pub use status::*;
pub use utils::{components, PairwiseComponents, StandardizedData};

/// Default maximum number of objective evaluations when fitting kernel parameters
pub const GP_FIT_MAX_EVAL: usize = 200;
