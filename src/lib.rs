//! `gpbo` proposes the next point to evaluate when optimizing an expensive black-box
//! function, typically hyperparameters of a learning pipeline, over a mixed search space
//! of continuous, log scaled, integer and categorical dimensions.
//!
//! Given the history of evaluated points and their scores, the [`GpSampler`]:
//! * normalizes points within the unit hypercube (categorical values being kept as choice indices)
//!   and standardizes scores,
//! * fits a Gaussian process surrogate by maximum a posteriori estimation of its kernel
//!   parameters (see [`gpbo_gp`]),
//! * maximizes an acquisition function (LogEI by default) over the search space with a multi-start
//!   mixed local search (see [`gpbo_infill`]),
//! * maps the best candidate back in the raw domain.
//!
//! Scores are maximized. Numerical troubles which do not prevent a proposal are reported as
//! [`Diagnostic`] values within the returned [`Status`] and logged at warning level.
//!
//! # Example
//!
//! ```no_run
//! use gpbo::{Dimension, GpSampler, GpSamplerConfig, SearchSpace};
//! use ndarray::{array, Array1};
//!
//! let space = SearchSpace::new(vec![
//!     Dimension::log(1e-4, 1e-1),      // learning rate
//!     Dimension::int(1, 8),            // layers
//!     Dimension::categorical(3),       // optimizer choice
//! ])
//! .expect("valid search space");
//!
//! let mut params = array![[1e-3, 2., 0.], [1e-2, 4., 1.], [5e-2, 7., 2.]];
//! let mut scores = array![0.71, 0.78, 0.64];
//!
//! let mut sampler = GpSampler::new(GpSamplerConfig::default().seed(42));
//! for _ in 0..5 {
//!     let suggestion = sampler
//!         .suggest(&space, &params, &scores)
//!         .expect("suggestion")
//!         .into_value();
//!     // evaluate the black-box
//!     let score = 0.8 - (suggestion.params[0].log10() + 2.).powi(2);
//!     params.push_row(suggestion.params.view()).unwrap();
//!     scores = scores.into_iter().chain([score]).collect::<Array1<_>>();
//! }
//! println!("best: {}", scores.fold(f64::NEG_INFINITY, |a, &b| a.max(b)));
//! ```
//!
//! # Logging
//!
//! Set `GPBO_LOG` environment variable to `debug` to get detailed traces of the fit and
//! of the acquisition local searches.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod errors;
mod sampler;

pub use errors::*;
pub use sampler::*;

pub use gpbo_gp::{Diagnostic, KernelParams, Status};
pub use gpbo_infill::{
    AcquisitionKind, Candidate, Dimension, MixedOptimizerConfig, ScaleType, SearchSpace,
};
