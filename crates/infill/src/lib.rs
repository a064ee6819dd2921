//! This library implements the proposal side of a Gaussian process based sequential
//! optimization: acquisition functions computed from a [`gpbo_gp::Posterior`] and their
//! maximization over mixed search spaces.
//!
//! A [`SearchSpace`] mixes continuous (linear or log scaled), stepped and categorical
//! dimensions. Points are handled in a normalized domain where continuous and stepped
//! coordinates lie in `[0, 1]` and categorical ones are integer codes.
//!
//! [`AcquisitionParams`] bundles the posterior, the search space and the
//! [`AcquisitionKind`] (LogEI by default, EI or UCB), then [`optimize_acqf_mixed`]
//! returns the best [`Candidate`] found by multi-start local searches alternating
//! gradient ascent and discrete coordinate-wise search.
//!
//! # Example
//!
//! ```no_run
//! use gpbo_gp::{fit_kernel_params, DefaultLogPrior, Matern52Kernel, Posterior};
//! use gpbo_infill::{
//!     optimize_acqf_mixed, AcquisitionKind, AcquisitionParams, Dimension,
//!     MixedOptimizerConfig, SearchSpace,
//! };
//! use ndarray::array;
//! use ndarray_rand::rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let space = SearchSpace::new(vec![Dimension::continuous(0., 1.), Dimension::categorical(2)])
//!     .expect("valid search space");
//! let x = array![[0.1, 0.], [0.4, 1.], [0.8, 0.], [0.6, 1.]];
//! let y = array![-1.2, 0.3, 0.9, -0.1];
//! let mask = space.is_categorical_mask();
//!
//! let (params, diagnostics) = fit_kernel_params(&x, &y, &mask, DefaultLogPrior, 1e-6, false)
//!     .expect("kernel fitted")
//!     .into_parts();
//! let gp = Posterior::new(Matern52Kernel(), &params, &x, &y, &mask)
//!     .expect("posterior")
//!     .with_upstream(diagnostics);
//! let acqf = AcquisitionParams::new(AcquisitionKind::LogEi, gp, space).expect("acquisition");
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let candidate = optimize_acqf_mixed(&acqf, &MixedOptimizerConfig::default(), &mut rng)
//!     .expect("candidate");
//! println!("{:?}", candidate.value());
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod criteria;
mod errors;
pub mod optimizers;
mod search_space;
mod types;
pub mod utils;

pub use criteria::{AcquisitionKind, AcquisitionParams};
pub use errors::*;
pub use optimizers::*;
pub use search_space::*;
pub use types::*;
