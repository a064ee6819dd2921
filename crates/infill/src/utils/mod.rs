//! Numerical helpers: standard normal density and distribution, log expected improvement.

mod logei_helper;
mod misc;

pub use logei_helper::*;
pub use misc::*;
