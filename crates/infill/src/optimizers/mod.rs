//! Acquisition function maximization over mixed search spaces
mod mixed;
mod start_points;

pub use mixed::*;
