use ndarray::Array1;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A point of the normalized domain together with its acquisition score
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Candidate {
    /// Normalized point
    pub x: Array1<f64>,
    /// Acquisition score at `x`
    pub score: f64,
}
