//! Mixed search space description: continuous (linear or log scaled), stepped and
//! categorical dimensions.
//!
//! Points handled by the surrogate and the acquisition optimizer live in a normalized
//! domain where every continuous or stepped coordinate belongs to `[0, 1]` while
//! categorical coordinates keep their integer code in `{0, ..., k-1}`.

use crate::errors::{InfillError, Result};
use egobox_doe::{Lhs, LhsKind, SamplingMethod};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// Scale of a dimension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum ScaleType {
    /// Continuous values, normalized linearly
    Linear,
    /// Continuous strictly positive values, normalized on their logarithm
    Log,
    /// Unordered choices encoded as integers `0..k`
    Categorical,
}

/// One dimension of the search space.
///
/// `step` is only meaningful for linear and log dimensions: `0` means continuous,
/// otherwise valid values are `low + m * step` for integer `m` (`high` being reachable
/// only if `high - low` is a multiple of `step`).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct Dimension {
    /// Scale type
    pub scale: ScaleType,
    /// Lower bound (or 0 for categorical)
    pub low: f64,
    /// Upper bound (or `k-1` for categorical)
    pub high: f64,
    /// Discretization step, 0 when continuous
    pub step: f64,
}

impl Dimension {
    /// Continuous dimension in `[low, high]`
    pub fn continuous(low: f64, high: f64) -> Self {
        Dimension {
            scale: ScaleType::Linear,
            low,
            high,
            step: 0.,
        }
    }

    /// Continuous dimension in `[low, high]` explored in log scale
    pub fn log(low: f64, high: f64) -> Self {
        Dimension {
            scale: ScaleType::Log,
            low,
            high,
            step: 0.,
        }
    }

    /// Discretized dimension with values `low + m * step` within `[low, high]`
    pub fn stepped(low: f64, high: f64, step: f64) -> Self {
        Dimension {
            scale: ScaleType::Linear,
            low,
            high,
            step,
        }
    }

    /// Integer dimension in `[low, high]`
    pub fn int(low: i64, high: i64) -> Self {
        Self::stepped(low as f64, high as f64, 1.)
    }

    /// Categorical dimension with `n_choices` choices
    pub fn categorical(n_choices: usize) -> Self {
        Dimension {
            scale: ScaleType::Categorical,
            low: 0.,
            high: n_choices as f64 - 1.,
            step: 0.,
        }
    }

    /// Whether the dimension is categorical
    pub fn is_categorical(&self) -> bool {
        self.scale == ScaleType::Categorical
    }

    /// Whether the dimension is discretized on a grid (categorical excluded)
    pub fn is_stepped(&self) -> bool {
        !self.is_categorical() && self.step > 0.
    }

    fn check(&self, index: usize) -> Result<()> {
        let invalid =
            |msg: String| Err(InfillError::InvalidSearchSpace(format!("dimension {index}: {msg}")));
        if !(self.low.is_finite() && self.high.is_finite() && self.step.is_finite()) {
            return invalid(format!(
                "bounds and step should be finite, got [{}, {}] step {}",
                self.low, self.high, self.step
            ));
        }
        if self.low > self.high {
            return invalid(format!("low {} > high {}", self.low, self.high));
        }
        if self.step < 0. {
            return invalid(format!("negative step {}", self.step));
        }
        match self.scale {
            ScaleType::Categorical => {
                if self.low != 0. || self.high.fract() != 0. {
                    return invalid(format!(
                        "categorical bounds should be [0, k-1] integers, got [{}, {}]",
                        self.low, self.high
                    ));
                }
            }
            ScaleType::Log => {
                if self.low - 0.5 * self.step <= 0. {
                    return invalid(format!(
                        "log scale requires strictly positive values (widened by half a step), got low={} step={}",
                        self.low, self.step
                    ));
                }
            }
            ScaleType::Linear => (),
        }
        Ok(())
    }

    /// Bounds of the transformed domain (log applied) widened by half a step
    fn transformed_bounds(&self) -> (f64, f64) {
        let (lo, hi) = (self.low - 0.5 * self.step, self.high + 0.5 * self.step);
        match self.scale {
            ScaleType::Log => (lo.ln(), hi.ln()),
            _ => (lo, hi),
        }
    }

    fn normalize_one(&self, value: f64) -> f64 {
        if self.is_categorical() {
            return value;
        }
        let (lo, hi) = self.transformed_bounds();
        if lo == hi {
            return 0.5;
        }
        let value = match self.scale {
            ScaleType::Log => value.ln(),
            _ => value,
        };
        (value - lo) / (hi - lo)
    }

    fn unnormalize_one(&self, value: f64) -> f64 {
        if self.is_categorical() {
            return value;
        }
        let (lo, hi) = self.transformed_bounds();
        let value = value * (hi - lo) + lo;
        match self.scale {
            ScaleType::Log => value.exp(),
            _ => value,
        }
    }

    /// Snap a raw value onto the step grid, clipped within bounds
    fn snap(&self, value: f64) -> f64 {
        if self.step > 0. {
            let last = self.low + self.n_steps() as f64 * self.step;
            (((value - self.low + 0.5 * self.step) / self.step).floor() * self.step + self.low)
                .clamp(self.low, last)
        } else {
            value.clamp(self.low, self.high)
        }
    }

    fn n_steps(&self) -> usize {
        ((self.high - self.low) / self.step + 1e-9).floor() as usize
    }
}

/// An immutable ordered sequence of validated dimensions
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct SearchSpace {
    dims: Vec<Dimension>,
}

impl SearchSpace {
    /// Build a search space, fails with [`InfillError::InvalidSearchSpace`]
    /// when a dimension is malformed.
    pub fn new(dims: Vec<Dimension>) -> Result<Self> {
        if dims.is_empty() {
            return Err(InfillError::InvalidSearchSpace(
                "at least one dimension is required".to_string(),
            ));
        }
        for (i, dim) in dims.iter().enumerate() {
            dim.check(i)?;
        }
        Ok(SearchSpace { dims })
    }

    /// Dimensions
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Categorical mask of dimensions
    pub fn is_categorical_mask(&self) -> Vec<bool> {
        self.dims.iter().map(|d| d.is_categorical()).collect()
    }

    /// Indices of continuous and stepped dimensions
    pub fn continuous_indices(&self) -> Vec<usize> {
        self.dims
            .iter()
            .enumerate()
            .filter_map(|(i, d)| (!d.is_categorical()).then_some(i))
            .collect()
    }

    /// Number of choices of the i-th dimension if categorical
    pub fn n_choices(&self, i: usize) -> Option<usize> {
        let dim = &self.dims[i];
        dim.is_categorical().then(|| dim.high as usize + 1)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.ndim() {
            return Err(InfillError::InvalidValue(format!(
                "point dimension {} should match search space dimension {}",
                len,
                self.ndim()
            )));
        }
        Ok(())
    }

    /// Map a raw point into the normalized domain
    pub fn normalize(&self, raw: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Result<Array1<f64>> {
        self.check_len(raw.len())?;
        let mut x = Array1::zeros(raw.len());
        for (i, (dim, v)) in self.dims.iter().zip(raw.iter()).enumerate() {
            if !v.is_finite() {
                return Err(InfillError::InvalidValue(format!(
                    "non finite value {v} for dimension {i}"
                )));
            }
            if dim.is_categorical() && (v.fract() != 0. || *v < 0. || *v > dim.high) {
                return Err(InfillError::InvalidValue(format!(
                    "categorical code {v} of dimension {i} should be an integer in [0, {}]",
                    dim.high
                )));
            }
            if dim.scale == ScaleType::Log && *v <= 0. {
                return Err(InfillError::InvalidValue(format!(
                    "log scaled dimension {i} expects positive values, got {v}"
                )));
            }
            x[i] = dim.normalize_one(*v);
        }
        Ok(x)
    }

    /// Map a normalized point back to the raw domain. Stepped values are snapped
    /// onto their grid and every value is clipped within its bounds.
    pub fn denormalize(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Result<Array1<f64>> {
        self.check_len(x.len())?;
        Ok(self
            .dims
            .iter()
            .zip(x.iter())
            .map(|(dim, v)| {
                if dim.is_categorical() {
                    v.round().clamp(0., dim.high)
                } else {
                    dim.snap(dim.unnormalize_one(*v))
                }
            })
            .collect())
    }

    /// Whether the normalized point lies in the domain
    pub fn contains(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> bool {
        x.len() == self.ndim()
            && self.dims.iter().zip(x.iter()).all(|(dim, v)| {
                if dim.is_categorical() {
                    v.fract() == 0. && *v >= 0. && *v <= dim.high
                } else {
                    (0. ..=1.).contains(v)
                }
            })
    }

    /// Snap normalized stepped coordinates onto their grid, clip continuous ones
    /// within `[0, 1]` and round categorical codes.
    pub fn round_to_grid(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        self.dims
            .iter()
            .zip(x.iter())
            .map(|(dim, v)| self.round_one(dim, *v))
            .collect()
    }

    fn round_one(&self, dim: &Dimension, v: f64) -> f64 {
        if dim.is_categorical() {
            v.round().clamp(0., dim.high)
        } else if dim.is_stepped() {
            dim.normalize_one(dim.snap(dim.unnormalize_one(v)))
        } else {
            v.clamp(0., 1.)
        }
    }

    /// Normalized values of the grid neighbours (one step below and above) of
    /// the normalized value `v` of the i-th dimension, empty if not stepped
    pub fn grid_neighbours(&self, i: usize, v: f64) -> Vec<f64> {
        let dim = &self.dims[i];
        if !dim.is_stepped() {
            return vec![];
        }
        let raw = dim.snap(dim.unnormalize_one(v));
        [raw - dim.step, raw + dim.step]
            .into_iter()
            .filter(|r| *r >= dim.low && *r <= dim.high + 1e-9 * dim.step)
            .map(|r| dim.normalize_one(dim.snap(r)))
            .collect()
    }

    /// Draw `n` points of the normalized domain: latin hypercube sampling for
    /// continuous and stepped dimensions (the latter snapped onto their grid),
    /// uniform codes for categorical dimensions.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Array2<f64> {
        let unit = Array2::from_shape_fn((self.ndim(), 2), |(_, j)| j as f64);
        let mut doe = Lhs::new_with_rng(&unit, Xoshiro256Plus::seed_from_u64(rng.gen()))
            .kind(LhsKind::Classic)
            .sample(n);
        for (i, dim) in self.dims.iter().enumerate() {
            let mut col = doe.column_mut(i);
            if dim.is_categorical() {
                let k = dim.high as usize + 1;
                col.iter_mut()
                    .for_each(|v| *v = rng.gen_range(0..k) as f64);
            } else if dim.is_stepped() {
                col.mapv_inplace(|v| self.round_one(dim, v));
            }
        }
        doe
    }
}
