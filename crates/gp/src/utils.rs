use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A structure to store output values standardized to zero mean and unit variance
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct StandardizedData {
    /// standardized data
    pub data: Array1<f64>,
    /// mean computed from data
    pub mean: f64,
    /// standard deviation computed from data (1 when data is constant)
    pub std: f64,
}

impl StandardizedData {
    /// Constructor
    pub fn new(y: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> StandardizedData {
        let mean = y.mean().unwrap_or(0.);
        let std = y.std(0.);
        let std = if std > 0. && std.is_finite() { std } else { 1. };
        StandardizedData {
            data: y.mapv(|v| (v - mean) / std),
            mean,
            std,
        }
    }
}

/// Contribution of the i-th input dimension to the separable squared distance,
/// before scaling by the inverse squared lengthscale
#[inline]
pub fn component(a: f64, b: f64, is_categorical: bool) -> f64 {
    if is_categorical {
        if a == b {
            0.
        } else {
            1.
        }
    } else {
        (a - b) * (a - b)
    }
}

/// A structure to retain per dimension distance components between observations
/// used to compute covariance matrix and its derivatives
#[derive(Clone, Debug)]
pub struct PairwiseComponents {
    /// Components as (n_obs * (n_obs-1))/2, nx) array
    pub d: Array2<f64>,
    /// Indices of the pairs in the original data array
    pub indices: Array2<usize>,
    /// Number of observations
    pub n_obs: usize,
}

impl PairwiseComponents {
    /// Compute components given points given as an array (n_obs, nx) and the categorical mask
    pub fn new(x: &ArrayBase<impl Data<Elem = f64>, Ix2>, is_categorical: &[bool]) -> Self {
        let n_obs = x.nrows();
        let nx = x.ncols();
        let n_pairs = n_obs * n_obs.saturating_sub(1) / 2;
        let mut indices = Array2::<usize>::zeros((n_pairs, 2));
        let mut d = Array2::zeros((n_pairs, nx));
        let mut p = 0;
        for i in 0..n_obs {
            for j in (i + 1)..n_obs {
                indices[[p, 0]] = i;
                indices[[p, 1]] = j;
                for k in 0..nx {
                    d[[p, k]] = component(x[[i, k]], x[[j, k]], is_categorical[k]);
                }
                p += 1;
            }
        }
        PairwiseComponents { d, indices, n_obs }
    }

    /// Scaled squared distances for each pair given inverse squared lengthscales
    pub fn sq_distances(&self, theta: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> Array1<f64> {
        self.d.dot(theta)
    }
}

/// Computes per dimension components between x and each row of xtrain
/// resulting in a 2d array of shape (nrows(xtrain), ncols(xtrain))
/// *Panics* if x and xtrain have not the same number of components
pub fn components(
    x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    xtrain: &ArrayBase<impl Data<Elem = f64>, Ix2>,
    is_categorical: &[bool],
) -> Array2<f64> {
    assert!(x.len() == xtrain.ncols());
    let mut d = Array2::zeros(xtrain.raw_dim());
    for (mut row, xt) in d.outer_iter_mut().zip(xtrain.outer_iter()) {
        for k in 0..x.len() {
            row[k] = component(x[k], xt[k], is_categorical[k]);
        }
    }
    d
}

/// Computes differences between x and each row of xtrain
/// resulting in a 2d array of shape (nrows(xtrain), ncols(xtrain))
pub fn differences(
    x: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    xtrain: &ArrayBase<impl Data<Elem = f64>, Ix2>,
) -> Array2<f64> {
    assert!(x.len() == xtrain.ncols());
    let mut d = xtrain.to_owned();
    for mut row in d.outer_iter_mut() {
        row.zip_mut_with(x, |xt, xi| *xt = *xi - *xt);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_standardized_data() {
        let y = array![1., 2., 3., 4.];
        let ys = StandardizedData::new(&y);
        assert_abs_diff_eq!(ys.mean, 2.5);
        assert_abs_diff_eq!(ys.data.mean().unwrap(), 0., epsilon = 1e-12);
        assert_abs_diff_eq!(ys.data.std(0.), 1., epsilon = 1e-12);
    }

    #[test]
    fn test_standardized_constant_data() {
        let y = array![3., 3., 3.];
        let ys = StandardizedData::new(&y);
        assert_abs_diff_eq!(ys.std, 1.);
        assert_abs_diff_eq!(ys.data, array![0., 0., 0.]);
    }

    #[test]
    fn test_pairwise_components() {
        let xt = array![[0.5, 0.], [1.2, 1.], [2.0, 1.]];
        let comps = PairwiseComponents::new(&xt, &[false, true]);
        assert_eq!(array![[0, 1], [0, 2], [1, 2]], comps.indices);
        assert_abs_diff_eq!(
            array![[0.49, 1.], [2.25, 1.], [0.64, 0.]],
            comps.d,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            array![1.98, 5.5, 1.28],
            comps.sq_distances(&array![2., 1.]),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_components() {
        let x = array![0.5, 2.];
        let xt = array![[0.5, 0.], [1.5, 2.]];
        assert_abs_diff_eq!(
            array![[0., 1.], [1., 0.]],
            components(&x, &xt, &[false, true])
        );
        assert_abs_diff_eq!(array![[0., 2.], [-1., 0.]], differences(&x, &xt));
    }
}
