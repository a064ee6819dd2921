//! Facade over bounded local optimizers used for kernel fitting and acquisition maximization.

use ndarray::{arr1, Array1, Array2, ArrayView1};

/// Objective function signature: `f(x, gradient, user_data)`, gradient being requested
/// only by gradient-based algorithms.
pub trait ObjFn<U>: Fn(&[f64], Option<&mut [f64]>, &mut U) -> f64 {}
impl<T, U> ObjFn<U> for T where T: Fn(&[f64], Option<&mut [f64]>, &mut U) -> f64 {}

type NoCstr = fn(&[f64], Option<&mut [f64]>, &mut ()) -> f64;
type NoCstrNoGrad = fn(&[f64], &mut ()) -> f64;

/// Available local optimization algorithms
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// Derivative free
    Cobyla,
    /// Gradient based
    Slsqp,
}

/// Default max number of objective evaluations
pub const OPTIM_MAX_EVAL_DEFAULT: usize = 200;

/// Facade for bound constrained minimization
pub struct Optimizer<'a> {
    algo: Algorithm,
    fun: &'a dyn ObjFn<()>,
    bounds: Array2<f64>,
    max_eval: usize,
    xinit: Option<Array1<f64>>,
    ftol_rel: Option<f64>,
}

impl<'a> Optimizer<'a> {
    /// Constructor given the algorithm, the function to minimize and
    /// bounds as a (nx, 2) array of (lower, upper)
    pub fn new(algo: Algorithm, fun: &'a dyn ObjFn<()>, bounds: &Array2<f64>) -> Self {
        Optimizer {
            algo,
            fun,
            bounds: bounds.clone(),
            max_eval: OPTIM_MAX_EVAL_DEFAULT,
            xinit: None,
            ftol_rel: None,
        }
    }

    /// Set relative tolerance on function value
    pub fn ftol_rel(&mut self, ftol_rel: f64) -> &mut Self {
        self.ftol_rel = Some(ftol_rel);
        self
    }

    /// Set max number of function evaluations
    pub fn max_eval(&mut self, max_eval: usize) -> &mut Self {
        self.max_eval = max_eval;
        self
    }

    /// Set starting point (bounds middle otherwise)
    pub fn xinit(&mut self, xinit: &ArrayView1<f64>) -> &mut Self {
        self.xinit = Some(xinit.to_owned());
        self
    }

    /// Minimize the function, returns (f_opt, x_opt) with `f_opt` set to
    /// infinity when the algorithm fails
    pub fn minimize(&self) -> (f64, Array1<f64>) {
        let xinit = self
            .xinit
            .clone()
            .unwrap_or_else(|| self.bounds.mean_axis(ndarray::Axis(1)).unwrap_or_default())
            .to_vec();
        let bounds: Vec<_> = self
            .bounds
            .outer_iter()
            .map(|row| (row[0], row[1]))
            .collect();
        let res = match self.algo {
            Algorithm::Cobyla => {
                let cstrs: Vec<NoCstrNoGrad> = vec![];
                let res = cobyla::minimize(
                    |x: &[f64], u: &mut ()| (self.fun)(x, None, u),
                    &xinit,
                    &bounds,
                    &cstrs,
                    (),
                    self.max_eval,
                    cobyla::RhoBeg::All(0.5),
                    Some(cobyla::StopTols {
                        ftol_rel: self.ftol_rel.unwrap_or(0.0),
                        ..cobyla::StopTols::default()
                    }),
                );
                match res {
                    Ok((_, x_opt, y_opt)) => (y_opt, arr1(&x_opt)),
                    Err((status, x_opt, _)) => {
                        log::debug!("Cobyla optimizer failed status={status:?}");
                        (f64::INFINITY, arr1(&x_opt))
                    }
                }
            }
            Algorithm::Slsqp => {
                let cstrs: Vec<NoCstr> = vec![];
                let res = slsqp::minimize(
                    |x: &[f64], g: Option<&mut [f64]>, u: &mut ()| (self.fun)(x, g, u),
                    &xinit,
                    &bounds,
                    &cstrs,
                    (),
                    self.max_eval,
                    Some(slsqp::StopTols {
                        ftol_rel: self.ftol_rel.unwrap_or(0.0),
                        ..slsqp::StopTols::default()
                    }),
                );
                match res {
                    Ok((_, x_opt, y_opt)) => (y_opt, arr1(&x_opt)),
                    Err((status, x_opt, _)) => {
                        log::debug!("Slsqp optimizer failed status={status:?}");
                        (f64::INFINITY, arr1(&x_opt))
                    }
                }
            }
        };
        if res.0.is_nan() {
            (f64::INFINITY, res.1)
        } else {
            res
        }
    }
}
