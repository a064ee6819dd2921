//! Acquisition functions scoring candidate points from the GP posterior.
//!
//! Scores are oriented for maximization: the larger the score, the more promising
//! the point with regard to the best observed value.
mod ei;
mod ucb;

use crate::errors::{InfillError, Result};
use crate::search_space::SearchSpace;
use gpbo_gp::{Diagnostic, Posterior, Status, StationaryKernel};
use ndarray::{Array1, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floor applied to the posterior variance before taking its square root
pub const MIN_POSTERIOR_VARIANCE: f64 = 1e-20;

/// Supported acquisition functions
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum AcquisitionKind {
    /// Log of Expected Improvement, numerically stable far from promising regions
    #[default]
    LogEi,
    /// Expected Improvement
    Ei,
    /// Upper Confidence Bound `mean + sqrt(beta) * std`
    Ucb {
        /// Exploration weight, positive
        beta: f64,
    },
}

impl fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AcquisitionKind::LogEi => write!(f, "LogEI"),
            AcquisitionKind::Ei => write!(f, "EI"),
            AcquisitionKind::Ucb { beta } => write!(f, "UCB(beta={beta})"),
        }
    }
}

impl AcquisitionKind {
    fn value(&self, mean: f64, var: f64, best: f64) -> f64 {
        match self {
            AcquisitionKind::LogEi => ei::log_ei(mean, var, best),
            AcquisitionKind::Ei => ei::ei(mean, var, best),
            AcquisitionKind::Ucb { beta } => ucb::ucb(mean, var, *beta),
        }
    }

    fn valgrad(
        &self,
        mean: f64,
        var: f64,
        dmean: &Array1<f64>,
        dvar: &Array1<f64>,
        best: f64,
    ) -> (f64, Array1<f64>) {
        match self {
            AcquisitionKind::LogEi => ei::log_ei_valgrad(mean, var, dmean, dvar, best),
            AcquisitionKind::Ei => ei::ei_valgrad(mean, var, dmean, dvar, best),
            AcquisitionKind::Ucb { beta } => ucb::ucb_valgrad(mean, var, dmean, dvar, *beta),
        }
    }
}

/// Everything required to score candidates: the frozen GP posterior, the search space,
/// the acquisition kind and the best observed score.
#[derive(Clone, Debug)]
pub struct AcquisitionParams<K: StationaryKernel> {
    kind: AcquisitionKind,
    posterior: Posterior<K>,
    search_space: SearchSpace,
    best: f64,
    diagnostics: Vec<Diagnostic>,
}

impl<K: StationaryKernel> AcquisitionParams<K> {
    /// Bundle acquisition parameters. Diagnostics raised while building the posterior
    /// are retained and forwarded to the optimization result.
    pub fn new(
        kind: AcquisitionKind,
        posterior: Status<Posterior<K>>,
        search_space: SearchSpace,
    ) -> Result<Self> {
        let (posterior, diagnostics) = posterior.into_parts();
        if posterior.dim() != search_space.ndim() {
            return Err(InfillError::InvalidValue(format!(
                "Posterior dimension {} should match search space dimension {}",
                posterior.dim(),
                search_space.ndim()
            )));
        }
        if posterior.is_categorical() != search_space.is_categorical_mask().as_slice() {
            return Err(InfillError::InvalidValue(
                "Posterior categorical mask should match search space one".to_string(),
            ));
        }
        if let AcquisitionKind::Ucb { beta } = kind {
            if !(beta.is_finite() && beta >= 0.) {
                return Err(InfillError::InvalidValue(format!(
                    "UCB beta should be positive, got {beta}"
                )));
            }
        }
        let best = posterior
            .ytrain()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(AcquisitionParams {
            kind,
            posterior,
            search_space,
            best,
            diagnostics,
        })
    }

    /// Acquisition kind
    pub fn kind(&self) -> AcquisitionKind {
        self.kind
    }

    /// GP posterior
    pub fn posterior(&self) -> &Posterior<K> {
        &self.posterior
    }

    /// Search space
    pub fn search_space(&self) -> &SearchSpace {
        &self.search_space
    }

    /// Best observed score
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Diagnostics raised upstream
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Acquisition score at normalized point `x`
    pub fn value(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> f64 {
        let (mean, var) = self.posterior.predict_valvar_single(x);
        self.kind
            .value(mean, var.max(MIN_POSTERIOR_VARIANCE), self.best)
    }

    /// Acquisition scores at each row of `x`
    pub fn values(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix2>) -> Array1<f64> {
        x.map_axis(Axis(1), |row| self.value(&row))
    }

    /// Acquisition score and its gradient with regard to `x` at normalized point `x`.
    /// Gradient components along categorical dimensions are zero.
    pub fn evaluate(&self, x: &ArrayBase<impl Data<Elem = f64>, Ix1>) -> (f64, Array1<f64>) {
        let (mean, var, dmean, mut dvar) = self.posterior.predict_valvar_gradients_single(x);
        if var < MIN_POSTERIOR_VARIANCE {
            dvar.fill(0.);
        }
        self.kind.valgrad(
            mean,
            var.max(MIN_POSTERIOR_VARIANCE),
            &dmean,
            &dvar,
            self.best,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search_space::Dimension;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use gpbo_gp::{KernelParams, Matern52Kernel};
    use ndarray::{array, Array2};
    use paste::paste;

    fn acqf(kind: AcquisitionKind, noise: f64) -> AcquisitionParams<Matern52Kernel> {
        let space = SearchSpace::new(vec![
            Dimension::continuous(0., 1.),
            Dimension::categorical(3),
        ])
        .unwrap();
        let x: Array2<f64> = array![[0.1, 0.], [0.4, 1.], [0.5, 2.], [0.8, 0.], [0.95, 1.]];
        let y = x.map_axis(Axis(1), |r| (6. * r[0]).sin() + 0.3 * r[1]);
        let params = KernelParams::new(array![4., 0.5], 1., noise);
        let gp = Posterior::new(Matern52Kernel(), &params, &x, &y, &[false, true]).unwrap();
        AcquisitionParams::new(kind, gp, space).unwrap()
    }

    macro_rules! test_acqf_gradients {
        ($name:ident, $kind:expr) => {
            paste! {
                #[test]
                fn [<test_ $name _gradients>]() {
                    let acqf = acqf($kind, 1e-4);
                    for xv in [vec![0.3, 0.], vec![0.65, 1.], vec![0.02, 2.], vec![0.88, 2.]] {
                        let (value, grad) = acqf.evaluate(&Array1::from(xv.clone()));
                        assert_abs_diff_eq!(value, acqf.value(&Array1::from(xv.clone())), epsilon = 1e-12);
                        let fdiff = xv.central_diff(&|v: &Vec<f64>| acqf.value(&Array1::from(v.clone())));
                        let tol = 1e-4 * fdiff[0].abs().max(1.);
                        assert_abs_diff_eq!(grad[0], fdiff[0], epsilon = tol);
                        assert_abs_diff_eq!(grad[1], 0.);
                    }
                }
            }
        };
    }

    test_acqf_gradients!(log_ei, AcquisitionKind::LogEi);
    test_acqf_gradients!(ei, AcquisitionKind::Ei);
    test_acqf_gradients!(ucb, AcquisitionKind::Ucb { beta: 2. });

    #[test]
    fn test_log_ei_at_best_observed_point() {
        let acqf = acqf(AcquisitionKind::Ei, 1e-12);
        let ytrain = acqf.posterior().ytrain();
        let ibest = (0..ytrain.len())
            .max_by(|&i, &j| ytrain[i].total_cmp(&ytrain[j]))
            .unwrap();
        let xbest = acqf.posterior().xtrain().row(ibest).to_owned();
        assert_abs_diff_eq!(acqf.best(), ytrain[ibest]);
        assert!(acqf.value(&xbest) < 1e-4);

        let acqf = AcquisitionParams::new(
            AcquisitionKind::LogEi,
            Status::Ok(acqf.posterior().clone()),
            acqf.search_space().clone(),
        )
        .unwrap();
        assert!(acqf.value(&xbest) < -5.);
    }

    #[test]
    fn test_values_batch() {
        let acqf = acqf(AcquisitionKind::LogEi, 1e-4);
        let xs = Array2::from_shape_vec((3, 2), vec![0.2, 0., 0.5, 1., 0.7, 2.]).unwrap();
        let values = acqf.values(&xs);
        for (row, v) in xs.rows().into_iter().zip(values.iter()) {
            assert_abs_diff_eq!(*v, acqf.value(&row));
        }
    }

    #[test]
    fn test_invalid_acquisition_params() {
        let acqf = acqf(AcquisitionKind::LogEi, 1e-4);
        let gp = acqf.posterior().clone();
        let space1d = SearchSpace::new(vec![Dimension::continuous(0., 1.)]).unwrap();
        assert!(AcquisitionParams::new(AcquisitionKind::Ei, Status::Ok(gp.clone()), space1d).is_err());
        let continuous =
            SearchSpace::new(vec![Dimension::continuous(0., 1.), Dimension::continuous(0., 2.)])
                .unwrap();
        assert!(
            AcquisitionParams::new(AcquisitionKind::Ei, Status::Ok(gp.clone()), continuous).is_err()
        );
        assert!(AcquisitionParams::new(
            AcquisitionKind::Ucb { beta: -1. },
            Status::Ok(gp),
            acqf.search_space().clone()
        )
        .is_err());
    }

    #[test]
    fn test_display_kind() {
        assert_eq!("LogEI", AcquisitionKind::default().to_string());
        assert_eq!("UCB(beta=2)", AcquisitionKind::Ucb { beta: 2. }.to_string());
    }
}
