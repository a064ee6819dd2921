//! Outcome of a computation which may have degraded gracefully.
//!
//! Numerical trouble that does not prevent a usable result (jitter added to a
//! covariance, flat acquisition surface, exhausted iteration budget...) is not an
//! error: the value is returned as [`Status::DegradedOk`] together with the
//! [`Diagnostic`]s describing what happened. Unrecoverable failures are reported
//! through the `Err` variant of the crate `Result`.

use std::fmt;

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A numerical event worth reporting to the caller
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub enum Diagnostic {
    /// Covariance factorization only succeeded after adding `jitter` to its diagonal
    JitterEscalated {
        /// Jitter finally added to the diagonal (folded into the noise variance)
        jitter: f64,
        /// Number of factorization attempts
        attempts: usize,
    },
    /// Some observations can not be distinguished from others above the noise level
    NearSingularCovariance {
        /// Number of observations redundant with a previous one
        redundant: usize,
    },
    /// Hyperparameters optimization failed, default kernel parameters are used
    KernelFitFallback {
        /// Reason of the failure
        reason: String,
    },
    /// Acquisition values are so peaked that fewer local searches are run
    ConvergedAcquisition {
        /// Number of local searches actually run
        n_local_search: usize,
    },
    /// The best candidate could not be improved from its starting point
    FlatAcquisition {
        /// Acquisition score of the returned candidate
        score: f64,
    },
    /// Local search alternation stopped on its iteration budget
    LocalSearchNotConverged {
        /// Iteration budget
        max_iter: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::JitterEscalated { jitter, attempts } => write!(
                f,
                "Covariance factorization required jitter {jitter:e} ({attempts} attempts)"
            ),
            Diagnostic::NearSingularCovariance { redundant } => write!(
                f,
                "Covariance near singular: {redundant} observation(s) indistinguishable above noise level"
            ),
            Diagnostic::KernelFitFallback { reason } => write!(
                f,
                "Kernel parameters optimization failed ({reason}), default kernel parameters used instead"
            ),
            Diagnostic::ConvergedAcquisition { n_local_search } => write!(
                f,
                "Acquisition already converged, number of local searches reduced to {n_local_search}"
            ),
            Diagnostic::FlatAcquisition { score } => write!(
                f,
                "Acquisition optimization converged immediately (score={score}), no improvement found"
            ),
            Diagnostic::LocalSearchNotConverged { max_iter } => {
                write!(f, "Local search did not converge within {max_iter} iterations")
            }
        }
    }
}

impl Diagnostic {
    /// Log the diagnostic at warning level and give it back
    pub fn emit(self) -> Self {
        log::warn!("{self}");
        self
    }
}

/// A successful result, possibly degraded
#[derive(Clone, Debug, PartialEq)]
pub enum Status<T> {
    /// Clean result
    Ok(T),
    /// Usable result obtained through numerical degradation
    DegradedOk(T, Vec<Diagnostic>),
}

impl<T> Status<T> {
    /// Build a status from a value and the diagnostics gathered while computing it
    pub fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            Status::Ok(value)
        } else {
            Status::DegradedOk(value, diagnostics)
        }
    }

    /// The carried value
    pub fn value(&self) -> &T {
        match self {
            Status::Ok(v) | Status::DegradedOk(v, _) => v,
        }
    }

    /// Take the carried value, dropping diagnostics
    pub fn into_value(self) -> T {
        match self {
            Status::Ok(v) | Status::DegradedOk(v, _) => v,
        }
    }

    /// Split into value and diagnostics (empty when clean)
    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        match self {
            Status::Ok(v) => (v, vec![]),
            Status::DegradedOk(v, d) => (v, d),
        }
    }

    /// Diagnostics raised while computing the value
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Status::Ok(_) => &[],
            Status::DegradedOk(_, d) => d,
        }
    }

    /// Whether the value was obtained through degradation
    pub fn is_degraded(&self) -> bool {
        matches!(self, Status::DegradedOk(_, _))
    }

    /// Map the carried value keeping diagnostics
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Status<U> {
        let (v, d) = self.into_parts();
        Status::new(f(v), d)
    }

    /// Prepend diagnostics raised upstream of this computation
    pub fn with_upstream(self, mut upstream: Vec<Diagnostic>) -> Self {
        let (v, d) = self.into_parts();
        upstream.extend(d);
        Status::new(v, upstream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_new() {
        let s = Status::new(1., vec![]);
        assert_eq!(s, Status::Ok(1.));
        assert!(!s.is_degraded());

        let s = Status::new(1., vec![Diagnostic::FlatAcquisition { score: 0. }]);
        assert!(s.is_degraded());
        assert_eq!(s.diagnostics().len(), 1);
    }

    #[test]
    fn test_status_upstream() {
        let s = Status::Ok(2)
            .with_upstream(vec![Diagnostic::NearSingularCovariance { redundant: 3 }])
            .map(|v| v * 2);
        assert_eq!(*s.value(), 4);
        assert_eq!(
            s.diagnostics(),
            &[Diagnostic::NearSingularCovariance { redundant: 3 }]
        );
    }
}
