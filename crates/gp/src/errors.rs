use thiserror::Error;

/// A result type for kernel fitting and posterior computations
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when fitting kernel parameters or building a [`Posterior`](crate::Posterior)
#[derive(Error, Debug)]
pub enum GpError {
    /// When the covariance matrix stays non positive definite whatever the jitter
    #[error("LinearAlgebraFailure: covariance not positive definite after {attempts} jitter attempts (last jitter {jitter:e})")]
    LinearAlgebraFailure {
        /// Number of factorization attempts
        attempts: usize,
        /// Last jitter magnitude added to the diagonal
        jitter: f64,
    },
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
