use thiserror::Error;

/// A result type for acquisition computations
pub type Result<T> = std::result::Result<T, InfillError>;

/// An error for acquisition function evaluation and optimization
#[derive(Error, Debug)]
pub enum InfillError {
    /// When search space description is malformed
    #[error("InvalidSearchSpace: {0}")]
    InvalidSearchSpace(String),
    /// When optimizer configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When kernel fitting or posterior computation fails
    #[error(transparent)]
    GpError(#[from] gpbo_gp::GpError),
    /// When an invalid value is encountered
    #[error("Value error: {0}")]
    InvalidValue(String),
}
