use thiserror::Error;

/// A result type for candidate proposal
pub type Result<T> = std::result::Result<T, GpboError>;

/// An error when proposing a candidate
#[derive(Error, Debug)]
pub enum GpboError {
    /// When kernel fitting or posterior computation fails
    #[error(transparent)]
    GpError(#[from] gpbo_gp::GpError),
    /// When search space, acquisition or its optimization is invalid
    #[error(transparent)]
    InfillError(#[from] gpbo_infill::InfillError),
    /// When observation history is invalid
    #[error("Value error: {0}")]
    InvalidValue(String),
}
