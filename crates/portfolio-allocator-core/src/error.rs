use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Covariance matrix is not positive semidefinite (pivot {index} = {pivot})")]
    NotPositiveSemidefinite { index: usize, pivot: Decimal },

    #[error("Singular system: {0}")]
    SingularSystem(String),

    #[error("Convergence failure: {solver} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        solver: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Optimization failed: {reason}")]
    OptimizationFailed { reason: String },

    #[error("Numerical fault: {0}")]
    NumericalFault(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AllocatorError {
    /// True for errors caused by the caller's request rather than the solve.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AllocatorError::InvalidInput { .. } | AllocatorError::InsufficientData(_)
        )
    }
}

impl From<serde_json::Error> for AllocatorError {
    fn from(e: serde_json::Error) -> Self {
        AllocatorError::SerializationError(e.to_string())
    }
}
