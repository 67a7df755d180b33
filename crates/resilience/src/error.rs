//! Error types for resilience operations

use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur in resilience operations
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Operation timed out
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// All retry attempts exhausted
    #[error("all {attempts} attempts exhausted: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Operation was cancelled
    #[error("operation was cancelled")]
    Cancelled,
}
