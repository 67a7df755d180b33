//! Error types for the core data model

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced while parsing core value types
#[derive(Debug, Error)]
pub enum CoreError {
    /// String did not name a known sync direction
    #[error("unknown sync direction: {0}")]
    UnknownDirection(String),

    /// String did not name a known verify policy
    #[error("unknown verify policy: {0}")]
    UnknownVerifyPolicy(String),
}
