//! Error types for transfer backends

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by a transfer backend.
///
/// Variants mirror the engine's classification taxonomy where the backend
/// can tell the cause apart; everything else arrives as `Io` or `Other`
/// and is classified from its message.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("path not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("file locked: {0}")]
    Locked(String),

    #[error("disk error: {0}")]
    Disk(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Maps an I/O error on a known path into the closest typed variant
    pub fn from_io_for_path(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(format!("{}: {}", path, err))
            }
            _ => Self::Io(err),
        }
    }
}
