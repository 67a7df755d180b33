//! Error types for persistent state

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur reading or writing persisted sync state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("cannot determine a data directory for this platform")]
    NoDataDir,

    #[error("signing key must be at least {0} bytes")]
    SigningKeyTooShort(usize),

    #[error("no journal found for this path pair")]
    JournalNotFound,
}
