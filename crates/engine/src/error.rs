//! Error types for the reconciliation engine

use driftsync_core::SyncErrorInfo;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort an engine operation outright.
///
/// Per-item transfer failures never surface here; they are classified,
/// recorded in the journal and the report, and the run continues. A run
/// only fails as a whole when a root is unreachable before any transfer
/// begins, when it is cancelled mid-comparison, or when persisted state
/// cannot be read or written.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A sync root could not be reached during comparison
    #[error("root unreachable: {}", .info.message)]
    RootUnreachable { info: SyncErrorInfo },

    /// Comparison was cancelled before completing
    #[error("comparison cancelled")]
    Cancelled,

    /// Journal, index, or profile persistence failed
    #[error(transparent)]
    Store(#[from] driftsync_store::StoreError),

    /// Resume was requested but no journal exists for the pair
    #[error("no journal found for {local} <-> {remote}")]
    NoJournal { local: String, remote: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_core::ErrorKind;

    #[test]
    fn test_root_unreachable_display() {
        let err = EngineError::RootUnreachable {
            info: SyncErrorInfo::new(ErrorKind::PathNotFound, "no such dir", false, None),
        };
        assert!(err.to_string().contains("no such dir"));
    }

    #[test]
    fn test_no_journal_display() {
        let err = EngineError::NoJournal {
            local: "/l".to_string(),
            remote: "/r".to_string(),
        };
        assert!(err.to_string().contains("/l"));
        assert!(err.to_string().contains("/r"));
    }
}
