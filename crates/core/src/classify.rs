// crates/core/src/classify.rs
//! Transfer error classification.
//!
//! Raw error text from a backend (FTP reply lines, OS error strings,
//! provider messages) is mapped onto the [`ErrorKind`] taxonomy together
//! with a `retryable` decision. Matching is ordered: more specific phrases
//! are checked before the broad network bucket.

use crate::types::{ErrorKind, SyncErrorInfo};

/// Classifies a raw transfer error message into a [`SyncErrorInfo`].
pub fn classify_transfer_error(raw_error: &str, file_path: Option<&str>) -> SyncErrorInfo {
    let msg = raw_error.to_lowercase();

    let (kind, retryable) = if contains_any(&msg, &["timed out", "timeout"]) {
        (ErrorKind::Timeout, true)
    } else if contains_any(&msg, &["rate limit", "too many requests", "429", "slow down"]) {
        (ErrorKind::RateLimit, true)
    } else if contains_any(&msg, &["quota", "insufficient storage", "552"]) {
        (ErrorKind::QuotaExceeded, false)
    } else if contains_any(&msg, &["no space left", "disk full", "read-only file system"]) {
        (ErrorKind::DiskError, false)
    } else if contains_any(
        &msg,
        &["locked", "in use", "being used by another process", "sharing violation"],
    ) {
        (ErrorKind::FileLocked, true)
    } else if contains_any(
        &msg,
        &["530", "login incorrect", "authentication", "auth failed", "unauthorized", "401", "password"],
    ) {
        (ErrorKind::Auth, false)
    } else if contains_any(
        &msg,
        &["permission denied", "access denied", "operation not permitted", "553", "403"],
    ) {
        (ErrorKind::PermissionDenied, false)
    } else if contains_any(
        &msg,
        &["no such file", "not found", "does not exist", "550"],
    ) {
        (ErrorKind::PathNotFound, false)
    } else if contains_any(
        &msg,
        &[
            "connection",
            "network",
            "broken pipe",
            "reset by peer",
            "refused",
            "unreachable",
            "host",
            "unexpected eof",
            "425",
        ],
    ) {
        (ErrorKind::Network, true)
    } else {
        (ErrorKind::Unknown, false)
    };

    SyncErrorInfo::new(kind, raw_error, retryable, file_path)
}

fn contains_any(msg: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| msg.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> (ErrorKind, bool) {
        let info = classify_transfer_error(raw, None);
        (info.kind, info.retryable)
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert_eq!(kind_of("connection timed out"), (ErrorKind::Timeout, true));
        assert_eq!(kind_of("read timeout after 30s"), (ErrorKind::Timeout, true));
    }

    #[test]
    fn test_network_errors_retryable() {
        assert_eq!(kind_of("connection reset by peer"), (ErrorKind::Network, true));
        assert_eq!(kind_of("broken pipe"), (ErrorKind::Network, true));
        assert_eq!(kind_of("425 can't open data connection"), (ErrorKind::Network, true));
    }

    #[test]
    fn test_auth_errors_not_retryable() {
        assert_eq!(kind_of("530 Login incorrect"), (ErrorKind::Auth, false));
        assert_eq!(kind_of("authentication failure"), (ErrorKind::Auth, false));
    }

    #[test]
    fn test_path_not_found() {
        assert_eq!(
            kind_of("550 No such file or directory"),
            (ErrorKind::PathNotFound, false)
        );
        assert_eq!(kind_of("remote path does not exist"), (ErrorKind::PathNotFound, false));
    }

    #[test]
    fn test_permission_denied() {
        assert_eq!(
            kind_of("Permission denied (os error 13)"),
            (ErrorKind::PermissionDenied, false)
        );
    }

    #[test]
    fn test_quota_and_disk() {
        assert_eq!(kind_of("552 storage quota exceeded"), (ErrorKind::QuotaExceeded, false));
        assert_eq!(kind_of("no space left on device"), (ErrorKind::DiskError, false));
    }

    #[test]
    fn test_rate_limit_retryable() {
        assert_eq!(kind_of("429 Too Many Requests"), (ErrorKind::RateLimit, true));
    }

    #[test]
    fn test_file_locked_retryable() {
        assert_eq!(
            kind_of("file is locked by another session"),
            (ErrorKind::FileLocked, true)
        );
    }

    #[test]
    fn test_unknown_fallback() {
        let info = classify_transfer_error("something odd happened", Some("a/b.txt"));
        assert_eq!(info.kind, ErrorKind::Unknown);
        assert!(!info.retryable);
        assert_eq!(info.file_path.as_deref(), Some("a/b.txt"));
        assert_eq!(info.message, "something odd happened");
    }
}
