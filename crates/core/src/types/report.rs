// crates/core/src/types/report.rs
//! Error taxonomy and the per-run sync report

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category assigned to a transfer error at classification time
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Auth,
    PathNotFound,
    PermissionDenied,
    QuotaExceeded,
    RateLimit,
    Timeout,
    FileLocked,
    DiskError,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::PathNotFound => "path not found",
            Self::PermissionDenied => "permission denied",
            Self::QuotaExceeded => "quota exceeded",
            Self::RateLimit => "rate limit",
            Self::Timeout => "timeout",
            Self::FileLocked => "file locked",
            Self::DiskError => "disk error",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A classified transfer error.
///
/// `retryable` is decided by the classifier, not hardcoded per kind: the
/// same kind can be retryable in one context and terminal in another
/// (verify failures are reported as retryable `Unknown` errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub file_path: Option<String>,
}

impl SyncErrorInfo {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        retryable: bool,
        file_path: Option<&str>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            file_path: file_path.map(|p| p.to_string()),
        }
    }
}

/// Aggregate counters for one sync run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub uploaded: u32,
    pub downloaded: u32,
    pub skipped: u32,
    pub dirs_created: u32,
    pub verify_failed: u32,
    /// Total retry transitions across all entries
    pub retried: u32,
    pub total_bytes: u64,
    pub duration_ms: u64,
    pub errors: Vec<SyncErrorInfo>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a classified error against the report
    pub fn record_error(&mut self, error: SyncErrorInfo) {
        self.errors.push(error);
    }

    /// True when the run finished without any errors or verify failures
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.verify_failed == 0
    }

    /// Errors grouped by kind, for display
    pub fn errors_by_kind(&self) -> BTreeMap<ErrorKind, Vec<&SyncErrorInfo>> {
        let mut grouped: BTreeMap<ErrorKind, Vec<&SyncErrorInfo>> = BTreeMap::new();
        for error in &self.errors {
            grouped.entry(error.kind).or_default().push(error);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_starts_clean() {
        let report = SyncReport::new();
        assert!(report.is_clean());
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.total_bytes, 0);
    }

    #[test]
    fn test_record_error_breaks_clean() {
        let mut report = SyncReport::new();
        report.record_error(SyncErrorInfo::new(
            ErrorKind::Network,
            "connection reset",
            true,
            Some("docs/a.txt"),
        ));
        assert!(!report.is_clean());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_errors_grouped_by_kind() {
        let mut report = SyncReport::new();
        report.record_error(SyncErrorInfo::new(ErrorKind::Network, "reset", true, None));
        report.record_error(SyncErrorInfo::new(ErrorKind::Network, "refused", true, None));
        report.record_error(SyncErrorInfo::new(ErrorKind::Auth, "530 login", false, None));

        let grouped = report.errors_by_kind();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&ErrorKind::Network].len(), 2);
        assert_eq!(grouped[&ErrorKind::Auth].len(), 1);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::PathNotFound.to_string(), "path not found");
        assert_eq!(ErrorKind::RateLimit.to_string(), "rate limit");
    }
}
