// crates/core/src/types/comparison.rs
//! Per-path comparison records and sync direction

use crate::error::CoreError;
use crate::types::file::FileInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tolerance for timestamp comparison (seconds).
/// Accounts for filesystem and timezone granularity differences.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 2;

/// Returns true when both timestamps are present and within tolerance.
pub fn timestamps_equal(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.signed_duration_since(b).num_seconds().abs() <= TIMESTAMP_TOLERANCE_SECS
        }
        _ => false,
    }
}

/// Outcome of comparing a single relative path across both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// All enabled criteria agree
    Identical,
    /// Local file is newer, should upload
    LocalNewer,
    /// Remote file is newer, should download
    RemoteNewer,
    /// Exists only locally
    LocalOnly,
    /// Exists only remotely
    RemoteOnly,
    /// Both sides diverged and no side can be declared newer
    Conflict,
    /// Sizes disagree but timestamps cannot arbitrate
    SizeMismatch,
}

impl SyncStatus {
    /// True for statuses the executor can act on without a manual decision
    pub fn is_auto_actionable(self) -> bool {
        matches!(
            self,
            Self::LocalNewer | Self::RemoteNewer | Self::LocalOnly | Self::RemoteOnly
        )
    }

    /// True for statuses that need a conflict resolution before acting
    pub fn needs_resolution(self) -> bool {
        matches!(self, Self::Conflict | Self::SizeMismatch)
    }
}

/// Direction of synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Push local changes to the remote side only
    LocalToRemote,
    /// Pull remote changes to the local side only
    RemoteToLocal,
    /// Full two-way sync
    Bidirectional,
}

impl SyncDirection {
    /// Whether this direction would ever act on a comparison status.
    ///
    /// One-way directions drop the statuses whose action would flow the
    /// other way; conflicts stay visible in every direction so the caller
    /// can resolve or skip them.
    pub fn acts_on(self, status: SyncStatus) -> bool {
        match self {
            Self::Bidirectional => true,
            Self::LocalToRemote => !matches!(
                status,
                SyncStatus::RemoteNewer | SyncStatus::RemoteOnly
            ),
            Self::RemoteToLocal => !matches!(
                status,
                SyncStatus::LocalNewer | SyncStatus::LocalOnly
            ),
        }
    }
}

impl FromStr for SyncDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bidirectional" | "both" => Ok(Self::Bidirectional),
            "local-to-remote" | "local_to_remote" | "up" => Ok(Self::LocalToRemote),
            "remote-to-local" | "remote_to_local" | "down" => Ok(Self::RemoteToLocal),
            other => Err(CoreError::UnknownDirection(other.to_string())),
        }
    }
}

/// Result of comparing one relative path.
///
/// `relative_path` is the slash-separated path relative to both sync roots
/// and is the only stable cross-side identity for an entry. For `*Only`
/// statuses exactly one of `local_info`/`remote_info` is `None`; for every
/// other status both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileComparison {
    pub relative_path: String,
    pub status: SyncStatus,
    pub local_info: Option<FileInfo>,
    pub remote_info: Option<FileInfo>,
    pub is_dir: bool,
}

impl FileComparison {
    /// Metadata of the side a given transfer would read from:
    /// local for uploads, remote for downloads.
    pub fn source_info(&self, upload: bool) -> Option<&FileInfo> {
        if upload {
            self.local_info.as_ref()
        } else {
            self.remote_info.as_ref()
        }
    }
}
