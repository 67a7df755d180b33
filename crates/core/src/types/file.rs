//! File metadata as seen on either side of a sync pair

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a single file or directory, local or remote.
///
/// `modified` and `checksum` are optional because not every backend can
/// report them; comparison criteria that need a missing attribute simply
/// cannot arbitrate on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Entry name (last path component)
    pub name: String,
    /// Full path on its own side
    pub path: String,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time, when the backend reports one
    pub modified: Option<DateTime<Utc>>,
    /// Whether this entry is a directory
    pub is_dir: bool,
    /// Content checksum (hex SHA-256), when available
    pub checksum: Option<String>,
}

impl FileInfo {
    /// Creates metadata for a regular file
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            modified,
            is_dir: false,
            checksum: None,
        }
    }

    /// Creates metadata for a directory
    pub fn dir(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: 0,
            modified: None,
            is_dir: true,
            checksum: None,
        }
    }

    /// Attaches a content checksum
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}
