// crates/engine/src/conflict.rs
//! Conflict resolution.
//!
//! Conflicting and size-mismatched entries cannot be acted on until a
//! resolution assigns them a direction. Resolutions are keyed by relative
//! path; resolving to `Skip` drops the entry from the executable set,
//! anything else adds it.

use driftsync_core::{FileComparison, SyncStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction assigned to a conflicting entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    Upload,
    Download,
    Skip,
}

/// Bulk strategies applied to every unresolved conflict at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkStrategy {
    /// Resolve everything to upload (local wins)
    AllUpload,
    /// Resolve everything to download (remote wins)
    AllDownload,
    /// Skip every conflict
    SkipAll,
    /// Pick the side with the newer timestamp, ties favor local
    KeepNewer,
}

/// Per-path conflict resolutions for one run
#[derive(Debug, Clone, Default)]
pub struct ResolutionMap {
    resolutions: HashMap<String, ConflictResolution>,
}

impl ResolutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a resolution to one entry
    pub fn set(&mut self, relative_path: impl Into<String>, resolution: ConflictResolution) {
        self.resolutions.insert(relative_path.into(), resolution);
    }

    pub fn get(&self, relative_path: &str) -> Option<ConflictResolution> {
        self.resolutions.get(relative_path).copied()
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }

    /// Applies a bulk strategy to every comparison that needs resolution.
    ///
    /// Existing per-entry assignments are overwritten; entries that do
    /// not need resolution are untouched.
    pub fn apply_bulk(&mut self, comparisons: &[FileComparison], strategy: BulkStrategy) {
        for comparison in comparisons {
            if !comparison.status.needs_resolution() {
                continue;
            }
            let resolution = match strategy {
                BulkStrategy::AllUpload => ConflictResolution::Upload,
                BulkStrategy::AllDownload => ConflictResolution::Download,
                BulkStrategy::SkipAll => ConflictResolution::Skip,
                BulkStrategy::KeepNewer => keep_newer(comparison),
            };
            self.set(comparison.relative_path.clone(), resolution);
        }
    }
}

/// Newer-side resolution with ties (and unknowable timestamps) favoring
/// local.
fn keep_newer(comparison: &FileComparison) -> ConflictResolution {
    let local = comparison.local_info.as_ref().and_then(|i| i.modified);
    let remote = comparison.remote_info.as_ref().and_then(|i| i.modified);

    match (local, remote) {
        (Some(l), Some(r)) if r > l => ConflictResolution::Download,
        (None, Some(_)) => ConflictResolution::Download,
        _ => ConflictResolution::Upload,
    }
}
