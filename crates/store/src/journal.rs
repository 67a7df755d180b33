// crates/store/src/journal.rs
//! The sync journal: a resumable record of one run's per-entry outcomes

use chrono::{DateTime, Utc};
use driftsync_core::{SyncDirection, SyncErrorInfo, VerifyPolicy};
use driftsync_resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transfer direction recorded for a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryAction {
    Upload,
    Download,
}

/// Lifecycle state of one journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    VerifyFailed,
}

impl EntryStatus {
    /// True once the entry can no longer change within this run
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Skipped | Self::VerifyFailed
        )
    }

    /// True when the entry needs no further work on resume
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// One path's slot in the journal.
///
/// Entries are keyed by `relative_path`; the stored order matches the
/// plan order the run was built with, but resume always correlates by
/// path, never by position. The `expected_*` fields carry enough of the
/// source side's metadata to rebuild a comparison stand-in when the
/// original comparison list is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJournalEntry {
    pub relative_path: String,
    pub action: EntryAction,
    pub status: EntryStatus,
    pub attempts: u32,
    pub last_error: Option<SyncErrorInfo>,
    pub verified: bool,
    pub bytes_transferred: u64,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub expected_size: Option<u64>,
    #[serde(default)]
    pub expected_mtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expected_checksum: Option<String>,
}

impl SyncJournalEntry {
    pub fn new(relative_path: impl Into<String>, action: EntryAction) -> Self {
        Self {
            relative_path: relative_path.into(),
            action,
            status: EntryStatus::Pending,
            attempts: 0,
            last_error: None,
            verified: false,
            bytes_transferred: 0,
            is_dir: false,
            expected_size: None,
            expected_mtime: None,
            expected_checksum: None,
        }
    }
}

/// A resumable, checkpointed record of one sync run.
///
/// Created at run start with every selected entry `Pending`, mutated in
/// place as the executor progresses, deleted on full success, and kept on
/// cancellation or unresolved failures so the run can be resumed with the
/// same retry and verify policies it started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJournal {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub local_path: String,
    pub remote_path: String,
    pub direction: SyncDirection,
    pub retry_policy: RetryPolicy,
    pub verify_policy: VerifyPolicy,
    pub entries: Vec<SyncJournalEntry>,
    pub completed: bool,
}

impl SyncJournal {
    pub fn new(
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        direction: SyncDirection,
        retry_policy: RetryPolicy,
        verify_policy: VerifyPolicy,
        entries: Vec<SyncJournalEntry>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            direction,
            retry_policy,
            verify_policy,
            entries,
            completed: false,
        }
    }

    /// Looks an entry up by its relative path
    pub fn entry(&self, relative_path: &str) -> Option<&SyncJournalEntry> {
        self.entries
            .iter()
            .find(|e| e.relative_path == relative_path)
    }

    /// Mutable lookup by relative path
    pub fn entry_mut(&mut self, relative_path: &str) -> Option<&mut SyncJournalEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.relative_path == relative_path)
    }

    /// Bumps `updated_at`, to be called before every persist
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True when every entry completed or was skipped
    pub fn is_fully_settled(&self) -> bool {
        self.entries.iter().all(|e| e.status.is_settled())
    }

    /// True when any entry failed or failed verification
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| {
            matches!(e.status, EntryStatus::Failed | EntryStatus::VerifyFailed)
        })
    }

    /// Number of settled entries
    pub fn settled_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_settled()).count()
    }

    /// Sum of bytes recorded against completed entries
    pub fn transferred_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.bytes_transferred).sum()
    }
}

/// Checkpoint cadence for a batch: journal writes happen every N settled
/// entries, with N growing on large batches to keep write amplification
/// bounded.
pub fn checkpoint_interval(batch_size: usize) -> usize {
    if batch_size > 2000 {
        200
    } else if batch_size > 500 {
        100
    } else {
        10
    }
}
