// crates/store/src/journal_store.rs
//! On-disk journal persistence and checkpointing

use crate::error::{StoreError, StoreResult};
use crate::journal::SyncJournal;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Condensed view of a persisted journal, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSummary {
    pub id: String,
    pub local_path: String,
    pub remote_path: String,
    pub updated_at: DateTime<Utc>,
    pub completed: bool,
    pub total_entries: usize,
    pub settled_entries: usize,
}

impl JournalSummary {
    fn from_journal(journal: &SyncJournal) -> Self {
        Self {
            id: journal.id.clone(),
            local_path: journal.local_path.clone(),
            remote_path: journal.remote_path.clone(),
            updated_at: journal.updated_at,
            completed: journal.completed,
            total_entries: journal.entries.len(),
            settled_entries: journal.settled_count(),
        }
    }
}

/// Stores one journal file per (local, remote) path pair.
///
/// Files are JSON, named by a stable hash of the pair, and written
/// atomically through a temp file so a crash mid-checkpoint never
/// corrupts the previous checkpoint.
pub struct JournalStore {
    dir: PathBuf,
}

impl JournalStore {
    /// Opens a store rooted at `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens the platform-default store location
    pub fn open_default() -> StoreResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "driftsync")
            .ok_or(StoreError::NoDataDir)?;
        Self::new(dirs.data_dir().join("journals"))
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists a journal (checkpoint or final write)
    pub async fn save(&self, journal: &SyncJournal) -> StoreResult<()> {
        let path = self.journal_path(&journal.local_path, &journal.remote_path);
        let json = serde_json::to_string_pretty(journal)?;
        write_atomic(&self.dir, &path, json.as_bytes())?;
        debug!(
            "journal checkpoint: {} ({}/{} settled)",
            path.display(),
            journal.settled_count(),
            journal.entries.len()
        );
        Ok(())
    }

    /// Loads the journal for a path pair, if one is persisted
    pub async fn load(
        &self,
        local_path: &str,
        remote_path: &str,
    ) -> StoreResult<Option<SyncJournal>> {
        let path = self.journal_path(local_path, remote_path);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).await?;
        let journal = serde_json::from_str(&json)?;
        Ok(Some(journal))
    }

    /// Removes the journal (and any signature) for a path pair
    pub async fn delete(&self, local_path: &str, remote_path: &str) -> StoreResult<()> {
        let path = self.journal_path(local_path, remote_path);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        let sig = self.signature_path(local_path, remote_path);
        if sig.exists() {
            fs::remove_file(&sig).await?;
        }
        Ok(())
    }

    /// Summaries of every persisted journal
    pub async fn list_all(&self) -> StoreResult<Vec<JournalSummary>> {
        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let json = fs::read_to_string(&path).await?;
            match serde_json::from_str::<SyncJournal>(&json) {
                Ok(journal) => summaries.push(JournalSummary::from_journal(&journal)),
                Err(e) => warn!("skipping unreadable journal {}: {}", path.display(), e),
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Deletes journals not updated within `max_age_days`; returns the
    /// number removed
    pub async fn cleanup_older_than(&self, max_age_days: u32) -> StoreResult<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(max_age_days as i64);
        let mut removed = 0;

        for summary in self.list_all().await? {
            if summary.updated_at < cutoff {
                self.delete(&summary.local_path, &summary.remote_path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("cleaned up {} journal(s) older than {} days", removed, max_age_days);
        }
        Ok(removed)
    }

    /// Deletes every persisted journal; returns the number removed
    pub async fn clear_all(&self) -> StoreResult<usize> {
        let summaries = self.list_all().await?;
        let count = summaries.len();
        for summary in summaries {
            self.delete(&summary.local_path, &summary.remote_path).await?;
        }
        Ok(count)
    }

    /// Path of the `.sig` file paired with a journal
    pub fn signature_path(&self, local_path: &str, remote_path: &str) -> PathBuf {
        self.dir
            .join(format!("{}.sig", pair_stem(local_path, remote_path)))
    }

    fn journal_path(&self, local_path: &str, remote_path: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", pair_stem(local_path, remote_path)))
    }
}

/// Stable filename stem for a (local, remote) pair
fn pair_stem(local_path: &str, remote_path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    local_path.hash(&mut hasher);
    remote_path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Writes `contents` to `target` through a temp file in `dir`, then
/// renames into place.
pub(crate) fn write_atomic(dir: &Path, target: &Path, contents: &[u8]) -> StoreResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(target).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
