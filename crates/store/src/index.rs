// crates/store/src/index.rs
//! The sync index: last-known-synced file states per path pair

use crate::error::{StoreError, StoreResult};
use crate::journal_store::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tokio::fs;

const INDEX_VERSION: u32 = 1;

/// Snapshot of one file's state at the time of the last successful sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncIndexEntry {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub is_dir: bool,
}

/// Per-pair cache of file states after the last completed sync.
///
/// The index records outcomes; it never gates the full rescan. Its one
/// active use is conflict refinement: a path whose local and remote state
/// both diverged from this snapshot is a true conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncIndex {
    /// Format version, for future migrations
    pub version: u32,
    pub last_sync: DateTime<Utc>,
    pub local_path: String,
    pub remote_path: String,
    /// Key is the relative path
    pub files: HashMap<String, SyncIndexEntry>,
}

impl SyncIndex {
    pub fn new(local_path: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            version: INDEX_VERSION,
            last_sync: Utc::now(),
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            files: HashMap::new(),
        }
    }

    /// Records a path's state, last write wins
    pub fn record(&mut self, relative_path: impl Into<String>, entry: SyncIndexEntry) {
        self.files.insert(relative_path.into(), entry);
    }

    pub fn get(&self, relative_path: &str) -> Option<&SyncIndexEntry> {
        self.files.get(relative_path)
    }
}

/// One JSON index file per (local, remote) pair
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens the platform-default index location
    pub fn open_default() -> StoreResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "driftsync")
            .ok_or(StoreError::NoDataDir)?;
        Self::new(dirs.data_dir().join("sync-index"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn load(
        &self,
        local_path: &str,
        remote_path: &str,
    ) -> StoreResult<Option<SyncIndex>> {
        let path = self.index_path(local_path, remote_path);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub async fn save(&self, index: &SyncIndex) -> StoreResult<()> {
        let path = self.index_path(&index.local_path, &index.remote_path);
        let json = serde_json::to_string_pretty(index)?;
        write_atomic(&self.dir, &path, json.as_bytes())?;
        Ok(())
    }

    fn index_path(&self, local_path: &str, remote_path: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        local_path.hash(&mut hasher);
        remote_path.hash(&mut hasher);
        self.dir.join(format!("{:016x}.json", hasher.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let tmp = TempDir::new().expect("tempdir");
        let store = IndexStore::new(tmp.path()).expect("store");
        assert!(store.load("/l", "/r").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let tmp = TempDir::new().expect("tempdir");
        let store = IndexStore::new(tmp.path()).expect("store");

        let mut index = SyncIndex::new("/l", "/r");
        index.record(
            "docs/a.txt",
            SyncIndexEntry {
                size: 120,
                modified: Some(Utc::now()),
                is_dir: false,
            },
        );
        store.save(&index).await.expect("save");

        let loaded = store.load("/l", "/r").await.expect("load").expect("present");
        assert_eq!(loaded, index);
        assert_eq!(loaded.get("docs/a.txt").map(|e| e.size), Some(120));
    }

    #[test]
    fn test_record_last_write_wins() {
        let mut index = SyncIndex::new("/l", "/r");
        index.record(
            "a.txt",
            SyncIndexEntry {
                size: 10,
                modified: None,
                is_dir: false,
            },
        );
        index.record(
            "a.txt",
            SyncIndexEntry {
                size: 20,
                modified: None,
                is_dir: false,
            },
        );
        assert_eq!(index.get("a.txt").map(|e| e.size), Some(20));
        assert_eq!(index.files.len(), 1);
    }
}
