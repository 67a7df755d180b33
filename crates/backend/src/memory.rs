// crates/backend/src/memory.rs
//! In-memory transfer backend with fault injection, for tests

use crate::error::{BackendError, BackendResult};
use crate::traits::{SpeedLimits, TransferBackend, TransferPacing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftsync_core::FileInfo;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

type TransferHook = Box<dyn Fn(u64) + Send + Sync>;

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    files: BTreeMap<String, MemoryFile>,
    dirs: BTreeSet<String>,
    limits: SpeedLimits,
    fail_plan: HashMap<String, VecDeque<BackendError>>,
    corrupt_downloads: HashSet<String>,
    latency: Option<Duration>,
    pacing: TransferPacing,
    transfers: u64,
    keepalives: u64,
}

/// An in-memory remote tree.
///
/// Tests use it to drive the executor deterministically: failures can be
/// queued per path, download corruption can be injected to trip
/// verification, artificial latency exercises timeouts, and a transfer
/// hook observes every completed transfer (for mid-run cancellation
/// scenarios).
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    hook: Mutex<Option<TransferHook>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a remote file, registering its ancestor directories
    pub fn insert_file(&self, path: &str, data: &[u8], modified: DateTime<Utc>) {
        let mut inner = self.lock();
        register_ancestors(&mut inner.dirs, path);
        inner.files.insert(
            path.to_string(),
            MemoryFile {
                data: data.to_vec(),
                modified,
            },
        );
    }

    /// Inserts an empty remote directory
    pub fn insert_dir(&self, path: &str) {
        let mut inner = self.lock();
        register_ancestors(&mut inner.dirs, &format!("{}/", path));
        inner.dirs.insert(path.to_string());
    }

    /// Queues an error for the next transfer touching `path`
    pub fn inject_failure(&self, path: &str, error: BackendError) {
        self.lock()
            .fail_plan
            .entry(path.to_string())
            .or_default()
            .push_back(error);
    }

    /// Makes downloads of `path` write extra garbage bytes, so size
    /// verification fails
    pub fn corrupt_download(&self, path: &str) {
        self.lock().corrupt_downloads.insert(path.to_string());
    }

    /// Adds artificial latency to every transfer
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Overrides the pacing this backend reports
    pub fn set_pacing(&self, pacing: TransferPacing) {
        self.lock().pacing = pacing;
    }

    /// Registers a hook called with the running transfer count after each
    /// successful transfer
    pub fn set_transfer_hook<F>(&self, hook: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        *self.hook.lock().expect("hook lock") = Some(Box::new(hook));
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.lock().files.contains_key(path)
    }

    pub fn contains_dir(&self, path: &str) -> bool {
        self.lock().dirs.contains(path)
    }

    pub fn file_data(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|f| f.data.clone())
    }

    pub fn transfer_count(&self) -> u64 {
        self.lock().transfers
    }

    pub fn keepalive_count(&self) -> u64 {
        self.lock().keepalives
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory backend lock")
    }

    fn take_failure(&self, path: &str) -> Option<BackendError> {
        let mut inner = self.lock();
        let queue = inner.fail_plan.get_mut(path)?;
        let error = queue.pop_front();
        if queue.is_empty() {
            inner.fail_plan.remove(path);
        }
        error
    }

    async fn apply_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record_transfer(&self) {
        let count = {
            let mut inner = self.lock();
            inner.transfers += 1;
            inner.transfers
        };
        if let Some(hook) = self.hook.lock().expect("hook lock").as_ref() {
            hook(count);
        }
    }
}

fn register_ancestors(dirs: &mut BTreeSet<String>, path: &str) {
    let mut ancestor = String::new();
    let components: Vec<&str> = path.split('/').collect();
    for component in &components[..components.len().saturating_sub(1)] {
        if component.is_empty() {
            continue;
        }
        if !ancestor.is_empty() {
            ancestor.push('/');
        }
        ancestor.push_str(component);
        dirs.insert(ancestor.clone());
    }
}

fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn name_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[async_trait]
impl TransferBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, path: &str) -> BackendResult<Vec<FileInfo>> {
        let inner = self.lock();
        let prefix = path.trim_matches('/');

        if !prefix.is_empty() && !inner.dirs.contains(prefix) {
            return Err(BackendError::NotFound(path.to_string()));
        }

        let mut entries = Vec::new();
        for (file_path, file) in &inner.files {
            if parent_of(file_path) == prefix {
                entries.push(
                    FileInfo::file(
                        name_of(file_path),
                        file_path.clone(),
                        file.data.len() as u64,
                        Some(file.modified),
                    )
                    .with_checksum(checksum(&file.data)),
                );
            }
        }
        for dir_path in &inner.dirs {
            if parent_of(dir_path) == prefix && dir_path.as_str() != prefix {
                entries.push(FileInfo::dir(name_of(dir_path), dir_path.clone()));
            }
        }

        Ok(entries)
    }

    async fn upload(&self, local: &Path, remote: &str) -> BackendResult<u64> {
        self.apply_latency().await;
        if let Some(error) = self.take_failure(remote) {
            return Err(error);
        }

        let data = tokio::fs::read(local).await?;
        let modified = tokio::fs::metadata(local)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let bytes = data.len() as u64;
        {
            let mut inner = self.lock();
            register_ancestors(&mut inner.dirs, remote);
            inner
                .files
                .insert(remote.to_string(), MemoryFile { data, modified });
        }
        self.record_transfer();
        Ok(bytes)
    }

    async fn download(&self, remote: &str, local: &Path) -> BackendResult<u64> {
        self.apply_latency().await;
        if let Some(error) = self.take_failure(remote) {
            return Err(error);
        }

        let (mut data, corrupt) = {
            let inner = self.lock();
            let file = inner
                .files
                .get(remote)
                .ok_or_else(|| BackendError::NotFound(remote.to_string()))?;
            (file.data.clone(), inner.corrupt_downloads.contains(remote))
        };
        if corrupt {
            data.extend_from_slice(b"!!");
        }

        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, &data).await?;
        self.record_transfer();
        Ok(data.len() as u64)
    }

    async fn mkdir(&self, path: &str) -> BackendResult<()> {
        self.insert_dir(path.trim_matches('/'));
        Ok(())
    }

    async fn keepalive(&self) -> BackendResult<()> {
        self.lock().keepalives += 1;
        Ok(())
    }

    fn transfer_pacing(&self) -> TransferPacing {
        self.lock().pacing
    }

    async fn set_speed_limits(&self, limits: SpeedLimits) -> BackendResult<()> {
        self.lock().limits = limits;
        Ok(())
    }

    async fn speed_limits(&self) -> SpeedLimits {
        self.lock().limits
    }
}
