// crates/backend/src/local.rs
//! Local filesystem scanning and the local-directory backend

use crate::error::{BackendError, BackendResult};
use crate::traits::{SpeedLimits, TransferBackend};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftsync_core::types::CompareOptions;
use driftsync_core::FileInfo;
use log::warn;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use walkdir::WalkDir;

const CHECKSUM_BUF_SIZE: usize = 64 * 1024;

/// Computes the hex SHA-256 checksum of a local file
pub fn file_checksum(path: &Path) -> BackendResult<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHECKSUM_BUF_SIZE];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Recursively enumerates a local tree into a map keyed by POSIX-style
/// relative path.
///
/// Directories appear as entries of their own (with no size or mtime, so
/// they only ever compare as present or absent). Excluded paths and
/// everything under them are skipped. Fails with `NotFound` when the root
/// itself is missing; unreadable entries below the root are logged and
/// skipped.
pub fn scan_local_tree(
    root: &Path,
    options: &CompareOptions,
    with_checksums: bool,
) -> BackendResult<HashMap<String, FileInfo>> {
    if !root.exists() {
        return Err(BackendError::NotFound(root.to_string_lossy().to_string()));
    }

    let mut entries = HashMap::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let relative_path = to_posix(relative);

        if options.is_excluded(&relative_path) {
            continue;
        }

        let info = if entry.file_type().is_dir() {
            FileInfo::dir(entry.file_name().to_string_lossy(), relative_path.clone())
        } else {
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("skipping {}: {}", relative_path, e);
                    continue;
                }
            };
            let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            let mut info = FileInfo::file(
                entry.file_name().to_string_lossy(),
                relative_path.clone(),
                metadata.len(),
                modified,
            );
            if with_checksums {
                match file_checksum(entry.path()) {
                    Ok(checksum) => info.checksum = Some(checksum),
                    Err(e) => warn!("checksum failed for {}: {}", relative_path, e),
                }
            }
            info
        };

        entries.insert(relative_path, info);
    }

    Ok(entries)
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A [`TransferBackend`] over a second local directory.
///
/// Useful for syncing to a mounted share or USB disk, and for exercising
/// the engine end to end without a protocol session. Speed limits are
/// stored but not enforced; there is no transport to throttle.
pub struct LocalDirBackend {
    root: PathBuf,
    with_checksums: bool,
    limits: Mutex<SpeedLimits>,
}

impl LocalDirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            with_checksums: false,
            limits: Mutex::new(SpeedLimits::unlimited()),
        }
    }

    /// Enables checksum computation in listings (slower)
    pub fn with_checksums(mut self, enabled: bool) -> Self {
        self.with_checksums = enabled;
        self
    }

    /// Root directory this backend serves as the remote side
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, remote: &str) -> BackendResult<PathBuf> {
        let trimmed = remote.trim_start_matches('/');
        if trimmed.contains('\0') || trimmed.split('/').any(|part| part == "..") {
            return Err(BackendError::Other(format!("invalid remote path: {}", remote)));
        }
        if trimmed.is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(trimmed))
    }
}

#[async_trait]
impl TransferBackend for LocalDirBackend {
    fn name(&self) -> &str {
        "local-dir"
    }

    async fn list(&self, path: &str) -> BackendResult<Vec<FileInfo>> {
        let dir = self.resolve(path)?;
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| BackendError::from_io_for_path(e, path))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().to_string();

            if metadata.is_dir() {
                entries.push(FileInfo::dir(name, entry.path().to_string_lossy()));
            } else {
                let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
                let mut info = FileInfo::file(
                    name,
                    entry.path().to_string_lossy(),
                    metadata.len(),
                    modified,
                );
                if self.with_checksums {
                    if let Ok(checksum) = file_checksum(&entry.path()) {
                        info.checksum = Some(checksum);
                    }
                }
                entries.push(info);
            }
        }

        Ok(entries)
    }

    async fn upload(&self, local: &Path, remote: &str) -> BackendResult<u64> {
        let target = self.resolve(remote)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(local, &target)
            .await
            .map_err(|e| BackendError::from_io_for_path(e, remote))?;
        Ok(bytes)
    }

    async fn download(&self, remote: &str, local: &Path) -> BackendResult<u64> {
        let source = self.resolve(remote)?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(&source, local)
            .await
            .map_err(|e| BackendError::from_io_for_path(e, remote))?;
        Ok(bytes)
    }

    async fn mkdir(&self, path: &str) -> BackendResult<()> {
        let dir = self.resolve(path)?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(())
    }

    async fn set_speed_limits(&self, limits: SpeedLimits) -> BackendResult<()> {
        *self.limits.lock().await = limits;
        Ok(())
    }

    async fn speed_limits(&self) -> SpeedLimits {
        *self.limits.lock().await
    }
}
