// crates/backend/src/traits.rs
//! The transfer backend capability trait

use crate::error::BackendResult;
use async_trait::async_trait;
use driftsync_core::FileInfo;
use std::path::Path;
use std::time::Duration;

/// Session-wide transfer rate caps, in KB/s. Zero means unlimited.
///
/// Limits are a backend-side throttle: the engine only passes configured
/// values through, it does not meter bytes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeedLimits {
    pub download_kbps: u32,
    pub upload_kbps: u32,
}

impl SpeedLimits {
    pub fn new(download_kbps: u32, upload_kbps: u32) -> Self {
        Self {
            download_kbps,
            upload_kbps,
        }
    }

    /// Both directions uncapped
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn is_unlimited(&self) -> bool {
        self.download_kbps == 0 && self.upload_kbps == 0
    }
}

/// Pacing a backend requires between consecutive transfers.
///
/// Protocol sessions that serialize data-connection usage (classic FTP)
/// need a small settle delay after each transfer that actually opened a
/// data channel, plus a periodic keep-alive no-op on long batches.
/// Backends without that constraint return the zero default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferPacing {
    /// Delay after each entry that moved bytes
    pub inter_transfer_delay: Duration,
    /// Send a keep-alive after this many transfers (0 disables)
    pub keepalive_every: usize,
}

impl TransferPacing {
    pub fn new(inter_transfer_delay: Duration, keepalive_every: usize) -> Self {
        Self {
            inter_transfer_delay,
            keepalive_every,
        }
    }

    /// True when any settle delay applies
    pub fn is_paced(&self) -> bool {
        !self.inter_transfer_delay.is_zero()
    }
}

/// An opaque transfer capability over some remote storage.
///
/// Remote paths are POSIX-style, slash-separated and relative to the
/// session's remote root (`""` names the root itself). All operations are
/// fallible and backend-specific; the engine classifies whatever errors
/// come back.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Short human-readable backend name, for logs
    fn name(&self) -> &str;

    /// Lists the entries directly under a remote directory
    async fn list(&self, path: &str) -> BackendResult<Vec<FileInfo>>;

    /// Uploads a local file, returning the bytes transferred
    async fn upload(&self, local: &Path, remote: &str) -> BackendResult<u64>;

    /// Downloads a remote file, returning the bytes transferred
    async fn download(&self, remote: &str, local: &Path) -> BackendResult<u64>;

    /// Creates a remote directory (parents included)
    async fn mkdir(&self, path: &str) -> BackendResult<()>;

    /// Protocol no-op to keep the session alive on long batches
    async fn keepalive(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Pacing this backend needs between transfers
    fn transfer_pacing(&self) -> TransferPacing {
        TransferPacing::default()
    }

    /// Applies session-wide speed limits
    async fn set_speed_limits(&self, limits: SpeedLimits) -> BackendResult<()>;

    /// Currently configured speed limits
    async fn speed_limits(&self) -> SpeedLimits;
}
