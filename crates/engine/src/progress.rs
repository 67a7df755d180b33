//! Progress events emitted during comparison and execution

use driftsync_store::{EntryAction, EntryStatus};
use std::sync::Arc;
use std::time::Duration;

/// Which tree a scan event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSide {
    Local,
    Remote,
}

/// Events the engine reports while a comparison or run is in flight
#[derive(Debug, Clone)]
pub enum SyncEvent {
    ScanStarted {
        side: TreeSide,
    },
    Scanning {
        side: TreeSide,
        files_found: usize,
    },
    CompareCompleted {
        differences: usize,
    },
    EntryStarted {
        relative_path: String,
        action: EntryAction,
        index: usize,
        total: usize,
    },
    EntryRetrying {
        relative_path: String,
        attempt: u32,
        delay: Duration,
    },
    EntryFinished {
        relative_path: String,
        status: EntryStatus,
    },
    CheckpointWritten {
        settled: usize,
        total: usize,
    },
    RunFinished {
        uploaded: u32,
        downloaded: u32,
        errors: usize,
    },
}

/// Callback receiving progress events.
///
/// The sink is invoked inline from the engine's single worker; keep it
/// cheap and never block in it.
pub type ProgressSink = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// A sink that drops every event
pub fn null_sink() -> ProgressSink {
    Arc::new(|_| {})
}
