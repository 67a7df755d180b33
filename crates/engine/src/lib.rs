//! Sync reconciliation engine for driftsync
//!
//! This crate drives the whole reconciliation pipeline:
//! - Directory comparison between a local tree and a remote tree reached
//!   through a `TransferBackend`
//! - Conflict resolution, manual or bulk
//! - Transfer planning with directory pre-creation
//! - Sequential transfer execution with retries, backoff, timeouts,
//!   post-download verification, and journal checkpoints
//! - Resume of interrupted runs from the persisted journal
//!
//! One logical worker drives the executor; there is no parallel transfer
//! execution. Some protocol sessions serialize data-channel usage, so
//! transfers run one at a time with backend-declared pacing in between.

pub mod classify;
pub mod compare;
pub mod conflict;
pub mod error;
pub mod executor;
pub mod index;
pub mod plan;
pub mod progress;
pub mod schedule;
pub mod verify;

pub use classify::classify_backend_error;
pub use compare::{build_comparisons, compare_file_pair, compare_with_index};
pub use conflict::{BulkStrategy, ConflictResolution, ResolutionMap};
pub use error::{EngineError, EngineResult};
pub use executor::{SyncEngine, SyncRunOptions};
pub use index::merge_completed;
pub use plan::{PlannedTransfer, TransferPlan};
pub use progress::{null_sink, ProgressSink, SyncEvent, TreeSide};
pub use schedule::{SyncSchedule, TimeWindow, Weekday};
pub use verify::verify_local_transfer;
