//! Core data model for the driftsync reconciliation engine.
//!
//! This crate defines the types shared across the workspace: per-path
//! comparison records, comparison options, verification policies, the
//! error taxonomy used for transfer classification, and the aggregate
//! sync report.

pub mod classify;
pub mod error;
pub mod types;

pub use classify::classify_transfer_error;
pub use error::{CoreError, CoreResult};
pub use types::{
    timestamps_equal, CompareOptions, ErrorKind, FileComparison, FileInfo, SyncDirection,
    SyncErrorInfo, SyncReport, SyncStatus, VerifyPolicy, VerifyResult, TIMESTAMP_TOLERANCE_SECS,
};
