//! Persistent state for driftsync: journals, sync indexes, and profiles
//!
//! Everything here is plain structured data on disk — JSON for journals
//! and indexes, TOML for profiles — written atomically so an interrupted
//! process never leaves a half-written record behind. One journal and one
//! index exist per (local, remote) path pair.

pub mod error;
pub mod index;
pub mod journal;
pub mod journal_store;
pub mod profiles;
pub mod sign;

pub use error::{StoreError, StoreResult};
pub use index::{IndexStore, SyncIndex, SyncIndexEntry};
pub use journal::{
    checkpoint_interval, EntryAction, EntryStatus, SyncJournal, SyncJournalEntry,
};
pub use journal_store::{JournalStore, JournalSummary};
pub use profiles::{
    apply_profile, builtin_profiles, ProfileStore, SyncProfile, CUSTOM_PROFILE_ID,
};
pub use sign::{sign_journal, verify_journal_signature, MIN_SIGNING_KEY_LEN};
