// crates/engine/src/plan.rs
//! Transfer planning.
//!
//! A plan is the ordered, executable subset of a comparison list:
//! auto-actionable entries plus conflicts whose resolution picked a
//! direction. Entry order is fixed here and mirrored into the journal.

use crate::conflict::{ConflictResolution, ResolutionMap};
use driftsync_core::{FileComparison, FileInfo, SyncDirection, SyncStatus};
use driftsync_store::{EntryAction, SyncJournal, SyncJournalEntry};
use std::collections::BTreeSet;

/// One selected entry with its transfer direction
#[derive(Debug, Clone)]
pub struct PlannedTransfer {
    pub comparison: FileComparison,
    pub action: EntryAction,
}

impl PlannedTransfer {
    pub fn relative_path(&self) -> &str {
        &self.comparison.relative_path
    }

    pub fn is_dir(&self) -> bool {
        self.comparison.is_dir
    }

    /// Metadata of the side this transfer reads from
    pub fn source_info(&self) -> Option<&FileInfo> {
        self.comparison
            .source_info(self.action == EntryAction::Upload)
    }
}

/// The executable transfer list for one run
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub direction: SyncDirection,
    pub transfers: Vec<PlannedTransfer>,
}

impl TransferPlan {
    /// Selects actionable entries from a comparison list.
    ///
    /// `LocalNewer`/`LocalOnly` become uploads, `RemoteNewer`/`RemoteOnly`
    /// downloads, conflicts follow their resolution, and anything
    /// unresolved or resolved to skip stays out of the plan. Directory
    /// entries become direct mkdir work items.
    pub fn build(
        comparisons: &[FileComparison],
        direction: SyncDirection,
        resolutions: &ResolutionMap,
    ) -> Self {
        let mut transfers = Vec::new();

        for comparison in comparisons {
            if !direction.acts_on(comparison.status) {
                continue;
            }

            let action = match comparison.status {
                SyncStatus::Identical => None,
                SyncStatus::LocalNewer | SyncStatus::LocalOnly => Some(EntryAction::Upload),
                SyncStatus::RemoteNewer | SyncStatus::RemoteOnly => {
                    Some(EntryAction::Download)
                }
                SyncStatus::Conflict | SyncStatus::SizeMismatch => {
                    match resolutions.get(&comparison.relative_path) {
                        Some(ConflictResolution::Upload) => Some(EntryAction::Upload),
                        Some(ConflictResolution::Download) => Some(EntryAction::Download),
                        Some(ConflictResolution::Skip) | None => None,
                    }
                }
            };

            if let Some(action) = action {
                transfers.push(PlannedTransfer {
                    comparison: comparison.clone(),
                    action,
                });
            }
        }

        Self {
            direction,
            transfers,
        }
    }

    /// Rebuilds an executable plan from a persisted journal.
    ///
    /// The stand-in comparisons carry the journal's expected metadata on
    /// the transfer's source side; entry order is the journal's order.
    pub fn from_journal(journal: &SyncJournal) -> Self {
        let transfers = journal
            .entries
            .iter()
            .map(|entry| {
                let info = stand_in_info(entry);
                let (status, local_info, remote_info) = match entry.action {
                    EntryAction::Upload => (SyncStatus::LocalOnly, Some(info), None),
                    EntryAction::Download => (SyncStatus::RemoteOnly, None, Some(info)),
                };
                PlannedTransfer {
                    comparison: FileComparison {
                        relative_path: entry.relative_path.clone(),
                        status,
                        local_info,
                        remote_info,
                        is_dir: entry.is_dir,
                    },
                    action: entry.action,
                }
            })
            .collect();

        Self {
            direction: journal.direction,
            transfers,
        }
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Journal entries for a fresh run, one per transfer in plan order
    pub fn to_journal_entries(&self) -> Vec<SyncJournalEntry> {
        self.transfers
            .iter()
            .map(|transfer| {
                let mut entry =
                    SyncJournalEntry::new(transfer.relative_path(), transfer.action);
                entry.is_dir = transfer.is_dir();
                if let Some(info) = transfer.source_info() {
                    if !info.is_dir {
                        entry.expected_size = Some(info.size);
                        entry.expected_mtime = info.modified;
                        entry.expected_checksum = info.checksum.clone();
                    }
                }
                entry
            })
            .collect()
    }

    /// Remote ancestor directories implied by upload targets, shallowest
    /// first
    pub fn remote_dirs_to_precreate(&self) -> Vec<String> {
        self.ancestors_for(EntryAction::Upload)
    }

    /// Local ancestor directories implied by download targets, shallowest
    /// first
    pub fn local_dirs_to_precreate(&self) -> Vec<String> {
        self.ancestors_for(EntryAction::Download)
    }

    fn ancestors_for(&self, action: EntryAction) -> Vec<String> {
        let mut dirs = BTreeSet::new();

        for transfer in &self.transfers {
            if transfer.action != action || transfer.is_dir() {
                continue;
            }
            let mut ancestor = String::new();
            let components: Vec<&str> = transfer.relative_path().split('/').collect();
            for component in &components[..components.len().saturating_sub(1)] {
                if !ancestor.is_empty() {
                    ancestor.push('/');
                }
                ancestor.push_str(component);
                dirs.insert(ancestor.clone());
            }
        }

        let mut ordered: Vec<String> = dirs.into_iter().collect();
        ordered.sort_by_key(|d| (d.matches('/').count(), d.clone()));
        ordered
    }
}

fn stand_in_info(entry: &SyncJournalEntry) -> FileInfo {
    let name = entry
        .relative_path
        .rsplit('/')
        .next()
        .unwrap_or(&entry.relative_path)
        .to_string();

    if entry.is_dir {
        return FileInfo::dir(name, entry.relative_path.clone());
    }

    let mut info = FileInfo::file(
        name,
        entry.relative_path.clone(),
        entry.expected_size.unwrap_or(0),
        entry.expected_mtime,
    );
    info.checksum = entry.expected_checksum.clone();
    info
}
