//! Merging run outcomes into the sync index

use crate::plan::TransferPlan;
use driftsync_store::{EntryStatus, SyncIndex, SyncIndexEntry, SyncJournal};

/// Records the state of every completed entry into the index, last write
/// wins per path.
///
/// The recorded metadata comes from the transfer's source side — the
/// local file for uploads, the remote listing for downloads — since that
/// is what both sides now hold.
pub fn merge_completed(index: &mut SyncIndex, plan: &TransferPlan, journal: &SyncJournal) {
    for item in &plan.transfers {
        let path = item.relative_path();
        let completed = journal
            .entry(path)
            .map(|e| e.status == EntryStatus::Completed)
            .unwrap_or(false);
        if !completed {
            continue;
        }

        let entry = if item.is_dir() {
            SyncIndexEntry {
                size: 0,
                modified: None,
                is_dir: true,
            }
        } else {
            let bytes = journal.entry(path).map(|e| e.bytes_transferred).unwrap_or(0);
            match item.source_info() {
                Some(info) => SyncIndexEntry {
                    size: info.size,
                    modified: info.modified,
                    is_dir: false,
                },
                None => SyncIndexEntry {
                    size: bytes,
                    modified: None,
                    is_dir: false,
                },
            }
        };

        index.record(path.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ResolutionMap;
    use crate::plan::TransferPlan;
    use chrono::Utc;
    use driftsync_core::{FileComparison, FileInfo, SyncDirection, SyncStatus, VerifyPolicy};
    use driftsync_resilience::RetryPolicy;

    fn plan_and_journal() -> (TransferPlan, SyncJournal) {
        let now = Utc::now();
        let comparisons = vec![
            FileComparison {
                relative_path: "done.txt".to_string(),
                status: SyncStatus::LocalOnly,
                local_info: Some(FileInfo::file("done.txt", "done.txt", 42, Some(now))),
                remote_info: None,
                is_dir: false,
            },
            FileComparison {
                relative_path: "failed.txt".to_string(),
                status: SyncStatus::LocalOnly,
                local_info: Some(FileInfo::file("failed.txt", "failed.txt", 7, Some(now))),
                remote_info: None,
                is_dir: false,
            },
        ];
        let plan = TransferPlan::build(
            &comparisons,
            SyncDirection::Bidirectional,
            &ResolutionMap::new(),
        );
        let journal = SyncJournal::new(
            "/l",
            "/r",
            SyncDirection::Bidirectional,
            RetryPolicy::default(),
            VerifyPolicy::None,
            plan.to_journal_entries(),
        );
        (plan, journal)
    }

    #[test]
    fn test_only_completed_entries_merge() {
        let (plan, mut journal) = plan_and_journal();
        journal.entry_mut("done.txt").expect("entry").status = EntryStatus::Completed;
        journal.entry_mut("done.txt").expect("entry").bytes_transferred = 42;
        journal.entry_mut("failed.txt").expect("entry").status = EntryStatus::Failed;

        let mut index = SyncIndex::new("/l", "/r");
        merge_completed(&mut index, &plan, &journal);

        assert_eq!(index.get("done.txt").map(|e| e.size), Some(42));
        assert!(index.get("failed.txt").is_none());
    }

    #[test]
    fn test_merge_overwrites_previous_state() {
        let (plan, mut journal) = plan_and_journal();
        journal.entry_mut("done.txt").expect("entry").status = EntryStatus::Completed;

        let mut index = SyncIndex::new("/l", "/r");
        index.record(
            "done.txt",
            SyncIndexEntry {
                size: 1,
                modified: None,
                is_dir: false,
            },
        );
        merge_completed(&mut index, &plan, &journal);

        assert_eq!(index.get("done.txt").map(|e| e.size), Some(42));
    }
}
