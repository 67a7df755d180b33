// crates/engine/src/compare.rs
//! Directory comparison.
//!
//! Both trees are enumerated into maps keyed by relative path, the key
//! sets are unioned, and every path is classified by the pairwise rule.
//! Identical files are dropped from the result; directory records are
//! kept so tree shape stays visible. When a sync index snapshot is
//! available, a path that diverged on both sides since the last
//! successful sync is reported as a true conflict.

use crate::error::{EngineError, EngineResult};
use crate::progress::{ProgressSink, SyncEvent, TreeSide};
use driftsync_backend::{local::scan_local_tree, TransferBackend};
use driftsync_core::{
    timestamps_equal, CompareOptions, FileComparison, FileInfo, SyncStatus,
    TIMESTAMP_TOLERANCE_SECS,
};
use driftsync_resilience::CancellationToken;
use driftsync_store::SyncIndex;
use log::{info, warn};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use crate::classify::classify_backend_error;

/// Which side is strictly newer, when timestamps can arbitrate at all.
/// `None` means equal within tolerance or not comparable.
fn newer_side(
    local: Option<chrono::DateTime<chrono::Utc>>,
    remote: Option<chrono::DateTime<chrono::Utc>>,
) -> Option<SyncStatus> {
    match (local, remote) {
        (Some(l), Some(r)) => {
            let diff = l.signed_duration_since(r).num_seconds();
            if diff.abs() <= TIMESTAMP_TOLERANCE_SECS {
                None
            } else if diff > 0 {
                Some(SyncStatus::LocalNewer)
            } else {
                Some(SyncStatus::RemoteNewer)
            }
        }
        _ => None,
    }
}

/// Classifies one path from the metadata on each side.
///
/// Sizes are checked first: a size disagreement resolves to the newer
/// side when timestamps can arbitrate, otherwise `SizeMismatch`. A
/// checksum disagreement with no newer side is a `Conflict`. Directories
/// present on both sides are always `Identical` — size is meaningless
/// block metadata there and mtime churns on every child change.
pub fn compare_file_pair(
    local: Option<&FileInfo>,
    remote: Option<&FileInfo>,
    options: &CompareOptions,
) -> SyncStatus {
    match (local, remote) {
        (None, None) => SyncStatus::Identical,
        (Some(_), None) => SyncStatus::LocalOnly,
        (None, Some(_)) => SyncStatus::RemoteOnly,
        (Some(l), Some(r)) => {
            if l.is_dir || r.is_dir {
                return SyncStatus::Identical;
            }

            if options.compare_size && l.size != r.size {
                if options.compare_timestamp {
                    return newer_side(l.modified, r.modified)
                        .unwrap_or(SyncStatus::SizeMismatch);
                }
                return SyncStatus::SizeMismatch;
            }

            if options.compare_checksum {
                if let (Some(lc), Some(rc)) = (&l.checksum, &r.checksum) {
                    if lc != rc {
                        if options.compare_timestamp {
                            return newer_side(l.modified, r.modified)
                                .unwrap_or(SyncStatus::Conflict);
                        }
                        return SyncStatus::Conflict;
                    }
                }
            }

            if options.compare_timestamp {
                if timestamps_equal(l.modified, r.modified) {
                    return SyncStatus::Identical;
                }
                return newer_side(l.modified, r.modified).unwrap_or(SyncStatus::Identical);
            }

            SyncStatus::Identical
        }
    }
}

/// Index-aware classification for a path present on both sides.
///
/// Compares each side against the snapshot taken after the last
/// successful sync: both diverged is a true `Conflict`, one diverged
/// picks that side as newer, neither is `Identical`. Paths not in the
/// snapshot fall back to the pairwise rule.
pub fn compare_with_index(
    local: &FileInfo,
    remote: &FileInfo,
    options: &CompareOptions,
    index: &SyncIndex,
    relative_path: &str,
) -> SyncStatus {
    let cached = match index.get(relative_path) {
        Some(entry) => entry,
        None => return compare_file_pair(Some(local), Some(remote), options),
    };

    if local.is_dir || remote.is_dir {
        return SyncStatus::Identical;
    }

    let local_changed =
        local.size != cached.size || !timestamps_equal(local.modified, cached.modified);
    let remote_changed =
        remote.size != cached.size || !timestamps_equal(remote.modified, cached.modified);

    match (local_changed, remote_changed) {
        (true, true) => SyncStatus::Conflict,
        (false, false) => SyncStatus::Identical,
        (true, false) => SyncStatus::LocalNewer,
        (false, true) => SyncStatus::RemoteNewer,
    }
}

/// Builds the ordered comparison list from both tree maps.
///
/// Identical files are filtered out; directory entries stay regardless of
/// status. Results are sorted by relative path, then filtered down to the
/// statuses the configured direction would ever act on.
pub fn build_comparisons(
    local_files: &HashMap<String, FileInfo>,
    remote_files: &HashMap<String, FileInfo>,
    options: &CompareOptions,
    index: Option<&SyncIndex>,
) -> Vec<FileComparison> {
    let mut all_paths: HashSet<&String> = local_files.keys().collect();
    all_paths.extend(remote_files.keys());

    let mut results = Vec::new();
    for path in all_paths {
        if options.is_excluded(path) {
            continue;
        }

        let local = local_files.get(path);
        let remote = remote_files.get(path);
        let is_dir = local.map(|f| f.is_dir).unwrap_or(false)
            || remote.map(|f| f.is_dir).unwrap_or(false);

        let status = match (index, local, remote) {
            (Some(idx), Some(l), Some(r)) => compare_with_index(l, r, options, idx, path),
            _ => compare_file_pair(local, remote, options),
        };

        if status != SyncStatus::Identical || is_dir {
            results.push(FileComparison {
                relative_path: path.clone(),
                status,
                local_info: local.cloned(),
                remote_info: remote.cloned(),
                is_dir,
            });
        }
    }

    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    results.retain(|c| options.direction.acts_on(c.status));
    results
}

/// Enumerates the remote tree through the backend, breadth-first.
///
/// Listing failures below the root are logged and skipped; a failure on
/// the root itself aborts comparison with a classified error. The token
/// is checked between directory listings, so cancellation discards
/// partial results without touching any persisted state.
pub async fn scan_remote_tree<B: TransferBackend + ?Sized>(
    backend: &B,
    options: &CompareOptions,
    token: &CancellationToken,
    sink: &ProgressSink,
) -> EngineResult<HashMap<String, FileInfo>> {
    let mut files = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(String::new());

    while let Some(prefix) = queue.pop_front() {
        if token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let entries = match backend.list(&prefix).await {
            Ok(entries) => entries,
            Err(e) if prefix.is_empty() => {
                return Err(EngineError::RootUnreachable {
                    info: classify_backend_error(&e, None),
                });
            }
            Err(e) => {
                warn!("skipping unlistable remote dir {}: {}", prefix, e);
                continue;
            }
        };

        for entry in entries {
            let relative_path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", prefix, entry.name)
            };

            if options.is_excluded(&relative_path) {
                continue;
            }
            if entry.is_dir {
                queue.push_back(relative_path.clone());
            }
            files.insert(relative_path, entry);
        }

        sink(SyncEvent::Scanning {
            side: TreeSide::Remote,
            files_found: files.len(),
        });
    }

    Ok(files)
}

/// Full comparison pipeline: scan both trees, union, classify, order.
pub async fn compare_trees<B: TransferBackend + ?Sized>(
    backend: &B,
    local_root: &Path,
    options: &CompareOptions,
    index: Option<&SyncIndex>,
    token: &CancellationToken,
    sink: &ProgressSink,
) -> EngineResult<Vec<FileComparison>> {
    sink(SyncEvent::ScanStarted {
        side: TreeSide::Local,
    });
    let local_files = scan_local_tree(local_root, options, options.compare_checksum)
        .map_err(|e| EngineError::RootUnreachable {
            info: classify_backend_error(&e, None),
        })?;
    sink(SyncEvent::Scanning {
        side: TreeSide::Local,
        files_found: local_files.len(),
    });

    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    sink(SyncEvent::ScanStarted {
        side: TreeSide::Remote,
    });
    let remote_files = scan_remote_tree(backend, options, token, sink).await?;

    let comparisons = build_comparisons(&local_files, &remote_files, options, index);
    info!(
        "compared {} local / {} remote entries: {} difference(s)",
        local_files.len(),
        remote_files.len(),
        comparisons.len()
    );
    sink(SyncEvent::CompareCompleted {
        differences: comparisons.len(),
    });

    Ok(comparisons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use driftsync_core::SyncDirection;
    use driftsync_store::SyncIndexEntry;

    fn file(size: u64, modified: Option<chrono::DateTime<Utc>>) -> FileInfo {
        FileInfo::file("f", "f", size, modified)
    }

    #[test]
    fn test_one_sided_paths() {
        let options = CompareOptions::default();
        let info = file(1, None);
        assert_eq!(
            compare_file_pair(Some(&info), None, &options),
            SyncStatus::LocalOnly
        );
        assert_eq!(
            compare_file_pair(None, Some(&info), &options),
            SyncStatus::RemoteOnly
        );
    }

    #[test]
    fn test_size_only_criterion_identical_iff_sizes_equal() {
        let options = CompareOptions {
            compare_timestamp: false,
            compare_size: true,
            compare_checksum: false,
            ..CompareOptions::default()
        };

        let now = Some(Utc::now());
        assert_eq!(
            compare_file_pair(Some(&file(100, now)), Some(&file(100, None)), &options),
            SyncStatus::Identical
        );
        assert_eq!(
            compare_file_pair(Some(&file(100, now)), Some(&file(101, now)), &options),
            SyncStatus::SizeMismatch
        );
    }

    #[test]
    fn test_size_difference_resolved_by_timestamp() {
        let options = CompareOptions::default();
        let t = Utc::now();

        let newer_local = file(120, Some(t + Duration::seconds(5)));
        let older_remote = file(100, Some(t));
        assert_eq!(
            compare_file_pair(Some(&newer_local), Some(&older_remote), &options),
            SyncStatus::LocalNewer
        );
        assert_eq!(
            compare_file_pair(Some(&older_remote), Some(&newer_local), &options),
            SyncStatus::RemoteNewer
        );
    }

    #[test]
    fn test_size_difference_within_tolerance_is_mismatch() {
        let options = CompareOptions::default();
        let t = Utc::now();
        let a = file(120, Some(t));
        let b = file(100, Some(t + Duration::seconds(1)));
        assert_eq!(
            compare_file_pair(Some(&a), Some(&b), &options),
            SyncStatus::SizeMismatch
        );
    }

    #[test]
    fn test_checksum_disagreement_without_newer_side_is_conflict() {
        let options = CompareOptions::default().with_checksum(true);
        let t = Utc::now();
        let a = file(100, Some(t)).with_checksum("aaa");
        let b = file(100, Some(t)).with_checksum("bbb");
        assert_eq!(
            compare_file_pair(Some(&a), Some(&b), &options),
            SyncStatus::Conflict
        );
    }

    #[test]
    fn test_checksum_disagreement_with_newer_side() {
        let options = CompareOptions::default().with_checksum(true);
        let t = Utc::now();
        let a = file(100, Some(t + Duration::seconds(10))).with_checksum("aaa");
        let b = file(100, Some(t)).with_checksum("bbb");
        assert_eq!(
            compare_file_pair(Some(&a), Some(&b), &options),
            SyncStatus::LocalNewer
        );
    }

    #[test]
    fn test_directories_never_carry_content_statuses() {
        let options = CompareOptions::default();
        let mut l = FileInfo::dir("d", "d");
        l.size = 4096;
        let r = FileInfo::dir("d", "d");
        assert_eq!(
            compare_file_pair(Some(&l), Some(&r), &options),
            SyncStatus::Identical
        );
    }

    #[test]
    fn test_timestamp_newer_detection() {
        let options = CompareOptions::default();
        let t = Utc::now();
        let l = file(100, Some(t + Duration::seconds(30)));
        let r = file(100, Some(t));
        assert_eq!(
            compare_file_pair(Some(&l), Some(&r), &options),
            SyncStatus::LocalNewer
        );
    }

    #[test]
    fn test_index_detects_true_conflict() {
        let options = CompareOptions::default();
        let base = Utc::now() - Duration::hours(1);
        let mut index = SyncIndex::new("/l", "/r");
        index.record(
            "a.txt",
            SyncIndexEntry {
                size: 100,
                modified: Some(base),
                is_dir: false,
            },
        );

        // Both sides changed since the snapshot
        let l = file(150, Some(base + Duration::minutes(10)));
        let r = file(120, Some(base + Duration::minutes(20)));
        assert_eq!(
            compare_with_index(&l, &r, &options, &index, "a.txt"),
            SyncStatus::Conflict
        );

        // Only local changed
        let unchanged = file(100, Some(base));
        assert_eq!(
            compare_with_index(&l, &unchanged, &options, &index, "a.txt"),
            SyncStatus::LocalNewer
        );

        // Neither changed
        assert_eq!(
            compare_with_index(&unchanged, &unchanged, &options, &index, "a.txt"),
            SyncStatus::Identical
        );

        // Unknown path falls back to the pairwise rule
        assert_eq!(
            compare_with_index(&l, &r, &options, &index, "other.txt"),
            SyncStatus::RemoteNewer
        );
    }

    #[test]
    fn test_build_comparisons_drops_identical_files_keeps_dirs() {
        let t = Utc::now();
        let mut local = HashMap::new();
        let mut remote = HashMap::new();

        local.insert("same.txt".to_string(), file(10, Some(t)));
        remote.insert("same.txt".to_string(), file(10, Some(t)));
        local.insert("docs".to_string(), FileInfo::dir("docs", "docs"));
        remote.insert("docs".to_string(), FileInfo::dir("docs", "docs"));
        local.insert("new.txt".to_string(), file(5, Some(t)));

        let options = CompareOptions::default();
        let comparisons = build_comparisons(&local, &remote, &options, None);

        let paths: Vec<_> = comparisons.iter().map(|c| c.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["docs", "new.txt"]);
        assert_eq!(comparisons[0].status, SyncStatus::Identical);
        assert_eq!(comparisons[1].status, SyncStatus::LocalOnly);
    }

    #[test]
    fn test_build_comparisons_is_sorted_and_direction_filtered() {
        let t = Utc::now();
        let mut local = HashMap::new();
        let mut remote = HashMap::new();

        local.insert("b.txt".to_string(), file(5, Some(t)));
        remote.insert("a.txt".to_string(), file(5, Some(t)));

        let options =
            CompareOptions::default().with_direction(SyncDirection::LocalToRemote);
        let comparisons = build_comparisons(&local, &remote, &options, None);

        // remote_only is dropped for local-to-remote
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].relative_path, "b.txt");
        assert_eq!(comparisons[0].status, SyncStatus::LocalOnly);
    }

    #[test]
    fn test_build_comparisons_respects_excludes() {
        let t = Utc::now();
        let mut local = HashMap::new();
        local.insert("node_modules/x.js".to_string(), file(5, Some(t)));
        local.insert("keep.txt".to_string(), file(5, Some(t)));

        let options = CompareOptions::default();
        let comparisons = build_comparisons(&local, &HashMap::new(), &options, None);
        assert_eq!(comparisons.len(), 1);
        assert_eq!(comparisons[0].relative_path, "keep.txt");
    }
}
