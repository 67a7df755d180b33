// crates/engine/src/executor.rs
//! Sequential transfer execution with retry, verification, and
//! journaling.
//!
//! One logical worker walks the plan in order. Per entry the state
//! machine is:
//!
//! `pending -> syncing -> {retrying <-> syncing}* -> (verifying ->)?
//! {success | verify_failed | error} | skipped`
//!
//! Per-item failures never abort the batch; only cancellation ends a run
//! early, and then the in-flight attempt finishes before remaining
//! pending entries become skipped.

use crate::classify::classify_backend_error;
use crate::compare::compare_trees;
use crate::error::{EngineError, EngineResult};
use crate::index::merge_completed;
use crate::plan::TransferPlan;
use crate::progress::{ProgressSink, SyncEvent};
use crate::verify::verify_local_transfer;
use chrono::Utc;
use driftsync_backend::TransferBackend;
use driftsync_core::{
    CompareOptions, ErrorKind, FileComparison, SyncErrorInfo, SyncReport, VerifyPolicy,
};
use driftsync_resilience::{with_timeout, CancellationToken, RetryPolicy};
use driftsync_store::{
    checkpoint_interval, EntryAction, EntryStatus, IndexStore, JournalStore, SyncIndex,
    SyncJournal,
};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Batches above this size switch to minimal-delay pacing with periodic
/// keep-alives, purely for throughput
const LARGE_BATCH_THRESHOLD: usize = 200;
/// Settle delay between transfers in large-batch mode
const LARGE_BATCH_DELAY_MS: u64 = 10;
/// Keep-alive cadence when the backend does not specify one
const DEFAULT_KEEPALIVE_EVERY: usize = 25;

/// Per-run settings tying a local root to a remote identity
#[derive(Debug, Clone)]
pub struct SyncRunOptions {
    /// Local tree root
    pub local_root: PathBuf,
    /// Remote identity used to key the journal and index (the backend is
    /// already rooted there)
    pub remote_root: String,
    pub retry: RetryPolicy,
    pub verify: VerifyPolicy,
    /// Refine conflict detection with the last-synced index snapshot
    pub use_index: bool,
}

impl SyncRunOptions {
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            retry: RetryPolicy::default(),
            verify: VerifyPolicy::SizeOnly,
            use_index: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_verify(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_index(mut self, use_index: bool) -> Self {
        self.use_index = use_index;
        self
    }
}

/// The reconciliation engine: comparison, execution, and resume against
/// one transfer backend
pub struct SyncEngine<B: TransferBackend> {
    backend: Arc<B>,
    journals: JournalStore,
    indexes: IndexStore,
}

impl<B: TransferBackend> SyncEngine<B> {
    pub fn new(backend: Arc<B>, journals: JournalStore, indexes: IndexStore) -> Self {
        Self {
            backend,
            journals,
            indexes,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn journal_store(&self) -> &JournalStore {
        &self.journals
    }

    pub fn index_store(&self) -> &IndexStore {
        &self.indexes
    }

    /// Compares the local tree against the remote tree.
    ///
    /// Fails with a classified error when either root is unreachable;
    /// cancellation mid-scan discards partial results without touching
    /// persisted state.
    pub async fn compare(
        &self,
        run: &SyncRunOptions,
        options: &CompareOptions,
        token: &CancellationToken,
        sink: &ProgressSink,
    ) -> EngineResult<Vec<FileComparison>> {
        let index = if run.use_index {
            self.indexes
                .load(&run.local_root.to_string_lossy(), &run.remote_root)
                .await?
        } else {
            None
        };

        compare_trees(
            self.backend.as_ref(),
            &run.local_root,
            options,
            index.as_ref(),
            token,
            sink,
        )
        .await
    }

    /// Executes a plan under a fresh journal
    pub async fn execute(
        &self,
        run: &SyncRunOptions,
        plan: &TransferPlan,
        token: &CancellationToken,
        sink: &ProgressSink,
    ) -> EngineResult<SyncReport> {
        let mut journal = SyncJournal::new(
            run.local_root.to_string_lossy(),
            run.remote_root.clone(),
            plan.direction,
            run.retry.clone(),
            run.verify,
            plan.to_journal_entries(),
        );

        info!(
            "starting sync of {} entr(ies): {} -> {} via {}",
            plan.len(),
            journal.local_path,
            journal.remote_path,
            self.backend.name()
        );

        self.run_plan(&run.local_root, plan, &mut journal, token, sink)
            .await
    }

    /// Resumes the persisted journal for a path pair.
    ///
    /// Entries already completed or skipped are tallied into the report
    /// without re-transferring; failed and interrupted entries re-enter
    /// the state machine with a fresh attempt budget. The journal's
    /// recorded retry and verify policies are used, not the caller's
    /// current defaults.
    pub async fn resume(
        &self,
        local_path: &str,
        remote_path: &str,
        token: &CancellationToken,
        sink: &ProgressSink,
    ) -> EngineResult<SyncReport> {
        let mut journal = self
            .journals
            .load(local_path, remote_path)
            .await?
            .ok_or_else(|| EngineError::NoJournal {
                local: local_path.to_string(),
                remote: remote_path.to_string(),
            })?;

        info!(
            "resuming journal {} ({}/{} settled)",
            journal.id,
            journal.settled_count(),
            journal.entries.len()
        );

        let plan = TransferPlan::from_journal(&journal);
        let local_root = PathBuf::from(local_path);
        self.run_plan(&local_root, &plan, &mut journal, token, sink)
            .await
    }

    async fn run_plan(
        &self,
        local_root: &Path,
        plan: &TransferPlan,
        journal: &mut SyncJournal,
        token: &CancellationToken,
        sink: &ProgressSink,
    ) -> EngineResult<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::new();
        let retry = journal.retry_policy.clone();
        let verify = journal.verify_policy;

        // Failed or interrupted entries from a previous run re-enter the
        // machine with a clean slate.
        for entry in &mut journal.entries {
            if matches!(
                entry.status,
                EntryStatus::Failed | EntryStatus::VerifyFailed | EntryStatus::InProgress
            ) {
                entry.status = EntryStatus::Pending;
                entry.attempts = 0;
                entry.last_error = None;
            }
        }

        // Already-settled entries count toward the report up front.
        for entry in &journal.entries {
            match entry.status {
                EntryStatus::Completed => {
                    if entry.is_dir {
                        report.dirs_created += 1;
                    } else {
                        match entry.action {
                            EntryAction::Upload => report.uploaded += 1,
                            EntryAction::Download => report.downloaded += 1,
                        }
                    }
                    report.total_bytes += entry.bytes_transferred;
                }
                EntryStatus::Skipped => report.skipped += 1,
                _ => {}
            }
        }

        journal.touch();
        self.journals.save(journal).await?;

        self.precreate_directories(local_root, plan).await;

        let total = plan.len();
        let interval = checkpoint_interval(total);
        let pacing = self.backend.transfer_pacing();
        let large_batch = total > LARGE_BATCH_THRESHOLD;
        let keepalive_every = if pacing.keepalive_every > 0 {
            pacing.keepalive_every
        } else {
            DEFAULT_KEEPALIVE_EVERY
        };
        let mut since_checkpoint = 0usize;
        let mut since_keepalive = 0usize;

        for (index, item) in plan.transfers.iter().enumerate() {
            let path = item.relative_path().to_string();

            let already_settled = journal
                .entry(&path)
                .map(|e| e.status.is_settled())
                .unwrap_or(false);
            if already_settled {
                continue;
            }

            if token.is_cancelled() {
                info!("sync cancelled after {} of {} entries", index, total);
                let mut newly_skipped = 0;
                for entry in &mut journal.entries {
                    if !entry.status.is_terminal() {
                        entry.status = EntryStatus::Skipped;
                        newly_skipped += 1;
                    }
                }
                report.skipped += newly_skipped;
                break;
            }

            sink(SyncEvent::EntryStarted {
                relative_path: path.clone(),
                action: item.action,
                index,
                total,
            });

            let moved_bytes = if item.is_dir() {
                self.create_directory_entry(local_root, item.action, &path, journal)
                    .await;
                report.dirs_created += 1;
                false
            } else {
                self.run_file_entry(local_root, item.action, &path, journal, &retry, verify, &mut report)
                    .await
            };

            if let Some(entry) = journal.entry(&path) {
                sink(SyncEvent::EntryFinished {
                    relative_path: path.clone(),
                    status: entry.status,
                });
            }

            // Settle delay only after entries that actually opened a data
            // channel; skipped and failed-before-transfer entries move on
            // immediately.
            if moved_bytes && pacing.is_paced() {
                if large_batch {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        LARGE_BATCH_DELAY_MS,
                    ))
                    .await;
                    since_keepalive += 1;
                    if since_keepalive >= keepalive_every {
                        if let Err(e) = self.backend.keepalive().await {
                            debug!("keepalive failed: {}", e);
                        }
                        since_keepalive = 0;
                    }
                } else {
                    tokio::time::sleep(pacing.inter_transfer_delay).await;
                }
            }

            since_checkpoint += 1;
            if since_checkpoint >= interval {
                journal.touch();
                self.journals.save(journal).await?;
                since_checkpoint = 0;
                sink(SyncEvent::CheckpointWritten {
                    settled: journal.settled_count(),
                    total,
                });
            }
        }

        let cancelled = token.is_cancelled();
        let success = !cancelled && journal.is_fully_settled() && !journal.has_failures();

        journal.touch();
        if success {
            journal.completed = true;
            self.journals
                .delete(&journal.local_path, &journal.remote_path)
                .await?;
        } else {
            journal.completed = false;
            self.journals.save(journal).await?;
        }

        self.update_index(plan, journal).await?;

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "sync finished: {} up, {} down, {} skipped, {} error(s) in {} ms",
            report.uploaded,
            report.downloaded,
            report.skipped,
            report.errors.len(),
            report.duration_ms
        );
        sink(SyncEvent::RunFinished {
            uploaded: report.uploaded,
            downloaded: report.downloaded,
            errors: report.errors.len(),
        });

        Ok(report)
    }

    /// Creates every ancestor directory implied by the plan, shallowest
    /// first. Failures are treated as "already exists" and swallowed.
    async fn precreate_directories(&self, local_root: &Path, plan: &TransferPlan) {
        for dir in plan.remote_dirs_to_precreate() {
            if let Err(e) = self.backend.mkdir(&dir).await {
                debug!("remote mkdir {} ignored: {}", dir, e);
            }
        }
        for dir in plan.local_dirs_to_precreate() {
            let path = local_path_for(local_root, &dir);
            if let Err(e) = tokio::fs::create_dir_all(&path).await {
                debug!("local mkdir {} ignored: {}", path.display(), e);
            }
        }
    }

    /// Standalone directory entries are created directly and settle
    /// without entering the retry state machine.
    async fn create_directory_entry(
        &self,
        local_root: &Path,
        action: EntryAction,
        path: &str,
        journal: &mut SyncJournal,
    ) {
        let result = match action {
            EntryAction::Upload => self.backend.mkdir(path).await.err().map(|e| e.to_string()),
            EntryAction::Download => {
                let target = local_path_for(local_root, path);
                tokio::fs::create_dir_all(&target)
                    .await
                    .err()
                    .map(|e| e.to_string())
            }
        };
        if let Some(message) = result {
            debug!("mkdir {} ignored: {}", path, message);
        }

        if let Some(entry) = journal.entry_mut(path) {
            entry.status = EntryStatus::Completed;
            entry.attempts = 1;
        }
    }

    /// Runs one file entry through the retry state machine. Returns true
    /// when at least one attempt moved bytes.
    #[allow(clippy::too_many_arguments)]
    async fn run_file_entry(
        &self,
        local_root: &Path,
        action: EntryAction,
        path: &str,
        journal: &mut SyncJournal,
        retry: &RetryPolicy,
        verify: VerifyPolicy,
        report: &mut SyncReport,
    ) -> bool {
        let local_abs = local_path_for(local_root, path);
        let budget = retry.attempt_budget();
        let mut moved_bytes = false;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if let Some(entry) = journal.entry_mut(path) {
                entry.status = EntryStatus::InProgress;
                entry.attempts = attempt;
            }

            let outcome = with_timeout(retry.timeout(), async {
                match action {
                    EntryAction::Upload => self.backend.upload(&local_abs, path).await,
                    EntryAction::Download => self.backend.download(path, &local_abs).await,
                }
            })
            .await;

            let result: Result<u64, SyncErrorInfo> = match outcome {
                Ok(Ok(bytes)) => Ok(bytes),
                Ok(Err(backend_err)) => Err(classify_backend_error(&backend_err, Some(path))),
                Err(_) => Err(SyncErrorInfo::new(
                    ErrorKind::Timeout,
                    format!("transfer timed out after {} ms", retry.timeout_ms),
                    true,
                    Some(path),
                )),
            };

            match result {
                Ok(bytes) => {
                    moved_bytes = true;
                    report.total_bytes += bytes;
                    self.settle_successful_transfer(
                        action, path, &local_abs, bytes, journal, verify, report,
                    )
                    .await;
                    return moved_bytes;
                }
                Err(info) => {
                    warn!(
                        "{} of {} failed (attempt {}/{}): {}",
                        match action {
                            EntryAction::Upload => "upload",
                            EntryAction::Download => "download",
                        },
                        path,
                        attempt,
                        budget,
                        info.message
                    );

                    let retry_next = info.retryable && attempt < budget;
                    if let Some(entry) = journal.entry_mut(path) {
                        entry.last_error = Some(info.clone());
                        if !retry_next {
                            entry.status = EntryStatus::Failed;
                        }
                    }

                    if retry_next {
                        report.retried += 1;
                        let delay = retry.delay_for_attempt(attempt);
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    report.record_error(info);
                    return moved_bytes;
                }
            }
        }
    }

    /// Marks a successful transfer, running verification for downloads
    /// when the policy asks for it. Uploads are verified by backend
    /// acceptance.
    #[allow(clippy::too_many_arguments)]
    async fn settle_successful_transfer(
        &self,
        action: EntryAction,
        path: &str,
        local_abs: &Path,
        bytes: u64,
        journal: &mut SyncJournal,
        verify: VerifyPolicy,
        report: &mut SyncReport,
    ) {
        let (expected_size, expected_mtime, expected_checksum) = journal
            .entry(path)
            .map(|e| {
                (
                    e.expected_size.unwrap_or(bytes),
                    e.expected_mtime,
                    e.expected_checksum.clone(),
                )
            })
            .unwrap_or((bytes, None, None));

        if action == EntryAction::Download && verify.is_enabled() {
            let result = verify_local_transfer(
                local_abs,
                expected_size,
                expected_mtime,
                expected_checksum.as_deref(),
                verify,
            )
            .await;

            if let Some(entry) = journal.entry_mut(path) {
                entry.bytes_transferred = bytes;
                if result.passed {
                    entry.status = EntryStatus::Completed;
                    entry.verified = true;
                } else {
                    entry.status = EntryStatus::VerifyFailed;
                    entry.verified = false;
                }
            }

            if result.passed {
                report.downloaded += 1;
            } else {
                report.verify_failed += 1;
                let info = SyncErrorInfo::new(
                    ErrorKind::Unknown,
                    format!("verification failed: {}", result.message),
                    true,
                    Some(path),
                );
                if let Some(entry) = journal.entry_mut(path) {
                    entry.last_error = Some(info.clone());
                }
                report.record_error(info);
            }
            return;
        }

        if let Some(entry) = journal.entry_mut(path) {
            entry.bytes_transferred = bytes;
            entry.status = EntryStatus::Completed;
            entry.verified = action == EntryAction::Upload;
        }
        match action {
            EntryAction::Upload => report.uploaded += 1,
            EntryAction::Download => report.downloaded += 1,
        }
    }

    /// Merges successful entries into the sync index after the run
    async fn update_index(
        &self,
        plan: &TransferPlan,
        journal: &SyncJournal,
    ) -> EngineResult<()> {
        let any_completed = journal
            .entries
            .iter()
            .any(|e| e.status == EntryStatus::Completed);
        if !any_completed {
            return Ok(());
        }

        let mut index = self
            .indexes
            .load(&journal.local_path, &journal.remote_path)
            .await?
            .unwrap_or_else(|| SyncIndex::new(&journal.local_path, &journal.remote_path));

        index.last_sync = Utc::now();
        merge_completed(&mut index, plan, journal);
        self.indexes.save(&index).await?;
        Ok(())
    }
}

/// Joins a slash-separated relative path onto a platform path
pub(crate) fn local_path_for(local_root: &Path, relative_path: &str) -> PathBuf {
    let mut path = local_root.to_path_buf();
    for component in relative_path.split('/') {
        if !component.is_empty() {
            path.push(component);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_for_joins_components() {
        let root = Path::new("/tmp/root");
        assert_eq!(
            local_path_for(root, "a/b/c.txt"),
            PathBuf::from("/tmp/root/a/b/c.txt")
        );
        assert_eq!(local_path_for(root, "top.txt"), PathBuf::from("/tmp/root/top.txt"));
    }

    #[test]
    fn test_run_options_builders() {
        let run = SyncRunOptions::new("/l", "/r")
            .with_verify(VerifyPolicy::Full)
            .with_index(true)
            .with_retry(RetryPolicy::default().with_max_retries(9));

        assert_eq!(run.verify, VerifyPolicy::Full);
        assert!(run.use_index);
        assert_eq!(run.retry.max_retries, 9);
    }
}
