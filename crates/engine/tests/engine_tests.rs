// crates/engine/tests/engine_tests.rs
//! End-to-end engine tests against the in-memory backend

use chrono::{Duration, Utc};
use driftsync_backend::{BackendError, MemoryBackend};
use driftsync_core::{CompareOptions, SyncDirection, SyncStatus, VerifyPolicy};
use driftsync_engine::{
    null_sink, EngineError, ResolutionMap, SyncEngine, SyncRunOptions, TransferPlan,
};
use driftsync_resilience::{CancellationToken, RetryPolicy};
use driftsync_store::{
    EntryAction, EntryStatus, IndexStore, JournalStore, SyncJournal, SyncJournalEntry,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    local: TempDir,
    _state: TempDir,
    backend: Arc<MemoryBackend>,
    engine: SyncEngine<MemoryBackend>,
}

impl Fixture {
    fn new() -> Self {
        let local = TempDir::new().expect("local tempdir");
        let state = TempDir::new().expect("state tempdir");
        let backend = Arc::new(MemoryBackend::new());
        let journals = JournalStore::new(state.path().join("journals")).expect("journals");
        let indexes = IndexStore::new(state.path().join("index")).expect("indexes");
        let engine = SyncEngine::new(backend.clone(), journals, indexes);
        Self {
            local,
            _state: state,
            backend,
            engine,
        }
    }

    fn local_root(&self) -> &Path {
        self.local.path()
    }

    fn run_options(&self) -> SyncRunOptions {
        SyncRunOptions::new(self.local_root(), "memory:/")
            .with_retry(fast_retry())
            .with_verify(VerifyPolicy::SizeOnly)
    }

    fn write_local(&self, rel: &str, contents: &[u8]) {
        let path = self.local.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, contents).expect("write");
    }

    async fn compare(&self, options: &CompareOptions) -> Vec<driftsync_core::FileComparison> {
        self.engine
            .compare(
                &self.run_options(),
                options,
                &CancellationToken::new(),
                &null_sink(),
            )
            .await
            .expect("compare")
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_base_delay_ms(1)
        .with_max_delay_ms(5)
        .with_timeout_ms(0)
}

#[tokio::test]
async fn test_end_to_end_single_newer_file() {
    let fx = Fixture::new();

    // Local notes.txt is larger and newer than the remote copy.
    fx.write_local("notes.txt", &vec![b'x'; 120]);
    fx.backend
        .insert_file("notes.txt", &vec![b'y'; 100], Utc::now() - Duration::seconds(120));

    let options = CompareOptions::default();
    let comparisons = fx.compare(&options).await;

    assert_eq!(comparisons.len(), 1);
    assert_eq!(comparisons[0].relative_path, "notes.txt");
    assert_eq!(comparisons[0].status, SyncStatus::LocalNewer);

    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );
    assert_eq!(plan.len(), 1);

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.downloaded, 0);
    assert!(report.errors.is_empty());
    assert_eq!(report.total_bytes, 120);
    assert_eq!(fx.backend.file_data("notes.txt").map(|d| d.len()), Some(120));

    // Full success deletes the journal.
    let journal = fx
        .engine
        .journal_store()
        .load(&fx.local_root().to_string_lossy(), "memory:/")
        .await
        .expect("load");
    assert!(journal.is_none());
}

#[tokio::test]
async fn test_download_and_upload_both_directions() {
    let fx = Fixture::new();

    fx.write_local("local_only.txt", b"local");
    fx.backend.insert_file("remote_only.txt", b"remote!", Utc::now());

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.downloaded, 1);
    assert!(fx.backend.contains_file("local_only.txt"));
    assert!(fx.local_root().join("remote_only.txt").exists());
}

#[tokio::test]
async fn test_transient_failure_retries_until_success() {
    let fx = Fixture::new();
    fx.write_local("flaky.txt", b"data");
    fx.backend
        .inject_failure("flaky.txt", BackendError::Network("connection reset".into()));
    fx.backend
        .inject_failure("flaky.txt", BackendError::Network("connection reset".into()));

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.retried, 2);
    assert!(report.errors.is_empty());
    assert!(fx.backend.contains_file("flaky.txt"));
}

#[tokio::test]
async fn test_nonretryable_failure_continues_batch() {
    let fx = Fixture::new();
    fx.write_local("denied.txt", b"secret");
    fx.write_local("fine.txt", b"ok");
    fx.backend.inject_failure(
        "denied.txt",
        BackendError::PermissionDenied("553 denied".into()),
    );

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    // The failure did not stop the second entry.
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.retried, 0);
    assert!(fx.backend.contains_file("fine.txt"));
    assert!(!fx.backend.contains_file("denied.txt"));

    // The journal stays around for resume.
    let journal = fx
        .engine
        .journal_store()
        .load(&fx.local_root().to_string_lossy(), "memory:/")
        .await
        .expect("load")
        .expect("persisted");
    assert!(!journal.completed);
    assert_eq!(
        journal.entry("denied.txt").map(|e| e.status),
        Some(EntryStatus::Failed)
    );
}

#[tokio::test]
async fn test_cancellation_mid_run_skips_remaining() {
    let fx = Fixture::new();
    for i in 0..100 {
        fx.write_local(&format!("file_{:03}.txt", i), b"abc");
    }

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );
    assert_eq!(plan.len(), 100);

    let token = CancellationToken::new();
    let cancel = token.clone();
    fx.backend.set_transfer_hook(move |count| {
        if count == 40 {
            cancel.cancel();
        }
    });

    let report = fx
        .engine
        .execute(&fx.run_options(), &plan, &token, &null_sink())
        .await
        .expect("execute");

    assert_eq!(report.uploaded, 40);
    assert_eq!(report.skipped, 60);

    let journal = fx
        .engine
        .journal_store()
        .load(&fx.local_root().to_string_lossy(), "memory:/")
        .await
        .expect("load")
        .expect("persisted on cancellation");
    let completed = journal
        .entries
        .iter()
        .filter(|e| e.status == EntryStatus::Completed)
        .count();
    let skipped = journal
        .entries
        .iter()
        .filter(|e| e.status == EntryStatus::Skipped)
        .count();
    assert_eq!(completed, 40);
    assert_eq!(skipped, 60);
}

#[tokio::test]
async fn test_verify_failure_is_recorded_not_success() {
    let fx = Fixture::new();
    fx.backend.insert_file("bad.txt", b"12345", Utc::now());
    fx.backend.corrupt_download("bad.txt");

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    assert_eq!(report.downloaded, 0);
    assert_eq!(report.verify_failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].retryable);

    let journal = fx
        .engine
        .journal_store()
        .load(&fx.local_root().to_string_lossy(), "memory:/")
        .await
        .expect("load")
        .expect("persisted");
    assert_eq!(
        journal.entry("bad.txt").map(|e| e.status),
        Some(EntryStatus::VerifyFailed)
    );
    assert_eq!(journal.entry("bad.txt").map(|e| e.verified), Some(false));
}

#[tokio::test]
async fn test_resume_fully_completed_journal_is_idempotent() {
    let fx = Fixture::new();

    let mut entries = vec![
        SyncJournalEntry::new("a.txt", EntryAction::Upload),
        SyncJournalEntry::new("b.txt", EntryAction::Download),
    ];
    for entry in &mut entries {
        entry.status = EntryStatus::Completed;
        entry.verified = true;
    }
    entries[0].bytes_transferred = 120;
    entries[1].bytes_transferred = 80;

    let local = fx.local_root().to_string_lossy().to_string();
    let journal = SyncJournal::new(
        local.clone(),
        "memory:/",
        SyncDirection::Bidirectional,
        fast_retry(),
        VerifyPolicy::SizeOnly,
        entries,
    );
    fx.engine.journal_store().save(&journal).await.expect("save");

    let report = fx
        .engine
        .resume(&local, "memory:/", &CancellationToken::new(), &null_sink())
        .await
        .expect("resume");

    // No transfers were performed; counts come from the journal.
    assert_eq!(fx.backend.transfer_count(), 0);
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.total_bytes, 200);
    assert!(report.errors.is_empty());

    // Full success deletes the journal.
    assert!(fx
        .engine
        .journal_store()
        .load(&local, "memory:/")
        .await
        .expect("load")
        .is_none());
}

#[tokio::test]
async fn test_resume_retries_failed_entries() {
    let fx = Fixture::new();
    fx.write_local("once.txt", b"payload!");

    // Exhaust the whole attempt budget on the first run.
    for _ in 0..3 {
        fx.backend
            .inject_failure("once.txt", BackendError::Network("reset".into()));
    }

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );
    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.uploaded, 0);

    // Second run: the fault is gone, resume finishes the entry.
    let local = fx.local_root().to_string_lossy().to_string();
    let report = fx
        .engine
        .resume(&local, "memory:/", &CancellationToken::new(), &null_sink())
        .await
        .expect("resume");

    assert_eq!(report.uploaded, 1);
    assert!(report.errors.is_empty());
    assert!(fx.backend.contains_file("once.txt"));
    assert!(fx
        .engine
        .journal_store()
        .load(&local, "memory:/")
        .await
        .expect("load")
        .is_none());
}

#[tokio::test]
async fn test_resume_without_journal_fails() {
    let fx = Fixture::new();
    let result = fx
        .engine
        .resume("/nowhere", "memory:/", &CancellationToken::new(), &null_sink())
        .await;
    assert!(matches!(result, Err(EngineError::NoJournal { .. })));
}

#[tokio::test]
async fn test_unreachable_local_root_aborts_before_transfers() {
    let fx = Fixture::new();
    let run = SyncRunOptions::new("/definitely/not/a/dir", "memory:/");

    let result = fx
        .engine
        .compare(
            &run,
            &CompareOptions::default(),
            &CancellationToken::new(),
            &null_sink(),
        )
        .await;

    assert!(matches!(result, Err(EngineError::RootUnreachable { .. })));
    assert_eq!(fx.backend.transfer_count(), 0);
}

#[tokio::test]
async fn test_empty_directories_created_directly() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.local_root().join("empty/nested")).expect("mkdir");
    fx.backend.insert_dir("remote_empty");

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    assert_eq!(report.dirs_created, 3);
    assert_eq!(report.uploaded, 0);
    assert_eq!(report.downloaded, 0);
    assert!(fx.backend.contains_dir("empty"));
    assert!(fx.backend.contains_dir("empty/nested"));
    assert!(fx.local_root().join("remote_empty").is_dir());
}

#[tokio::test]
async fn test_ancestor_directories_precreated_for_uploads() {
    let fx = Fixture::new();
    fx.write_local("a/b/c/deep.txt", b"deep");

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    fx.engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    assert!(fx.backend.contains_dir("a"));
    assert!(fx.backend.contains_dir("a/b"));
    assert!(fx.backend.contains_dir("a/b/c"));
    assert!(fx.backend.contains_file("a/b/c/deep.txt"));
}

#[tokio::test]
async fn test_timeout_classified_and_retried_to_failure() {
    let fx = Fixture::new();
    fx.write_local("slow.txt", b"zzz");
    fx.backend.set_latency(std::time::Duration::from_millis(80));

    let run = SyncRunOptions::new(fx.local_root(), "memory:/")
        .with_retry(
            RetryPolicy::default()
                .with_max_retries(2)
                .with_base_delay_ms(1)
                .with_timeout_ms(10),
        )
        .with_verify(VerifyPolicy::None);

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );

    let report = fx
        .engine
        .execute(&run, &plan, &CancellationToken::new(), &null_sink())
        .await
        .expect("execute");

    assert_eq!(report.uploaded, 0);
    assert_eq!(report.retried, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, driftsync_core::ErrorKind::Timeout);
    assert!(report.errors[0].retryable);
}

#[tokio::test]
async fn test_conflict_skip_resolution_excludes_entry() {
    let fx = Fixture::new();
    let t = Utc::now();

    // Same size, same mtime, different content checksums: a conflict.
    fx.write_local("clash.txt", b"AAAA");
    fx.backend.insert_file("clash.txt", b"BBBB", t);

    let options = CompareOptions::default().with_checksum(true);
    let comparisons = fx.compare(&options).await;
    assert_eq!(comparisons.len(), 1);
    assert_eq!(comparisons[0].status, SyncStatus::Conflict);

    // Unresolved: nothing to do.
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );
    assert!(plan.is_empty());

    // Resolved to upload: local content wins.
    let mut resolutions = ResolutionMap::new();
    resolutions.set("clash.txt", driftsync_engine::ConflictResolution::Upload);
    let plan =
        TransferPlan::build(&comparisons, SyncDirection::Bidirectional, &resolutions);
    assert_eq!(plan.len(), 1);

    let report = fx
        .engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");
    assert_eq!(report.uploaded, 1);
    assert_eq!(fx.backend.file_data("clash.txt"), Some(b"AAAA".to_vec()));
}

#[tokio::test]
async fn test_index_updated_after_successful_run() {
    let fx = Fixture::new();
    fx.write_local("tracked.txt", b"123456");

    let comparisons = fx.compare(&CompareOptions::default()).await;
    let plan = TransferPlan::build(
        &comparisons,
        SyncDirection::Bidirectional,
        &ResolutionMap::new(),
    );
    fx.engine
        .execute(
            &fx.run_options(),
            &plan,
            &CancellationToken::new(),
            &null_sink(),
        )
        .await
        .expect("execute");

    let index = fx
        .engine
        .index_store()
        .load(&fx.local_root().to_string_lossy(), "memory:/")
        .await
        .expect("load")
        .expect("index written");
    assert_eq!(index.get("tracked.txt").map(|e| e.size), Some(6));
}
