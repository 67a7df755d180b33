// FILE: crates/cli/src/commands.rs
//! Subcommand handlers for the driftsync binary

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use driftsync_backend::{LocalDirBackend, SpeedLimits, TransferBackend};
use driftsync_core::{CompareOptions, SyncDirection, SyncReport, SyncStatus, VerifyPolicy};
use driftsync_engine::{
    BulkStrategy, ProgressSink, ResolutionMap, SyncEngine, SyncEvent, SyncRunOptions,
    TransferPlan,
};
use driftsync_resilience::{CancellationToken, RetryPolicy};
use driftsync_store::{
    apply_profile, sign_journal, verify_journal_signature, EntryAction, IndexStore,
    JournalStore, ProfileStore,
};
use std::sync::Arc;

fn stores(state_dir: Option<&str>) -> Result<(JournalStore, IndexStore)> {
    match state_dir {
        Some(dir) => Ok((
            JournalStore::new(format!("{}/journals", dir))?,
            IndexStore::new(format!("{}/index", dir))?,
        )),
        None => Ok((JournalStore::open_default()?, IndexStore::open_default()?)),
    }
}

fn pair(matches: &ArgMatches) -> Result<(String, String)> {
    let local = matches
        .get_one::<String>("local")
        .ok_or_else(|| anyhow!("--local is required"))?;
    let remote = matches
        .get_one::<String>("remote")
        .ok_or_else(|| anyhow!("--remote is required"))?;
    Ok((local.clone(), remote.clone()))
}

fn compare_options(matches: &ArgMatches) -> Result<CompareOptions> {
    let direction: SyncDirection = matches
        .get_one::<String>("direction")
        .map(|s| s.as_str())
        .unwrap_or("bidirectional")
        .parse()?;

    let mut options = CompareOptions::default()
        .with_direction(direction)
        .with_checksum(matches.get_flag("checksum"));

    if let Some(extra) = matches.get_many::<String>("exclude") {
        options.exclude_patterns.extend(extra.cloned());
    }

    Ok(options)
}

fn engine_for(
    remote: &str,
    with_checksums: bool,
    state_dir: Option<&str>,
) -> Result<SyncEngine<LocalDirBackend>> {
    let backend = Arc::new(LocalDirBackend::new(remote).with_checksums(with_checksums));
    let (journals, indexes) = stores(state_dir)?;
    Ok(SyncEngine::new(backend, journals, indexes))
}

fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Identical => "identical",
        SyncStatus::LocalNewer => "local newer",
        SyncStatus::RemoteNewer => "remote newer",
        SyncStatus::LocalOnly => "local only",
        SyncStatus::RemoteOnly => "remote only",
        SyncStatus::Conflict => "CONFLICT",
        SyncStatus::SizeMismatch => "size mismatch",
    }
}

fn print_sink() -> ProgressSink {
    Arc::new(|event| match event {
        SyncEvent::Scanning { side, files_found } => {
            eprint!("\rscanning {:?}: {} entries found", side, files_found);
        }
        SyncEvent::CompareCompleted { differences } => {
            eprintln!("\rcompare complete: {} difference(s)", differences);
        }
        SyncEvent::EntryStarted {
            relative_path,
            action,
            index,
            total,
        } => {
            let arrow = match action {
                EntryAction::Upload => "↑",
                EntryAction::Download => "↓",
            };
            println!("[{}/{}] {} {}", index + 1, total, arrow, relative_path);
        }
        SyncEvent::EntryRetrying {
            relative_path,
            attempt,
            delay,
        } => {
            println!("    retrying {} (attempt {}, waiting {:?})", relative_path, attempt, delay);
        }
        SyncEvent::CheckpointWritten { settled, total } => {
            log::debug!("checkpoint: {}/{} settled", settled, total);
        }
        _ => {}
    })
}

fn print_report(report: &SyncReport) {
    println!(
        "\n{} uploaded, {} downloaded, {} skipped, {} dir(s) created in {} ms ({} bytes)",
        report.uploaded,
        report.downloaded,
        report.skipped,
        report.dirs_created,
        report.duration_ms,
        report.total_bytes
    );
    if report.retried > 0 {
        println!("{} retry transition(s)", report.retried);
    }
    if report.verify_failed > 0 {
        println!("{} verification failure(s)", report.verify_failed);
    }
    if !report.errors.is_empty() {
        println!("\nerrors by kind:");
        for (kind, errors) in report.errors_by_kind() {
            println!("  {} ({}):", kind, errors.len());
            for error in errors {
                let path = error.file_path.as_deref().unwrap_or("-");
                println!("    {}: {}", path, error.message);
            }
        }
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ncancelling after the current transfer...");
            cancel.cancel();
        }
    });
    token
}

pub async fn compare(matches: &ArgMatches, state_dir: Option<&str>) -> Result<()> {
    let (local, remote) = pair(matches)?;
    let options = compare_options(matches)?;
    let engine = engine_for(&remote, options.compare_checksum, state_dir)?;

    let run = SyncRunOptions::new(&local, &remote).with_index(matches.get_flag("use-index"));
    let comparisons = engine
        .compare(&run, &options, &CancellationToken::new(), &print_sink())
        .await
        .context("comparison failed")?;

    if comparisons.is_empty() {
        println!("trees are in sync");
        return Ok(());
    }

    for comparison in &comparisons {
        let marker = if comparison.is_dir { "/" } else { "" };
        println!(
            "{:<14} {}{}",
            status_label(comparison.status),
            comparison.relative_path,
            marker
        );
    }

    let conflicts = comparisons
        .iter()
        .filter(|c| c.status.needs_resolution())
        .count();
    println!("\n{} difference(s), {} conflict(s)", comparisons.len(), conflicts);
    Ok(())
}

pub async fn sync(matches: &ArgMatches, state_dir: Option<&str>) -> Result<()> {
    let (local, remote) = pair(matches)?;

    let mut options = compare_options(matches)?;
    let mut retry = RetryPolicy::default()
        .with_max_retries(
            matches
                .get_one::<String>("retries")
                .map(|s| s.parse())
                .transpose()
                .context("invalid --retries")?
                .unwrap_or(3),
        )
        .with_timeout_ms(
            matches
                .get_one::<String>("timeout")
                .map(|s| s.parse())
                .transpose()
                .context("invalid --timeout")?
                .unwrap_or(30_000),
        );
    let mut verify: VerifyPolicy = matches
        .get_one::<String>("verify")
        .map(|s| s.as_str())
        .unwrap_or("size_only")
        .parse()?;

    if let Some(profile_id) = matches.get_one::<String>("profile") {
        let profiles = ProfileStore::open_default()?.load().await?;
        if let Some((p_options, p_retry, p_verify)) = apply_profile(&profiles, profile_id) {
            options = p_options.with_direction(options.direction);
            retry = p_retry;
            verify = p_verify;
            println!("applied profile '{}'", profile_id);
        } else if profile_id != driftsync_store::CUSTOM_PROFILE_ID {
            bail!("unknown profile: {}", profile_id);
        }
    }

    let engine = engine_for(&remote, options.compare_checksum, state_dir)?;

    let limits = SpeedLimits::new(
        matches
            .get_one::<String>("limit-down")
            .map(|s| s.parse())
            .transpose()
            .context("invalid --limit-down")?
            .unwrap_or(0),
        matches
            .get_one::<String>("limit-up")
            .map(|s| s.parse())
            .transpose()
            .context("invalid --limit-up")?
            .unwrap_or(0),
    );
    if !limits.is_unlimited() {
        engine
            .backend()
            .set_speed_limits(limits)
            .await
            .map_err(|e| anyhow!("cannot apply speed limits: {}", e))?;
    }

    let run = SyncRunOptions::new(&local, &remote)
        .with_retry(retry)
        .with_verify(verify)
        .with_index(matches.get_flag("use-index"));

    let sink = print_sink();
    let comparisons = engine
        .compare(&run, &options, &CancellationToken::new(), &sink)
        .await
        .context("comparison failed")?;

    let mut resolutions = ResolutionMap::new();
    if let Some(strategy) = matches.get_one::<String>("resolve") {
        let strategy = match strategy.as_str() {
            "keep-newer" => BulkStrategy::KeepNewer,
            "upload" => BulkStrategy::AllUpload,
            "download" => BulkStrategy::AllDownload,
            _ => BulkStrategy::SkipAll,
        };
        resolutions.apply_bulk(&comparisons, strategy);
    }

    let unresolved = comparisons
        .iter()
        .filter(|c| c.status.needs_resolution() && resolutions.get(&c.relative_path).is_none())
        .count();
    if unresolved > 0 {
        println!(
            "{} conflict(s) left unresolved; pass --resolve to act on them",
            unresolved
        );
    }

    let plan = TransferPlan::build(&comparisons, options.direction, &resolutions);
    if plan.is_empty() {
        println!("nothing to transfer");
        return Ok(());
    }

    if matches.get_flag("dry-run") {
        println!("would transfer {} entr(ies):", plan.len());
        for transfer in &plan.transfers {
            let arrow = match transfer.action {
                EntryAction::Upload => "↑",
                EntryAction::Download => "↓",
            };
            let marker = if transfer.is_dir() { "/" } else { "" };
            println!("  {} {}{}", arrow, transfer.relative_path(), marker);
        }
        return Ok(());
    }

    let token = cancel_on_ctrl_c();
    let report = engine
        .execute(&run, &plan, &token, &sink)
        .await
        .context("sync failed")?;
    print_report(&report);
    Ok(())
}

pub async fn resume(matches: &ArgMatches, state_dir: Option<&str>) -> Result<()> {
    let (local, remote) = pair(matches)?;
    let engine = engine_for(&remote, false, state_dir)?;

    let token = cancel_on_ctrl_c();
    let report = engine
        .resume(&local, &remote, &token, &print_sink())
        .await
        .context("resume failed")?;
    print_report(&report);
    Ok(())
}

pub async fn journals_list(state_dir: Option<&str>) -> Result<()> {
    let (journals, _) = stores(state_dir)?;
    let summaries = journals.list_all().await?;

    if summaries.is_empty() {
        println!("no persisted journals");
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{}  {} <-> {}  {}/{} settled  updated {}",
            &summary.id[..8],
            summary.local_path,
            summary.remote_path,
            summary.settled_entries,
            summary.total_entries,
            summary.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

pub async fn journals_cleanup(matches: &ArgMatches, state_dir: Option<&str>) -> Result<()> {
    let days: u32 = matches
        .get_one::<String>("days")
        .map(|s| s.parse())
        .transpose()
        .context("invalid --days")?
        .unwrap_or(30);

    let (journals, _) = stores(state_dir)?;
    let removed = journals.cleanup_older_than(days).await?;
    println!("removed {} journal(s)", removed);
    Ok(())
}

pub async fn journals_clear(state_dir: Option<&str>) -> Result<()> {
    let (journals, _) = stores(state_dir)?;
    let removed = journals.clear_all().await?;
    println!("removed {} journal(s)", removed);
    Ok(())
}

fn decode_key(matches: &ArgMatches) -> Result<Vec<u8>> {
    let key_hex = matches
        .get_one::<String>("key")
        .ok_or_else(|| anyhow!("--key is required"))?;
    hex::decode(key_hex).context("signing key must be hex-encoded")
}

pub async fn journals_sign(matches: &ArgMatches, state_dir: Option<&str>) -> Result<()> {
    let (local, remote) = pair(matches)?;
    let key = decode_key(matches)?;

    let (journals, _) = stores(state_dir)?;
    let journal = journals
        .load(&local, &remote)
        .await?
        .ok_or_else(|| anyhow!("no journal found for this path pair"))?;

    let signature = sign_journal(&journal, &key)?;
    let sig_path = journals.signature_path(&local, &remote);
    tokio::fs::write(&sig_path, signature.as_bytes())
        .await
        .with_context(|| format!("cannot write {}", sig_path.display()))?;

    println!("{}", signature);
    Ok(())
}

pub async fn journals_verify(matches: &ArgMatches, state_dir: Option<&str>) -> Result<()> {
    let (local, remote) = pair(matches)?;
    let key = decode_key(matches)?;

    let (journals, _) = stores(state_dir)?;
    let journal = journals
        .load(&local, &remote)
        .await?
        .ok_or_else(|| anyhow!("no journal found for this path pair"))?;

    let sig_path = journals.signature_path(&local, &remote);
    let stored = tokio::fs::read_to_string(&sig_path)
        .await
        .with_context(|| format!("cannot read {}", sig_path.display()))?;

    if verify_journal_signature(&journal, &key, &stored)? {
        println!("signature OK");
        Ok(())
    } else {
        bail!("signature MISMATCH");
    }
}

pub async fn profiles_list() -> Result<()> {
    let profiles = ProfileStore::open_default()?.load().await?;
    for profile in profiles {
        println!(
            "{:<10} {:<10} retries={} verify={:?} checksum={}",
            profile.id,
            profile.name,
            profile.retry.max_retries,
            profile.verify,
            profile.options.compare_checksum,
        );
    }
    println!("{:<10} (keeps the current configuration)", driftsync_store::CUSTOM_PROFILE_ID);
    Ok(())
}
