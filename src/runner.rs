//! Batch orchestration: enumerate MP3 files, fan out over a bounded worker
//! pool, fold per-file outcomes into run statistics.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::fetchers::GenreSource;
use crate::mapping::GenreMap;
use crate::processor::{FileOutcome, ProcessOptions, SkipReason, process_file};
use crate::tags::TagStore;

pub const DEFAULT_JOBS: usize = 4;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub root: PathBuf,
    /// Worker pool size.
    pub jobs: usize,
    pub process: ProcessOptions,
}

/// Snapshot of a run. Owned exclusively by the aggregation loop while the
/// batch is live; callers get a clone in `Finished` and as the return value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total_files: usize,
    pub processed_files: usize,
    pub updated_files: usize,
    pub error_files: usize,
    pub not_found_files: Vec<String>,
}

/// What the runner tells its front-end while working.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Progress { done: usize, total: usize },
    Log(String),
    Finished(BatchStats),
}

/// Process every `.mp3` under `options.root`. The only fatal error is a root
/// that cannot be enumerated; everything per-file becomes an outcome in the
/// stats. Setting `cancel` stops new dispatches, in-flight files still
/// finish.
pub async fn run_batch(
    store: Arc<dyn TagStore>,
    source: Arc<dyn GenreSource>,
    map: Arc<GenreMap>,
    options: BatchOptions,
    events: mpsc::Sender<BatchEvent>,
    cancel: Arc<AtomicBool>,
) -> Result<BatchStats> {
    if !options.root.is_dir() {
        bail!("Not a directory: {}", options.root.display());
    }

    let files = collect_mp3_files(&options.root)?;
    let total = files.len();
    tracing::info!("Found {total} mp3 files under {}", options.root.display());
    let _ = events.send(BatchEvent::Log(format!("Found {total} MP3 files"))).await;

    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<(PathBuf, FileOutcome)>();

    // Single owner of the stats: workers report outcomes, nobody else
    // mutates. Runs alongside dispatch so progress flows while the pool is
    // saturated.
    let aggregator_events = events.clone();
    let aggregator = tokio::spawn(async move {
        let mut stats = BatchStats {
            total_files: total,
            ..Default::default()
        };
        let mut done = 0usize;
        while let Some((path, outcome)) = report_rx.recv().await {
            done += 1;
            fold_outcome(&mut stats, &path, &outcome);
            let _ = aggregator_events
                .send(BatchEvent::Progress { done, total })
                .await;
            let _ = aggregator_events
                .send(BatchEvent::Log(describe_outcome(&path, &outcome)))
                .await;
        }
        stats
    });

    // Clamp on both ends: zero would deadlock dispatch, and anything past
    // tokio's permit cap panics in Semaphore::new.
    let semaphore = Arc::new(Semaphore::new(options.jobs.clamp(1, Semaphore::MAX_PERMITS)));
    let mut workers = JoinSet::new();

    for path in files {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("Cancelled, stopping dispatch");
            break;
        }

        let permit = semaphore.clone().acquire_owned().await?;
        let store = store.clone();
        let source = source.clone();
        let map = map.clone();
        let report_tx = report_tx.clone();
        let process = options.process;

        workers.spawn(async move {
            let _permit = permit;
            let outcome =
                process_file(&path, store.as_ref(), source.as_ref(), &map, process).await;
            // Unbounded channel: a worker never blocks on reporting.
            let _ = report_tx.send((path, outcome));
        });
    }
    drop(report_tx);

    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            tracing::error!("Worker task failed: {e}");
        }
    }

    let stats = aggregator.await.context("Aggregation task failed")?;

    let _ = events.send(BatchEvent::Finished(stats.clone())).await;
    Ok(stats)
}

fn collect_mp3_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|s| s.eq_ignore_ascii_case("mp3"))
                {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                // Only a dead root kills the run; unreadable subtrees are
                // logged and skipped.
                if e.depth() == 0 {
                    return Err(e)
                        .context(format!("Failed to read directory {}", root.display()));
                }
                tracing::warn!("Skipping unreadable entry: {e}");
            }
        }
    }
    Ok(files)
}

fn fold_outcome(stats: &mut BatchStats, path: &Path, outcome: &FileOutcome) {
    stats.processed_files += 1;
    match outcome {
        FileOutcome::Updated { .. } => stats.updated_files += 1,
        FileOutcome::NotFound => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            stats.not_found_files.push(name);
        }
        FileOutcome::Failed(_) => stats.error_files += 1,
        FileOutcome::Skipped(_) => {}
    }
}

fn describe_outcome(path: &Path, outcome: &FileOutcome) -> String {
    let name = path.display();
    match outcome {
        FileOutcome::Updated { genre, year } => match (genre, year) {
            (Some(g), Some(y)) => format!("Updated {name}: genre {g}, year {y}"),
            (Some(g), None) => format!("Updated {name}: genre {g}"),
            (None, Some(y)) => format!("Updated {name}: year {y}"),
            (None, None) => format!("Updated {name}"),
        },
        FileOutcome::Skipped(SkipReason::GenrePresent) => {
            format!("Skipped {name}: genre already set")
        }
        FileOutcome::Skipped(SkipReason::MissingIdentity) => {
            format!("Skipped {name}: missing title or artist")
        }
        FileOutcome::Skipped(SkipReason::Unchanged) => {
            format!("Skipped {name}: already up to date")
        }
        FileOutcome::NotFound => format!("No genre found for {name}"),
        FileOutcome::Failed(msg) => format!("Error processing {name}: {msg}"),
    }
}
