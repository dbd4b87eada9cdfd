//! Batch review scheduling: workspace enumeration and parallel
//! execution with bounded concurrency.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ignore::WalkBuilder;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::filter::InclusionFilter;
use crate::models::FileReview;
use crate::progress::{ProgressTracker, TaskStatus};
use crate::review;
use crate::session::Session;

/// Errors from a batch run.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Enumeration produced nothing — distinct from an empty-but-ran
    /// batch so callers can tell the user their filters matched nothing.
    #[error("no files matched the review filters")]
    NoFiles,
}

/// Result of a batch run, including partial results from failed files.
#[derive(Debug)]
pub struct BatchReport {
    /// Reviews in completion order.
    pub reviews: Vec<FileReview>,
    /// Files that failed after retries.
    pub errors: Vec<(String, String)>,
    /// Files skipped because cancellation arrived first.
    pub cancelled: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Aggregate one-liner: files processed, elapsed time, error count.
    pub fn summary_line(&self) -> String {
        format!(
            "{} file(s) reviewed in {:.1}s, {} error(s)",
            self.reviews.len(),
            self.elapsed.as_secs_f64(),
            self.errors.len()
        )
    }
}

/// Enumerate reviewable files under `root`, respecting ignore rules and
/// the inclusion filter, capped at `max_files`.
///
/// Paths come back workspace-relative and de-duplicated.
pub fn enumerate_files(root: &Path, filter: &InclusionFilter, max_files: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in WalkBuilder::new(root).hidden(true).build() {
        if out.len() >= max_files {
            debug!(max_files, "file cap reached, stopping enumeration");
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if !filter.includes(rel) {
            continue;
        }
        let rel_str = rel.to_string_lossy().to_string();
        if !out.contains(&rel_str) {
            out.push(rel_str);
        }
    }
    out.sort();
    out
}

/// Review every matching file in the workspace.
///
/// Runs at most `config.review.workers` reviews concurrently. The
/// cancellation flag is checked before each file starts; files already
/// in flight run to completion.
pub async fn run_batch(
    session: Arc<Session>,
    progress: Arc<ProgressTracker>,
    cancel: Arc<AtomicBool>,
) -> Result<BatchReport, SchedulerError> {
    let files = enumerate_files(
        session.root(),
        session.filter(),
        session.config().review.max_files,
    );
    if files.is_empty() {
        return Err(SchedulerError::NoFiles);
    }

    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(session.config().review.workers.max(1)));
    let mut join_set = JoinSet::new();

    for path in files {
        let session = Arc::clone(&session);
        let progress = Arc::clone(&progress);
        let cancel = Arc::clone(&cancel);
        let sem = Arc::clone(&semaphore);

        join_set.spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return (path, TaskResult::Cancelled);
            };
            if cancel.load(Ordering::SeqCst) {
                return (path, TaskResult::Cancelled);
            }

            // Cheap size pre-check so an oversized file never occupies
            // a worker slot; the loader enforces the same ceiling.
            let limit = session.loader().max_bytes();
            if let Ok(meta) = tokio::fs::metadata(session.root().join(&path)).await {
                if meta.len() > limit {
                    progress.update(&path, TaskStatus::Skipped("too large".to_string()));
                    let review = FileReview::placeholder(
                        path.clone(),
                        format!("File too large to review ({} bytes, limit {limit}).", meta.len()),
                    );
                    return (path, TaskResult::Reviewed(Box::new(review)));
                }
            }

            progress.update(&path, TaskStatus::InProgress);
            match review::review_file(&session, &path).await {
                Ok(review) => {
                    progress.update(&path, TaskStatus::Done);
                    (path, TaskResult::Reviewed(Box::new(review)))
                }
                Err(e) => {
                    // Backend error text can echo response bodies.
                    let message = crate::sanitize::sanitize_plain(&e.to_string());
                    progress.update(&path, TaskStatus::Failed(message.clone()));
                    (path, TaskResult::Failed(message))
                }
            }
        });
    }

    let mut reviews = Vec::new();
    let mut errors = Vec::new();
    let mut cancelled = 0;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((_, TaskResult::Reviewed(review))) => reviews.push(*review),
            Ok((path, TaskResult::Failed(message))) => errors.push((path, message)),
            Ok((_, TaskResult::Cancelled)) => cancelled += 1,
            Err(e) => warn!("review task panicked: {e}"),
        }
    }

    Ok(BatchReport {
        reviews,
        errors,
        cancelled,
        elapsed: started.elapsed(),
    })
}

enum TaskResult {
    Reviewed(Box<FileReview>),
    Failed(String),
    Cancelled,
}
