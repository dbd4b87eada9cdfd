//! Debounced filesystem watching for continuous review.
//!
//! Each changed path gets its own settle timer; another change to the
//! same path before the timer fires resets it, so a burst of editor
//! saves produces one review, not one per write.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session::Session;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Watch the session workspace and call `on_settled` with each
/// workspace-relative path once its changes settle.
///
/// Runs until the cancellation flag is set. Content cache entries for
/// changed paths are invalidated as events arrive, before the debounce
/// fires, so the eventual review reads fresh bytes.
pub async fn run_watch<F, Fut>(
    session: Arc<Session>,
    cancel: Arc<AtomicBool>,
    on_settled: F,
) -> Result<(), WatchError>
where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    // The notify callback runs on its own thread; forward into tokio.
    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => warn!("watch error: {e}"),
        })
        .map_err(|e| WatchError::Watch {
            path: session.root().to_path_buf(),
            source: e,
        })?;

    watcher
        .watch(session.root(), RecursiveMode::Recursive)
        .map_err(|e| WatchError::Watch {
            path: session.root().to_path_buf(),
            source: e,
        })?;

    let debounce = Duration::from_millis(session.config().review.debounce_ms);
    let mut pending: HashMap<String, JoinHandle<()>> = HashMap::new();

    loop {
        if cancel.load(Ordering::SeqCst) {
            break;
        }

        let event = match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => continue, // timeout; re-check cancellation
        };

        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }

        for path in event.paths {
            let Ok(rel) = path.strip_prefix(session.root()) else {
                continue;
            };
            if !session.filter().includes(rel) {
                continue;
            }

            session.loader().invalidate(&path);

            let rel_str = rel.to_string_lossy().to_string();
            // Reset the settle timer for this path.
            if let Some(handle) = pending.remove(&rel_str) {
                handle.abort();
            }
            debug!(path = rel_str, "change detected, debouncing");

            let on_settled = on_settled.clone();
            let spawned_path = rel_str.clone();
            let handle = tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                on_settled(spawned_path).await;
            });
            pending.insert(rel_str, handle);
        }
    }

    for (_, handle) in pending {
        handle.abort();
    }
    Ok(())
}
