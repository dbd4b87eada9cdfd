//! Progress reporting for terminal output.
//!
//! Provides a live-updating file status display with colored checkmarks
//! and failure indicators. Designed for interactive terminals; silenced
//! with `--no-progress`.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Mutex;

use colored::Colorize;

/// Status of a single file review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued, waiting to start.
    Pending,
    /// Currently being reviewed.
    InProgress,
    /// Completed successfully.
    Done,
    /// Skipped (for example, over the size ceiling).
    Skipped(String),
    /// Failed after retries.
    Failed(String),
}

/// Tracks and renders live progress for file reviews.
///
/// Thread-safe — meant to be shared across async tasks via `Arc`.
pub struct ProgressTracker {
    inner: Mutex<ProgressState>,
    /// If false, all output is suppressed.
    enabled: bool,
}

struct ProgressState {
    /// file → status (sorted for stable rendering).
    files: BTreeMap<String, TaskStatus>,
    /// Number of lines we last printed (for clearing).
    rendered_lines: usize,
}

impl ProgressTracker {
    pub fn new(files: &[String], enabled: bool) -> Self {
        let mut file_map = BTreeMap::new();
        for f in files {
            file_map.insert(f.clone(), TaskStatus::Pending);
        }
        Self {
            inner: Mutex::new(ProgressState {
                files: file_map,
                rendered_lines: 0,
            }),
            enabled,
        }
    }

    /// Update the status of a file and re-render.
    pub fn update(&self, file: &str, status: TaskStatus) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.files.insert(file.to_string(), status);
        if self.enabled {
            Self::render(&mut state);
        }
    }

    /// Print the initial file listing.
    pub fn start(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::render(&mut state);
    }

    /// Clear progress lines and print a final per-file summary.
    pub fn finish(&self, total_issues: usize) {
        if !self.enabled {
            return;
        }
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::clear_lines(state.rendered_lines);
        state.rendered_lines = 0;

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for (file, status) in &state.files {
            let (icon, status_text) = match status {
                TaskStatus::Failed(reason) => ("✖".red().bold().to_string(), reason.red().to_string()),
                TaskStatus::Skipped(reason) => {
                    ("–".yellow().bold().to_string(), reason.yellow().to_string())
                }
                _ => ("✔".green().bold().to_string(), "done".green().to_string()),
            };
            let _ = writeln!(handle, "  {icon} {} {status_text}", file.dimmed());
        }

        let _ = writeln!(handle);
        if total_issues == 0 {
            let _ = writeln!(handle, "  {} {}", "✔".green().bold(), "No issues found.".green());
        }
    }

    /// Render the current state to stderr, clearing previous output.
    fn render(state: &mut ProgressState) {
        let stderr = io::stderr();
        let mut handle = stderr.lock();

        Self::clear_lines(state.rendered_lines);

        let mut lines = 0;
        let _ = writeln!(
            handle,
            "  {} Reviewing {} file(s)",
            "▸".cyan().bold(),
            state.files.len()
        );
        lines += 1;

        for (file, status) in &state.files {
            let (icon, status_text) = match status {
                TaskStatus::Pending => ("○".dimmed().to_string(), "waiting".dimmed().to_string()),
                TaskStatus::InProgress => {
                    ("◌".cyan().bold().to_string(), "reviewing…".cyan().to_string())
                }
                TaskStatus::Done => ("✔".green().bold().to_string(), "done".green().to_string()),
                TaskStatus::Skipped(reason) => {
                    ("–".yellow().bold().to_string(), reason.yellow().to_string())
                }
                TaskStatus::Failed(reason) => {
                    ("✖".red().bold().to_string(), reason.red().to_string())
                }
            };
            let _ = writeln!(handle, "    {icon} {} {status_text}", file.dimmed());
            lines += 1;
        }

        let _ = handle.flush();
        state.rendered_lines = lines;
    }

    /// Move cursor up and clear `n` lines.
    fn clear_lines(n: usize) {
        if n == 0 {
            return;
        }
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for _ in 0..n {
            let _ = write!(handle, "\x1b[1A\x1b[2K");
        }
        let _ = handle.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_disabled_no_panic() {
        let tracker = ProgressTracker::new(&["file.rs".to_string()], false);
        tracker.start();
        tracker.update("file.rs", TaskStatus::InProgress);
        tracker.update("file.rs", TaskStatus::Done);
        tracker.finish(0);
    }

    #[test]
    fn tracker_tracks_state() {
        let tracker = ProgressTracker::new(
            &["a.rs".to_string(), "b.rs".to_string()],
            false, // disabled to avoid terminal output in tests
        );
        tracker.update("a.rs", TaskStatus::InProgress);
        tracker.update("a.rs", TaskStatus::Done);
        tracker.update("b.rs", TaskStatus::Failed("API error".to_string()));

        let state = tracker.inner.lock().unwrap();
        assert_eq!(state.files["a.rs"], TaskStatus::Done);
        assert!(matches!(&state.files["b.rs"], TaskStatus::Failed(_)));
    }

    #[test]
    fn skipped_status_is_recorded() {
        let tracker = ProgressTracker::new(&["big.rs".to_string()], false);
        tracker.update("big.rs", TaskStatus::Skipped("too large".to_string()));

        let state = tracker.inner.lock().unwrap();
        assert_eq!(
            state.files["big.rs"],
            TaskStatus::Skipped("too large".to_string())
        );
    }
}
