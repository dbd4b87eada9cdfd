//! The mutation gate: the only code path that writes to a reviewed
//! file.
//!
//! Ordering is strict — show the diff, get confirmation, back the file
//! up, then write. The backup lands on disk before the original is
//! touched, so a failed write never costs the user their file.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use thiserror::Error;
use tracing::info;

/// Errors from applying a suggestion.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: io::Error,
    },
}

/// How an apply attempt ended.
#[derive(Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Suggestion was byte-identical to the file; nothing shown,
    /// nothing written, no backup.
    Unchanged,
    /// The user declined the diff.
    Cancelled,
    /// Written, with the pre-change copy at `backup`.
    Applied { backup: PathBuf },
}

/// Confirmation seam. Interactive runs prompt on the terminal; batch
/// runs with `auto_apply` accept everything.
pub trait Confirm {
    fn confirm(&self, path: &str, diff: &str) -> bool;
}

/// Prints the diff and asks `Apply? [y/N]` on the terminal.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, path: &str, diff: &str) -> bool {
        println!("\n{}", format!("Proposed change to {path}:").bold());
        for line in diff.lines() {
            if line.starts_with('+') {
                println!("{}", line.green());
            } else if line.starts_with('-') {
                println!("{}", line.red());
            } else {
                println!("{line}");
            }
        }
        print!("{} ", "Apply? [y/N]".yellow());
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Accepts every diff without prompting.
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _path: &str, _diff: &str) -> bool {
        true
    }
}

/// Render a unified line diff between the current and suggested content.
pub fn render_diff(original: &str, suggested: &str) -> String {
    let diff = TextDiff::from_lines(original, suggested);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.value());
        if !change.value().ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Run a suggested replacement through the gate.
pub fn apply(
    path: &Path,
    original: &str,
    suggested: &str,
    confirm: &dyn Confirm,
) -> Result<GateOutcome, MutationError> {
    apply_with_writer(path, original, suggested, confirm, write_atomic)
}

/// Same gate with the final write injectable, so tests can fail it and
/// check the backup ordering.
fn apply_with_writer<W>(
    path: &Path,
    original: &str,
    suggested: &str,
    confirm: &dyn Confirm,
    writer: W,
) -> Result<GateOutcome, MutationError>
where
    W: FnOnce(&Path, &str) -> io::Result<()>,
{
    if original == suggested {
        return Ok(GateOutcome::Unchanged);
    }

    let diff = render_diff(original, suggested);
    if !confirm.confirm(&path.display().to_string(), &diff) {
        return Ok(GateOutcome::Cancelled);
    }

    let backup = backup_path(path);
    std::fs::write(&backup, original).map_err(|e| MutationError::Backup {
        path: backup.clone(),
        source: e,
    })?;

    writer(path, suggested).map_err(|e| MutationError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(path = %path.display(), backup = %backup.display(), "applied suggestion");
    Ok(GateOutcome::Applied { backup })
}

/// `<path>.bak.<epoch-ms>` next to the original.
fn backup_path(path: &Path) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak.{millis}"));
    PathBuf::from(name)
}

/// Write via a temp file in the same directory, then rename over the
/// target, so readers never see a half-written file.
fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Deny;

    impl Confirm for Deny {
        fn confirm(&self, _path: &str, _diff: &str) -> bool {
            false
        }
    }

    fn backups_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().contains(".bak."))
            .collect()
    }

    #[test]
    fn identical_content_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "same").unwrap();

        let outcome = apply(&file, "same", "same", &AutoConfirm).unwrap();
        assert_eq!(outcome, GateOutcome::Unchanged);
        assert!(backups_in(dir.path()).is_empty());
    }

    #[test]
    fn declined_diff_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "before").unwrap();

        let outcome = apply(&file, "before", "after", &Deny).unwrap();
        assert_eq!(outcome, GateOutcome::Cancelled);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "before");
        assert!(backups_in(dir.path()).is_empty());
    }

    #[test]
    fn accepted_diff_writes_with_exactly_one_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "before").unwrap();

        let outcome = apply(&file, "before", "after", &AutoConfirm).unwrap();
        let GateOutcome::Applied { backup } = outcome else {
            panic!("expected Applied");
        };
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "after");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "before");
        assert_eq!(backups_in(dir.path()).len(), 1);
    }

    #[test]
    fn failed_write_preserves_original_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "before").unwrap();

        let result = apply_with_writer(&file, "before", "after", &AutoConfirm, |_, _| {
            Err(io::Error::other("disk full"))
        });
        assert!(matches!(result, Err(MutationError::Write { .. })));
        // Original bytes intact, backup already on disk.
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "before");
        assert_eq!(backups_in(dir.path()).len(), 1);
    }

    #[test]
    fn render_diff_marks_changes() {
        let diff = render_diff("a\nb\nc\n", "a\nX\nc\n");
        assert!(diff.contains("-b"));
        assert!(diff.contains("+X"));
        assert!(diff.contains(" a"));
    }

    #[test]
    fn backup_path_appends_suffix() {
        let p = backup_path(Path::new("/tmp/file.rs"));
        let s = p.to_string_lossy();
        assert!(s.starts_with("/tmp/file.rs.bak."));
    }
}
