//! Git CLI wrapper for producing per-file diffs.
//!
//! Shells out to `git` via `tokio::process::Command`.

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("git error: {0}")]
    Git(String),
}

async fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .await
        .map_err(|e| GitError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::Git(format!(
            "git {} failed (exit {}): {stderr}",
            args.first().unwrap_or(&""),
            output.status
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| GitError::Git(format!("git output is not valid UTF-8: {e}")))
}

/// Paths with uncommitted changes, relative to the repo root.
pub async fn changed_files(repo_root: &Path) -> Result<Vec<String>, GitError> {
    let output = run_git(repo_root, &["diff", "--name-only", "HEAD"]).await?;
    Ok(output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Unified diff of the uncommitted changes to one file.
pub async fn file_diff(repo_root: &Path, path: &str) -> Result<String, GitError> {
    run_git(
        repo_root,
        &["diff", "--src-prefix=a/", "--dst-prefix=b/", "HEAD", "--", path],
    )
    .await
}

/// Find the root of the git repository containing `start_dir`.
pub async fn find_repo_root(start_dir: &Path) -> Result<String, GitError> {
    let output = tokio::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(start_dir)
        .output()
        .await
        .map_err(|e| GitError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::Git(format!("not a git repository: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo(p: &Path) {
        for args in [
            vec!["init"],
            vec!["config", "user.email", "test@test.com"],
            vec!["config", "user.name", "Test"],
        ] {
            tokio::process::Command::new("git")
                .args(&args)
                .current_dir(p)
                .output()
                .await
                .unwrap();
        }
        tokio::fs::write(p.join("file.txt"), "hello\n").await.unwrap();
        for args in [vec!["add", "."], vec!["commit", "-m", "init"]] {
            tokio::process::Command::new("git")
                .args(&args)
                .current_dir(p)
                .output()
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn changed_files_in_non_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = changed_files(dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn find_repo_root_non_git() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_repo_root(dir.path()).await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not a git repository"), "got: {err}");
    }

    #[tokio::test]
    async fn changed_files_and_diff_in_real_repo() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        init_repo(p).await;

        // No changes yet
        assert!(changed_files(p).await.unwrap().is_empty());

        tokio::fs::write(p.join("file.txt"), "hello\nworld\n").await.unwrap();

        let changed = changed_files(p).await.unwrap();
        assert_eq!(changed, vec!["file.txt"]);

        let diff = file_diff(p, "file.txt").await.unwrap();
        assert!(diff.contains("+world"), "diff should contain the change");
    }
}
