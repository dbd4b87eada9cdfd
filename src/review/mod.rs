//! The review pipeline: load content, build prompts, dispatch to the
//! backend, and extract structured results.

pub mod parser;

use thiserror::Error;
use tracing::{debug, warn};

use crate::backend::{retry, BackendError};
use crate::content::ContentError;
use crate::models::{FileReview, ReviewRequest};
use crate::prompt::{self, Operation, PromptBuilder};
use crate::session::Session;

pub use parser::{parse_review, ParsedReview};

/// Errors from a review operation.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Review one workspace-relative file.
///
/// Oversized and unreadable files produce a placeholder review rather
/// than an error, so a batch containing one still reports on the rest.
pub async fn review_file(session: &Session, path: &str) -> Result<FileReview, ReviewError> {
    let absolute = session.root().join(path);
    let content = match session.loader().load(&absolute).await {
        Ok(content) => content,
        Err(ContentError::FileTooLarge { size, limit, .. }) => {
            debug!(path, size, limit, "skipping oversized file");
            return Ok(FileReview::placeholder(
                path,
                format!("File too large to review ({size} bytes, limit {limit})."),
            ));
        }
        Err(ContentError::Read { source, .. }) => {
            warn!(path, "skipping unreadable file: {source}");
            return Ok(FileReview::placeholder(
                path,
                format!("File could not be read: {source}."),
            ));
        }
    };

    let related = prompt::related_files(
        session.root(),
        path,
        &content,
        session.filter(),
        session.loader(),
    )
    .await;

    let builder = PromptBuilder::new(session.config());
    let prompt = builder.file_review_prompt(path, &content, &related, &session.project_context());

    let reply = dispatch(session, &prompt).await?;
    let parsed = parse_review(&reply);

    session.record_context(path, context_summary(&reply));

    Ok(FileReview {
        path: path.to_string(),
        original: content,
        review: reply,
        suggested: parsed.suggested,
        issues: parsed.issues,
        related: related.into_iter().map(|(p, _)| p).collect(),
    })
}

/// Review a line range of a file. Never mutates anything; the range is
/// clamped to the file and issue lines are shifted back to absolute
/// file positions.
pub async fn review_selection(
    session: &Session,
    path: &str,
    start: usize,
    end: usize,
) -> Result<FileReview, ReviewError> {
    let absolute = session.root().join(path);
    let content = session.loader().load(&absolute).await?;

    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Ok(FileReview::placeholder(
            path,
            "File is empty; nothing to review.",
        ));
    }
    let total = lines.len();
    let start = start.clamp(1, total);
    let end = end.clamp(start, total);
    let snippet = lines[start - 1..end].join("\n");

    let label = format!("{path} (lines {start}-{end})");
    let request = request_for(session, &label, snippet);
    let reply = run_operation(session, Operation::Review, &request).await?;
    let mut parsed = parse_review(&reply);
    // The backend saw the snippet starting at line 1.
    for issue in &mut parsed.issues {
        issue.line = issue.line.saturating_add(start as u32 - 1);
    }

    // Issue lines are absolute, so keep the whole file as the original
    // for anything downstream that counts lines.
    Ok(FileReview {
        path: path.to_string(),
        original: content,
        review: reply,
        suggested: None,
        issues: parsed.issues,
        related: Vec::new(),
    })
}

/// Review a unified diff for one file.
pub async fn review_diff(
    session: &Session,
    path: &str,
    diff: &str,
) -> Result<FileReview, ReviewError> {
    let request = request_for(session, path, diff.to_string());
    let reply = run_operation(session, Operation::DiffReview, &request).await?;
    let parsed = parse_review(&reply);

    Ok(FileReview {
        path: path.to_string(),
        original: diff.to_string(),
        review: reply,
        suggested: None,
        issues: parsed.issues,
        related: Vec::new(),
    })
}

/// Produce a refactored version of a file. The suggested replacement,
/// when present, goes through the mutation gate like any other.
pub async fn refactor_file(session: &Session, path: &str) -> Result<FileReview, ReviewError> {
    let absolute = session.root().join(path);
    let content = session.loader().load(&absolute).await?;

    let request = request_for(session, path, content.clone());
    let reply = run_operation(session, Operation::Refactor, &request).await?;
    let parsed = parse_review(&reply);

    Ok(FileReview {
        path: path.to_string(),
        original: content,
        review: reply,
        suggested: parsed.suggested,
        issues: parsed.issues,
        related: Vec::new(),
    })
}

/// Explain a file in plain language.
pub async fn explain_file(session: &Session, path: &str) -> Result<String, ReviewError> {
    let absolute = session.root().join(path);
    let content = session.loader().load(&absolute).await?;

    let request = request_for(session, path, content);
    Ok(run_operation(session, Operation::Explain, &request).await?)
}

/// Generate code from a description. Returns the full reply and, when
/// the reply carried a fenced block, the extracted code.
pub async fn generate_code(
    session: &Session,
    description: &str,
) -> Result<(String, Option<String>), ReviewError> {
    let request = request_for(session, "", description.to_string());
    let reply = run_operation(session, Operation::Generate, &request).await?;
    let parsed = parse_review(&reply);
    Ok((reply, parsed.suggested))
}

fn request_for(session: &Session, path: &str, content: String) -> ReviewRequest {
    ReviewRequest {
        path: path.to_string(),
        content,
        history: session.history(),
    }
}

/// Build the templated instruction for a request and send it through
/// the retry dispatcher.
async fn run_operation(
    session: &Session,
    op: Operation,
    request: &ReviewRequest,
) -> Result<String, BackendError> {
    let builder = PromptBuilder::new(session.config());
    let prompt = builder.instruction(op, &request.path, &request.content);
    let backend = session.backend();
    let config = &session.config().backend;
    retry::dispatch(
        backend.as_ref(),
        &prompt,
        &request.history,
        config.max_retries,
        std::time::Duration::from_millis(config.base_delay_ms),
    )
    .await
}

async fn dispatch(session: &Session, prompt: &str) -> Result<String, BackendError> {
    let backend = session.backend();
    let config = &session.config().backend;
    retry::dispatch(
        backend.as_ref(),
        prompt,
        &session.history(),
        config.max_retries,
        std::time::Duration::from_millis(config.base_delay_ms),
    )
    .await
}

/// One-line context summary recorded after a file review.
fn context_summary(reply: &str) -> String {
    let line = reply.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut summary: String = line.chars().take(200).collect();
    if summary.is_empty() {
        summary = "reviewed".to_string();
    }
    summary
}
