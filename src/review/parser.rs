//! Extraction of structured findings from free-text review output.
//!
//! This is a best-effort heuristic over whatever the backend returned,
//! paired with the instruction wording in `prompt`; it never fails on
//! malformed input — lines that don't match simply contribute nothing.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Issue;

/// Matches the first triple-fenced code block, tolerating an optional
/// language label on the opening fence.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[a-zA-Z0-9_+-]*\n?(.*?)```").unwrap());

/// Matches issue lines of the form produced by the review template:
/// `Line <N>: <severity> severity - <message>`.
static ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*Line\s+(\d+):\s*([A-Za-z]+\s+severity)\s*-\s*(.+?)\s*$").unwrap()
});

/// Structured fields extracted from one review reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReview {
    /// Content of the first fenced block, fences stripped and trimmed.
    /// `None` when the reply has no fenced block — never `Some("")`
    /// standing in for "no suggestion".
    pub suggested: Option<String>,
    /// Every line that matched the issue grammar, in reply order.
    pub issues: Vec<Issue>,
}

/// Parse a review reply.
///
/// When a reply contains multiple fenced blocks only the first is
/// taken as the suggested replacement; this is deliberate, documented
/// behavior (a reply may contain an example block and a fix block, and
/// there is no reliable way to tell which is which).
pub fn parse_review(text: &str) -> ParsedReview {
    let suggested = FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    let issues = ISSUE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let line: u32 = caps.get(1)?.as_str().parse().ok()?;
            Some(Issue {
                line,
                severity: caps.get(2)?.as_str().to_string(),
                message: caps.get(3)?.as_str().to_string(),
            })
        })
        .collect();

    ParsedReview { suggested, issues }
}
