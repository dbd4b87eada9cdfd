//! Review types: requests, per-file results, and extracted issues.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ChatMessage;

/// A single review invocation, immutable once built.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Target path, relative to the workspace root.
    pub path: String,
    /// Raw content being reviewed (file text, selection, or diff).
    pub content: String,
    /// Conversation history carried into the prompt, oldest first.
    pub history: Vec<ChatMessage>,
}

/// Normalized severity buckets for extracted issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Normalize a free-text severity tag from model output.
    ///
    /// Model replies use tags like "High severity" or "minor"; anything
    /// unrecognized lands in `Info` rather than being dropped.
    pub fn normalize(tag: &str) -> Self {
        let t = tag.to_lowercase();
        if t.contains("high") || t.contains("critical") || t.contains("error") {
            Severity::High
        } else if t.contains("medium") || t.contains("moderate") || t.contains("warn") {
            Severity::Medium
        } else if t.contains("low") || t.contains("minor") {
            Severity::Low
        } else {
            Severity::Info
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// One issue extracted from free-text review output.
///
/// Line numbers come straight from the model and are not validated
/// against file bounds; consumers clamp before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// 1-based line number as reported by the backend.
    pub line: u32,
    /// Free-text severity tag as matched (e.g. "High severity").
    pub severity: String,
    /// Issue description.
    pub message: String,
}

impl Issue {
    /// The normalized severity bucket for this issue.
    pub fn level(&self) -> Severity {
        Severity::normalize(&self.severity)
    }

    /// Clamp the 1-based line number to the given line count.
    pub fn clamped_line(&self, line_count: u32) -> u32 {
        self.line.clamp(1, line_count.max(1))
    }
}

/// The result of reviewing one file. Built once per review cycle and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReview {
    /// Path relative to the workspace root.
    pub path: String,
    /// The content that was reviewed.
    pub original: String,
    /// The full sanitized review text from the backend.
    pub review: String,
    /// Replacement content extracted from the first fenced block, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<String>,
    /// Issues extracted from the review text.
    pub issues: Vec<Issue>,
    /// Paths of related files included in the prompt.
    pub related: Vec<String>,
}

impl FileReview {
    /// Build a placeholder review for a file that was skipped rather
    /// than sent to a backend (oversized, unreadable).
    pub fn placeholder(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original: String::new(),
            review: reason.into(),
            suggested: None,
            issues: Vec::new(),
            related: Vec::new(),
        }
    }
}

/// Summary counts for a batch of reviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub files: usize,
    pub issues: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl Summary {
    /// Compute summary counts from a list of reviews.
    pub fn from_reviews(reviews: &[FileReview]) -> Self {
        let mut s = Summary {
            files: reviews.len(),
            ..Summary::default()
        };
        for review in reviews {
            for issue in &review.issues {
                s.issues += 1;
                match issue.level() {
                    Severity::High => s.high += 1,
                    Severity::Medium => s.medium += 1,
                    Severity::Low => s.low += 1,
                    Severity::Info => s.info += 1,
                }
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn normalize_common_tags() {
        assert_eq!(Severity::normalize("High severity"), Severity::High);
        assert_eq!(Severity::normalize("CRITICAL"), Severity::High);
        assert_eq!(Severity::normalize("Medium severity"), Severity::Medium);
        assert_eq!(Severity::normalize("warning"), Severity::Medium);
        assert_eq!(Severity::normalize("Low severity"), Severity::Low);
        assert_eq!(Severity::normalize("minor"), Severity::Low);
        assert_eq!(Severity::normalize("note"), Severity::Info);
        assert_eq!(Severity::normalize(""), Severity::Info);
    }

    #[test]
    fn issue_level_uses_normalization() {
        let issue = Issue {
            line: 3,
            severity: "High severity".into(),
            message: "leak".into(),
        };
        assert_eq!(issue.level(), Severity::High);
    }

    #[test]
    fn clamped_line_stays_in_bounds() {
        let issue = Issue {
            line: 500,
            severity: "Low severity".into(),
            message: "m".into(),
        };
        assert_eq!(issue.clamped_line(10), 10);
        assert_eq!(issue.clamped_line(0), 1);

        let zero = Issue {
            line: 0,
            severity: "Low severity".into(),
            message: "m".into(),
        };
        assert_eq!(zero.clamped_line(10), 1);
    }

    #[test]
    fn placeholder_has_no_suggestion_or_issues() {
        let review = FileReview::placeholder("big.rs", "File too large to review");
        assert_eq!(review.path, "big.rs");
        assert_eq!(review.review, "File too large to review");
        assert!(review.suggested.is_none());
        assert!(review.issues.is_empty());
    }

    #[test]
    fn summary_counts_by_level() {
        let reviews = vec![FileReview {
            path: "a.rs".into(),
            original: String::new(),
            review: String::new(),
            suggested: None,
            issues: vec![
                Issue {
                    line: 1,
                    severity: "High severity".into(),
                    message: "a".into(),
                },
                Issue {
                    line: 2,
                    severity: "Low severity".into(),
                    message: "b".into(),
                },
                Issue {
                    line: 3,
                    severity: "unknown".into(),
                    message: "c".into(),
                },
            ],
            related: vec![],
        }];
        let s = Summary::from_reviews(&reviews);
        assert_eq!(s.files, 1);
        assert_eq!(s.issues, 3);
        assert_eq!(s.high, 1);
        assert_eq!(s.low, 1);
        assert_eq!(s.info, 1);
        assert_eq!(s.medium, 0);
    }
}
