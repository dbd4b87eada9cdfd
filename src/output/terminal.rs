//! Terminal renderer: styled flowing text grouped by file.

use colored::Colorize;

use crate::models::{FileReview, Severity, Summary};
use crate::output::OutputRenderer;

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl OutputRenderer for TerminalRenderer {
    fn render(&self, reviews: &[FileReview]) -> String {
        if reviews.is_empty() {
            return format!("{}", "  ✔ No files reviewed.\n".green());
        }

        let mut output = String::new();
        let mut sorted: Vec<&FileReview> = reviews.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        for review in sorted {
            output.push_str(&format!("{}\n", review.path.bold().underline()));

            if review.issues.is_empty() {
                // Placeholders (oversized files) land here too; show
                // the review text so the user sees why.
                let first_line = review.review.lines().next().unwrap_or("no issues");
                output.push_str(&format!("  {} {first_line}\n", "ℹ".blue().bold()));
            }

            // Model-reported line numbers are unvalidated; clamp to the
            // reviewed content before showing them.
            let line_count = review.original.lines().count() as u32;
            let mut issues = review.issues.clone();
            issues.sort_by_key(|i| i.line);
            for issue in &issues {
                let (icon, severity_str) = match issue.level() {
                    Severity::High => (
                        "✖".red().bold().to_string(),
                        "high".red().bold().to_string(),
                    ),
                    Severity::Medium => (
                        "⚠".yellow().bold().to_string(),
                        "medium".yellow().bold().to_string(),
                    ),
                    Severity::Low => (
                        "ℹ".blue().bold().to_string(),
                        "low".blue().bold().to_string(),
                    ),
                    Severity::Info => (
                        "ℹ".dimmed().to_string(),
                        "info".dimmed().to_string(),
                    ),
                };
                output.push_str(&format!(
                    "  {} {} {} — {}\n",
                    icon,
                    severity_str,
                    format!("line {}", issue.clamped_line(line_count)).bold(),
                    issue.message
                ));
            }

            if review.suggested.is_some() {
                output.push_str(&format!(
                    "  {} {}\n",
                    "→".cyan(),
                    "a suggested rewrite is available".cyan()
                ));
            }
            output.push('\n');
        }

        let summary = Summary::from_reviews(reviews);
        output.push_str(&format!("{}\n", "───────────────────────────────────".dimmed()));
        output.push_str(&format!(
            " {} file(s), {} issue(s): {} high, {} medium, {} low, {} info\n",
            summary.files.to_string().bold(),
            summary.issues.to_string().bold(),
            summary.high.to_string().red().bold(),
            summary.medium.to_string().yellow().bold(),
            summary.low.to_string().blue().bold(),
            summary.info.to_string().dimmed(),
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Issue;

    fn review_with_issues() -> FileReview {
        FileReview {
            path: "src/main.rs".into(),
            original: "// filler\n".repeat(50),
            review: "text".into(),
            suggested: Some("fn main() { run(); }".into()),
            issues: vec![
                Issue {
                    line: 42,
                    severity: "High severity".into(),
                    message: "This is broken".into(),
                },
                Issue {
                    line: 3,
                    severity: "Low severity".into(),
                    message: "naming".into(),
                },
            ],
            related: vec![],
        }
    }

    #[test]
    fn render_empty() {
        let output = TerminalRenderer.render(&[]);
        assert!(output.contains("No files reviewed"));
    }

    #[test]
    fn render_groups_and_sorts_issues_by_line() {
        let output = TerminalRenderer.render(&[review_with_issues()]);
        assert!(output.contains("src/main.rs"));
        let low_pos = output.find("line 3").unwrap();
        let high_pos = output.find("line 42").unwrap();
        assert!(low_pos < high_pos);
        assert!(output.contains("suggested rewrite"));
        assert!(output.contains("2 issue(s)"));
    }

    #[test]
    fn render_clamps_out_of_range_lines() {
        let mut review = review_with_issues();
        review.original = "one line\n".into();
        let output = TerminalRenderer.render(&[review]);
        assert!(output.contains("line 1"));
        assert!(!output.contains("line 42"));
    }

    #[test]
    fn render_placeholder_shows_reason() {
        let review = FileReview::placeholder("big.rs", "File too large to review (5 bytes, limit 1).");
        let output = TerminalRenderer.render(&[review]);
        assert!(output.contains("File too large to review"));
    }
}
