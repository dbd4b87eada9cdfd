//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

use args::OutputFormat;
use redline::models::FileReview;
use redline::output::{JsonRenderer, OutputRenderer, TerminalRenderer};

/// Render reviews in the selected format.
pub fn render(format: OutputFormat, reviews: &[FileReview]) -> String {
    match format {
        OutputFormat::Terminal => TerminalRenderer.render(reviews),
        OutputFormat::Json => JsonRenderer.render(reviews),
    }
}
