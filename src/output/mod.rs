//! Output renderers: terminal and JSON.

pub mod json;
pub mod terminal;

use crate::models::FileReview;

pub use json::JsonRenderer;
pub use terminal::TerminalRenderer;

/// Trait for rendering review results to an output format.
pub trait OutputRenderer {
    /// Render reviews to a string.
    fn render(&self, reviews: &[FileReview]) -> String;
}
