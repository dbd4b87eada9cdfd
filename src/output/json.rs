//! JSON output renderer.
//!
//! Outputs `{"reviews": [...], "summary": {...}}` format.

use crate::models::Summary;
use crate::output::OutputRenderer;

/// JSON output renderer.
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, reviews: &[crate::models::FileReview]) -> String {
        let summary = Summary::from_reviews(reviews);

        let output = serde_json::json!({
            "reviews": reviews,
            "summary": summary,
        });

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}
