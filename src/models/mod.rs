//! Shared types used across all modules.
//!
//! Defines the core data structures for reviews, issues, chat history,
//! and backend identity. Other modules import from here rather than
//! reaching into each other's internals.

pub mod chat;
pub mod review;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use chat::{trim_history, ChatMessage, ChatRole};
pub use review::{FileReview, Issue, ReviewRequest, Severity, Summary};

/// Supported LLM backend services.
///
/// A single tagged value selects the active wire format; the rest of
/// the system is blind to which variant is in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI chat completions API (`choices[0].message.content`).
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    /// Local Ollama server (`response`).
    Ollama,
    /// Self-hosted review service with a path-embedded token (`text`).
    Hosted,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::OpenAi => write!(f, "openai"),
            BackendKind::Ollama => write!(f, "ollama"),
            BackendKind::Hosted => write!(f, "hosted"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "ollama" => Ok(BackendKind::Ollama),
            "hosted" => Ok(BackendKind::Hosted),
            other => Err(format!(
                "unsupported backend: '{other}'. Supported: openai, ollama, hosted"
            )),
        }
    }
}

impl BackendKind {
    /// All selectable backends, in the order shown by `configure`.
    pub fn all() -> [BackendKind; 3] {
        [BackendKind::OpenAi, BackendKind::Ollama, BackendKind::Hosted]
    }
}
