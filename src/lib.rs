//! redline — LLM-assisted file review and rewrite CLI (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod apply;
pub mod backend;
pub mod chat;
pub mod config;
pub mod constants;
pub mod content;
pub mod env;
pub mod filter;
pub mod gitdiff;
pub mod models;
pub mod output;
pub mod progress;
pub mod prompt;
pub mod review;
pub mod sanitize;
pub mod scheduler;
pub mod session;
pub mod watch;
