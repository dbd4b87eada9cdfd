//! Configuration loading and layering.
//!
//! Handles `.redline.toml` loading, environment variable resolution,
//! and merging with proper priority ordering.

pub mod loader;

pub use loader::{BackendConfig, Config, ConfigError, ReviewOptions, Templates};
