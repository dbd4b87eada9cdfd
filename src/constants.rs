//! App-wide constants.
//!
//! Centralises the tool name, config paths, and environment variable
//! names so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "redline";

/// Local config filename (e.g. `.redline.toml` in workspace root).
pub const CONFIG_FILENAME: &str = ".redline.toml";

/// Directory name under `~/.config/` for the global config.
pub const CONFIG_DIR: &str = "redline";

/// Service name used for the OS credential store.
pub const KEYRING_SERVICE: &str = "redline";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_BACKEND: &str = "REDLINE_BACKEND";
pub const ENV_MODEL: &str = "REDLINE_MODEL";
pub const ENV_API_KEY: &str = "REDLINE_API_KEY";
pub const ENV_BASE_URL: &str = "REDLINE_BASE_URL";
pub const ENV_LOG: &str = "REDLINE_LOG";
