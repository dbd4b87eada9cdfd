//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. Environment variables
//! 2. `.redline.toml` in workspace root
//! 3. `~/.config/redline/config.toml` (global defaults)
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::env::Env;
use crate::models::BackendKind;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration. Read-only to the core once loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub review: ReviewOptions,
    pub templates: Templates,
}

/// Backend selection and transport parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// Total request attempts (first try included).
    pub max_retries: u32,
    /// Backoff base; the delay doubles after each failed attempt.
    pub base_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            timeout_secs: 60,
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Review pipeline parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Inclusive per-file byte ceiling.
    pub max_file_size: u64,
    /// Batch enumeration stops once this many files are collected.
    pub max_files: usize,
    /// Concurrent review workers for batch runs.
    pub workers: usize,
    /// Skip the confirmation prompt when applying suggestions.
    pub auto_apply: bool,
    /// Most recent chat messages carried into prompts.
    pub history_limit: usize,
    /// Settle time for watch-mode re-reviews, per path.
    pub debounce_ms: u64,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            include: vec![
                "**/*.{rs,ts,tsx,js,jsx,py,go,java,c,cpp,h,rb,php,cs}".to_string(),
            ],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/.git/**".to_string(),
                "**/dist/**".to_string(),
            ],
            max_file_size: 100_000,
            max_files: 50,
            workers: 5,
            auto_apply: false,
            history_limit: 20,
            debounce_ms: 750,
        }
    }
}

/// Per-operation instruction template overrides. `None` selects the
/// built-in default for that operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    pub review: Option<String>,
    pub refactor: Option<String>,
    pub explain: Option<String>,
    pub generate: Option<String>,
    pub diff_review: Option<String>,
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, workspace-local config, then applies
    /// environment variable overrides.
    pub fn load(workspace_root: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        if let Some(root) = workspace_root {
            let local_path = root.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for
    /// non-default values).
    fn merge(&mut self, other: Config) {
        let db = BackendConfig::default();
        if other.backend.kind != db.kind {
            self.backend.kind = other.backend.kind;
        }
        if other.backend.model != db.model {
            self.backend.model = other.backend.model;
        }
        if other.backend.base_url.is_some() {
            self.backend.base_url = other.backend.base_url;
        }
        if other.backend.timeout_secs != db.timeout_secs {
            self.backend.timeout_secs = other.backend.timeout_secs;
        }
        if other.backend.max_retries != db.max_retries {
            self.backend.max_retries = other.backend.max_retries;
        }
        if other.backend.base_delay_ms != db.base_delay_ms {
            self.backend.base_delay_ms = other.backend.base_delay_ms;
        }

        let dr = ReviewOptions::default();
        if other.review.include != dr.include {
            self.review.include = other.review.include;
        }
        if other.review.exclude != dr.exclude {
            self.review.exclude = other.review.exclude;
        }
        if other.review.max_file_size != dr.max_file_size {
            self.review.max_file_size = other.review.max_file_size;
        }
        if other.review.max_files != dr.max_files {
            self.review.max_files = other.review.max_files;
        }
        if other.review.workers != dr.workers {
            self.review.workers = other.review.workers;
        }
        if other.review.auto_apply {
            self.review.auto_apply = true;
        }
        if other.review.history_limit != dr.history_limit {
            self.review.history_limit = other.review.history_limit;
        }
        if other.review.debounce_ms != dr.debounce_ms {
            self.review.debounce_ms = other.review.debounce_ms;
        }

        if other.templates.review.is_some() {
            self.templates.review = other.templates.review;
        }
        if other.templates.refactor.is_some() {
            self.templates.refactor = other.templates.refactor;
        }
        if other.templates.explain.is_some() {
            self.templates.explain = other.templates.explain;
        }
        if other.templates.generate.is_some() {
            self.templates.generate = other.templates.generate;
        }
        if other.templates.diff_review.is_some() {
            self.templates.diff_review = other.templates.diff_review;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(val) = env.var(crate::constants::ENV_BACKEND) {
            if let Ok(kind) = val.parse::<BackendKind>() {
                self.backend.kind = kind;
            } else {
                eprintln!(
                    "Warning: ignoring invalid {} value: {val}",
                    crate::constants::ENV_BACKEND
                );
            }
        }
        if let Ok(val) = env.var(crate::constants::ENV_MODEL) {
            self.backend.model = val;
        }
        if let Ok(val) = env.var(crate::constants::ENV_BASE_URL) {
            self.backend.base_url = Some(val);
        }
    }
}
