//! Long-lived session state.
//!
//! Everything an interactive run mutates lives here explicitly —
//! conversation history, learned project context, the content cache —
//! instead of in process-wide statics, so two sessions never bleed
//! into one another and tests can build as many as they want.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use indexmap::IndexMap;

use crate::backend::{credentials, Backend, BackendError, HttpBackend};
use crate::config::Config;
use crate::content::ContentLoader;
use crate::env::Env;
use crate::filter::InclusionFilter;
use crate::models::{trim_history, ChatMessage, ChatRole};

/// One interactive or batch run over a workspace.
pub struct Session {
    root: PathBuf,
    config: Config,
    backend: Arc<dyn Backend>,
    loader: ContentLoader,
    filter: InclusionFilter,
    history: Mutex<Vec<ChatMessage>>,
    /// Short per-file summaries accumulated during a run, keyed by
    /// relative path, in insertion order.
    project_context: Mutex<IndexMap<String, String>>,
}

impl Session {
    /// Build a session from a loaded config, constructing the HTTP
    /// backend with the resolved credential for the configured variant.
    pub fn new(root: impl Into<PathBuf>, config: Config, env: &Env) -> Result<Self, BackendError> {
        let credential = credentials::resolve(config.backend.kind, env);
        let backend = HttpBackend::new(
            config.backend.kind,
            config.backend.model.clone(),
            config.backend.base_url.clone(),
            credential,
            Duration::from_secs(config.backend.timeout_secs),
        )?;
        Ok(Self::with_backend(root, config, Arc::new(backend)))
    }

    /// Build a session around an arbitrary backend. Tests use this to
    /// inject mocks; `configure` uses it to try candidate settings.
    pub fn with_backend(
        root: impl Into<PathBuf>,
        config: Config,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let loader = ContentLoader::new(config.review.max_file_size);
        let filter = InclusionFilter::new(&config.review.include, &config.review.exclude);
        Self {
            root: root.into(),
            config,
            backend,
            loader,
            filter,
            history: Mutex::new(Vec::new()),
            project_context: Mutex::new(IndexMap::new()),
        }
    }

    /// Swap in a new config, rebuilding the backend, loader, and
    /// filter. History and project context survive the swap.
    pub fn replace_config(&mut self, config: Config, env: &Env) -> Result<(), BackendError> {
        let credential = credentials::resolve(config.backend.kind, env);
        let backend = HttpBackend::new(
            config.backend.kind,
            config.backend.model.clone(),
            config.backend.base_url.clone(),
            credential,
            Duration::from_secs(config.backend.timeout_secs),
        )?;
        self.backend = Arc::new(backend);
        self.loader = ContentLoader::new(config.review.max_file_size);
        self.filter = InclusionFilter::new(&config.review.include, &config.review.exclude);
        self.config = config;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn loader(&self) -> &ContentLoader {
        &self.loader
    }

    pub fn filter(&self) -> &InclusionFilter {
        &self.filter
    }

    /// Append a user/assistant exchange, trimming to the configured
    /// history limit.
    pub fn record_exchange(&self, user: &str, assistant: &str) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.push(ChatMessage::now(ChatRole::User, user));
        history.push(ChatMessage::now(ChatRole::Assistant, assistant));
        trim_history(&mut history, self.config.review.history_limit);
    }

    /// Snapshot of the current conversation history.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Record a one-line summary of a reviewed file for later prompts.
    pub fn record_context(&self, path: &str, summary: impl Into<String>) {
        self.project_context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), summary.into());
    }

    /// Snapshot of accumulated project context, in insertion order.
    pub fn project_context(&self) -> IndexMap<String, String> {
        self.project_context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
