//! Backend adapters: one contract over three interchangeable LLM services.
//!
//! The active service is a single tagged [`BackendKind`] value; variants
//! differ only in endpoint construction, credential placement, and the
//! JSON field names on the wire. Everything downstream of this module is
//! blind to which variant is in use.

pub mod credentials;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{BackendKind, ChatMessage, ChatRole};

/// Errors from a backend adapter.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("{backend} API error: {message}")]
    Api { backend: String, message: String },

    #[error("{backend} request failed after {attempts} attempt(s)")]
    Exhausted { backend: String, attempts: u32 },
}

/// The uniform request/response contract over the LLM services.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable backend name for logs and errors.
    fn name(&self) -> String;

    /// Send a prompt (with optional conversation history) and return
    /// the raw reply text.
    async fn send(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, BackendError>;

    /// Probe connectivity. Never fails; all errors collapse to `false`.
    async fn test_connection(&self) -> bool {
        self.send("Reply with the single word: ok", &[]).await.is_ok()
    }
}

/// Validate a credential against the variant's rule.
///
/// OpenAI keys carry a literal `sk-` prefix; the hosted service takes
/// any token of at least eight characters; Ollama needs none.
pub fn validate_credential(kind: BackendKind, credential: Option<&str>) -> Result<(), String> {
    match kind {
        BackendKind::OpenAi => match credential {
            Some(key) if key.starts_with("sk-") => Ok(()),
            Some(_) => Err("OpenAI API keys start with 'sk-'".to_string()),
            None => Err("an OpenAI API key is required".to_string()),
        },
        BackendKind::Ollama => Ok(()),
        BackendKind::Hosted => match credential {
            Some(token) if token.len() >= 8 => Ok(()),
            Some(_) => Err("hosted service tokens are at least 8 characters".to_string()),
            None => Err("a hosted service token is required".to_string()),
        },
    }
}

/// Default base URL for each variant.
pub fn default_base_url(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::OpenAi => "https://api.openai.com",
        BackendKind::Ollama => "http://localhost:11434",
        BackendKind::Hosted => "http://localhost:8080",
    }
}

/// HTTP-backed adapter for all three service variants.
pub struct HttpBackend {
    kind: BackendKind,
    model: String,
    base_url: String,
    credential: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build an adapter, validating the credential for the variant.
    pub fn new(
        kind: BackendKind,
        model: impl Into<String>,
        base_url: Option<String>,
        credential: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        validate_credential(kind, credential.as_deref()).map_err(BackendError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Api {
                backend: kind.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = base_url
            .unwrap_or_else(|| default_base_url(kind).to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            kind,
            model: model.into(),
            base_url,
            credential,
            client,
        })
    }

    fn endpoint(&self) -> String {
        match self.kind {
            BackendKind::OpenAi => format!("{}/v1/chat/completions", self.base_url),
            BackendKind::Ollama => format!("{}/api/generate", self.base_url),
            // The hosted service embeds the token in the path.
            BackendKind::Hosted => format!(
                "{}/v1/ask/{}",
                self.base_url,
                self.credential.as_deref().unwrap_or_default()
            ),
        }
    }

    fn body(&self, prompt: &str, history: &[ChatMessage]) -> Value {
        match self.kind {
            BackendKind::OpenAi => {
                let mut messages: Vec<Value> = history
                    .iter()
                    .map(|m| {
                        json!({
                            "role": match m.role {
                                ChatRole::User => "user",
                                ChatRole::Assistant => "assistant",
                            },
                            "content": m.text,
                        })
                    })
                    .collect();
                messages.push(json!({ "role": "user", "content": prompt }));
                json!({ "model": self.model, "messages": messages })
            }
            BackendKind::Ollama => json!({
                "model": self.model,
                "prompt": flatten_history(prompt, history),
                "stream": false,
            }),
            BackendKind::Hosted => json!({
                "question": flatten_history(prompt, history),
            }),
        }
    }

    fn api_error(&self, message: impl Into<String>) -> BackendError {
        BackendError::Api {
            backend: self.kind.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> String {
        self.kind.to_string()
    }

    async fn send(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, BackendError> {
        let mut request = self
            .client
            .post(self.endpoint())
            .json(&self.body(prompt, history));

        // Ollama is unauthenticated and the hosted token travels in the
        // path; only OpenAI uses a bearer header.
        if self.kind == BackendKind::OpenAi {
            if let Some(key) = &self.credential {
                request = request.bearer_auth(key);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.api_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.api_error(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| self.api_error(format!("invalid JSON response: {e}")))?;

        Ok(extract_reply(self.kind, &value))
    }
}

/// Project history onto alternating `User:` / `Assistant:` lines and
/// terminate with the new user turn. Used by the single-string wire
/// formats (Ollama and the hosted service).
fn flatten_history(prompt: &str, history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return prompt.to_string();
    }
    let mut out = String::new();
    for msg in history {
        out.push_str(&format!("{}: {}\n", msg.role, msg.text));
    }
    out.push_str(&format!("User: {prompt}"));
    out
}

/// Pull the reply text out of a response document.
///
/// Tries the variant's own field first, then the other known fields,
/// and falls back to stringifying the raw JSON so a schema drift never
/// turns into an error.
fn extract_reply(kind: BackendKind, value: &Value) -> String {
    let primary = match kind {
        BackendKind::OpenAi => openai_content(value),
        BackendKind::Ollama => value.get("response").and_then(Value::as_str),
        BackendKind::Hosted => value.get("text").and_then(Value::as_str),
    };

    primary
        .or_else(|| value.get("text").and_then(Value::as_str))
        .or_else(|| value.get("response").and_then(Value::as_str))
        .or_else(|| openai_content(value))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn openai_content(value: &Value) -> Option<&str> {
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}
