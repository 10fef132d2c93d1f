//! Provider adapters: the only code that knows upstream wire formats.
//!
//! Each engine gets one adapter behind the [`ProviderAdapter`] trait. An
//! adapter performs exactly one upstream call per invocation and reports
//! failures as [`ProviderError`] without retrying; the orchestrator owns
//! retries and fallbacks.

mod gemini;
mod openai;

pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::registry::Engine;

// Both upstreams share these when the request does not say otherwise.
pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.6;
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 600;

/// Message role on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of conversation, engine-neutral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Everything an adapter needs for a single attempt.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub trace_id: String,
}

/// Normalized reply from one provider call.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub content: String,
    pub model_used: String,
}

/// Why one attempt failed. Upstream status codes survive unmodified so the
/// orchestrator can surface the real cause after retries are exhausted.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or unusable process configuration, typically a credential.
    #[error("{0}")]
    Configuration(String),
    /// The upstream answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },
    /// The call never produced an upstream status.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    /// HTTP status reported for this failure.
    pub fn status(&self) -> u16 {
        match self {
            ProviderError::Configuration(_) => 500,
            ProviderError::Upstream { status, .. } => *status,
            ProviderError::Transport(_) => 502,
        }
    }
}

/// Uniform surface over engines. `execute` is one attempt, no more.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short name used in logs and trace events.
    fn name(&self) -> &'static str;

    /// Perform one chat call against the upstream.
    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderError>;
}

/// Environment variable holding the credential for an engine.
pub fn credential_env(engine: Engine) -> &'static str {
    match engine {
        Engine::OpenAi => "OPENAI_API_KEY",
        Engine::Gemini => "GEMINI_API_KEY",
    }
}

/// The configured adapters, one optional slot per engine. Cloning shares the
/// underlying adapters.
#[derive(Clone, Default)]
pub struct ProviderSet {
    openai: Option<Arc<dyn ProviderAdapter>>,
    gemini: Option<Arc<dyn ProviderAdapter>>,
}

impl ProviderSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an adapter for every engine whose credential is present.
    /// An empty set is not an error; the relay serves demo streams instead.
    pub fn from_env() -> Self {
        let mut set = Self::default();
        if let Some(adapter) = OpenAiAdapter::from_env() {
            set.openai = Some(Arc::new(adapter));
        }
        if let Some(adapter) = GeminiAdapter::from_env() {
            set.gemini = Some(Arc::new(adapter));
        }
        set
    }

    /// Install an adapter for one engine, builder style.
    pub fn with(mut self, engine: Engine, adapter: Arc<dyn ProviderAdapter>) -> Self {
        match engine {
            Engine::OpenAi => self.openai = Some(adapter),
            Engine::Gemini => self.gemini = Some(adapter),
        }
        self
    }

    pub fn adapter_for(&self, engine: Engine) -> Option<Arc<dyn ProviderAdapter>> {
        match engine {
            Engine::OpenAi => self.openai.clone(),
            Engine::Gemini => self.gemini.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.openai.is_none() && self.gemini.is_none()
    }

    pub fn configured_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if let Some(adapter) = &self.openai {
            names.push(adapter.name());
        }
        if let Some(adapter) = &self.gemini {
            names.push(adapter.name());
        }
        names
    }
}

/// Best-effort extraction of a human-readable message from an upstream error
/// body. Falls back to the raw body, then the status line.
pub(crate) fn upstream_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if !message.is_empty() {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status.canonical_reason().unwrap_or("upstream error").to_string()
}
