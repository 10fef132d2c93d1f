//! Orchestrator: one request in, one result out, never a thrown error.
//!
//! Drives SELECT, COMPOSE, CALL and VALIDATE for each chat request with a
//! bounded retry loop. Every failed or empty attempt toggles the model
//! through the registry fallback before the next try. Callers always get a
//! [`ChatResult`]; upstream failure is data, not an exception.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::persona::{self, PersonaProfile, TaskManifest};
use crate::provider::{
    PromptMessage, ProviderError, ProviderReply, ProviderRequest, ProviderSet, Role,
    credential_env,
};
use crate::registry::{self, Engine};
use crate::routing::{self, RETRY_POLICY, RetryPolicy};
use crate::trace::{TraceBuffer, TraceEvent, preview};

const PREVIEW_CHARS: usize = 160;
const EXHAUSTED_STATUS: u16 = 502;
const EXHAUSTED_MESSAGE: &str = "Upstream error after retries";

// ============================================================================
// Wire types
// ============================================================================

/// Inbound chat request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub engine: Option<Engine>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub messages: Vec<PromptMessage>,
    pub persona: Option<PersonaBlock>,
    pub system_instruction: Option<String>,
    pub trace_id: Option<String>,
}

/// Caller-supplied persona snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaBlock {
    pub user_profile: Option<PersonaProfile>,
    pub task_manifest: Option<TaskManifest>,
}

/// Outcome of one orchestration. Exactly one of `content` and `error`
/// carries meaning: success has non-empty content and no error, failure has
/// empty content plus `status` and `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResult {
    pub content: String,
    pub model_used: String,
    pub engine: Engine,
    pub attempts: u32,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResult {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    providers: ProviderSet,
    trace: Arc<TraceBuffer>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(providers: ProviderSet, trace: Arc<TraceBuffer>) -> Self {
        Self::with_policy(providers, trace, RETRY_POLICY)
    }

    pub fn with_policy(providers: ProviderSet, trace: Arc<TraceBuffer>, policy: RetryPolicy) -> Self {
        Self { providers, trace, policy }
    }

    /// Run one request to completion.
    pub async fn orchestrate(&self, input: ChatRequest) -> ChatResult {
        let trace_id = input
            .trace_id
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(new_trace_id);

        let (user_profile, task_manifest) = match &input.persona {
            Some(block) => (block.user_profile.as_ref(), block.task_manifest.as_ref()),
            None => (None, None),
        };
        let intent = task_manifest.and_then(|t| t.intent.as_deref());

        // SELECT
        let selection = routing::select_engine_and_model(input.engine, input.model.as_deref(), intent);
        let engine = selection.engine;
        debug!(engine = %engine, model = selection.model, %trace_id, "engine selected");

        // COMPOSE: an explicit instruction wins over an inline system message;
        // either way exactly one system turn leads the history.
        let base = input
            .system_instruction
            .as_deref()
            .or_else(|| {
                input
                    .messages
                    .iter()
                    .find(|m| m.role == Role::System)
                    .map(|m| m.content.as_str())
            });
        let system = persona::build_system_instruction(base, user_profile, task_manifest);

        let mut history = Vec::with_capacity(input.messages.len() + 1);
        history.push(PromptMessage { role: Role::System, content: system.clone() });
        history.extend(input.messages.iter().filter(|m| m.role != Role::System).cloned());

        self.trace.record(
            TraceEvent::new("orchestrator", "request")
                .field("traceId", trace_id.as_str())
                .field("engine", engine.as_str())
                .field("model", selection.model)
                .field("personaPreview", preview(&system, PREVIEW_CHARS))
                .field("parts", history.len()),
        );

        // CALL / VALIDATE loop
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempts: u32 = 0;
        let mut model: String = selection.model.to_string();
        let mut last_error: Option<ProviderError> = None;

        while attempts < max_attempts {
            attempts += 1;
            self.trace.record(
                TraceEvent::new("orchestrator", "attempt")
                    .field("traceId", trace_id.as_str())
                    .field("attempt", attempts)
                    .field("engine", engine.as_str())
                    .field("model", model.as_str()),
            );

            match self.call_engine(engine, &model, &history, &input, &trace_id).await {
                Ok(reply) if reply.content.trim().is_empty() => {
                    self.trace.record(
                        TraceEvent::new("orchestrator", "empty_content")
                            .field("traceId", trace_id.as_str())
                            .field("attempt", attempts)
                            .field("engine", engine.as_str())
                            .field("model", model.as_str()),
                    );
                    model = registry::fallback_for(engine, &model).to_string();
                }
                Ok(reply) => {
                    self.trace.record(
                        TraceEvent::new("orchestrator", "response")
                            .field("traceId", trace_id.as_str())
                            .field("attempt", attempts)
                            .field("engine", engine.as_str())
                            .field("model", reply.model_used.as_str())
                            .field("chars", reply.content.len())
                            .field("summary", preview(&reply.content, PREVIEW_CHARS)),
                    );
                    return ChatResult {
                        content: reply.content,
                        model_used: reply.model_used,
                        engine,
                        attempts,
                        trace_id,
                        status: None,
                        error: None,
                    };
                }
                Err(err) => {
                    self.trace.record(
                        TraceEvent::new("orchestrator", "error")
                            .field("traceId", trace_id.as_str())
                            .field("attempt", attempts)
                            .field("engine", engine.as_str())
                            .field("model", model.as_str())
                            .field("status", err.status())
                            .field("message", err.to_string()),
                    );
                    model = registry::fallback_for(engine, &model).to_string();
                    last_error = Some(err);
                }
            }

            tokio::time::sleep(self.policy.backoff).await;
        }

        // EXHAUSTED: all-empty runs leave no last error and report a plain 502.
        let status = last_error.as_ref().map(|e| e.status()).unwrap_or(EXHAUSTED_STATUS);
        let error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| EXHAUSTED_MESSAGE.to_string());
        warn!(engine = %engine, attempts, status, %trace_id, "retries exhausted");

        ChatResult {
            content: String::new(),
            model_used: model,
            engine,
            attempts,
            trace_id,
            status: Some(status),
            error: Some(error),
        }
    }

    async fn call_engine(
        &self,
        engine: Engine,
        model: &str,
        history: &[PromptMessage],
        input: &ChatRequest,
        trace_id: &str,
    ) -> Result<ProviderReply, ProviderError> {
        let adapter = self
            .providers
            .adapter_for(engine)
            .ok_or_else(|| ProviderError::Configuration(format!("Missing {}", credential_env(engine))))?;

        let request = ProviderRequest {
            model: model.to_string(),
            messages: history.to_vec(),
            temperature: input.temperature,
            max_tokens: input.max_tokens,
            trace_id: trace_id.to_string(),
        };
        adapter.execute(&request).await
    }
}
