//! HTTP handlers for health, trace diagnostics, chat and selftests

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use crate::orchestrator::{ChatRequest, new_trace_id};
use crate::persona;
use crate::provider::{PromptMessage, ProviderRequest, Role, credential_env};
use crate::registry::{self, Engine};
use crate::trace::{TraceEvent, preview};

/// Health check endpoint
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "ok": true,
        "ts": Utc::now().to_rfc3339(),
    }))
}

// ============================================================================
// Trace diagnostics
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TraceQuery {
    #[serde(default = "default_trace_n")]
    pub n: usize,
}

fn default_trace_n() -> usize {
    1
}

/// Last N redacted trace events, oldest first
pub async fn trace_last_handler(
    State(state): State<AppState>,
    Query(query): Query<TraceQuery>,
) -> Json<Vec<TraceEvent>> {
    Json(state.trace.query(query.n))
}

// ============================================================================
// Unified chat
// ============================================================================

/// Unified chat endpoint. The orchestrator owns every outcome, so this layer
/// only maps the result onto an HTTP status: 200 on success, the preserved
/// upstream status on failure.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return reject(&state, rejection),
    };

    let result = state.orchestrator.orchestrate(request).await;
    if result.is_error() {
        let status = StatusCode::from_u16(result.status.unwrap_or(500))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(result)).into_response();
    }
    Json(result).into_response()
}

/// Record a malformed request and answer with the extractor's status.
pub(super) fn reject(state: &AppState, rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let message = rejection.body_text();
    state.trace.record(
        TraceEvent::new("orchestrator", "route_error")
            .field("status", status.as_u16())
            .field("message", message.as_str()),
    );
    (status, Json(json!({ "error": message, "status": status.as_u16() }))).into_response()
}

// ============================================================================
// Selftests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SelftestQuery {
    pub model: Option<String>,
}

/// One real upstream probe through the adapter, outside the retry loop.
/// Useful for checking a credential without burning a full chat request.
pub async fn selftest_handler(
    State(state): State<AppState>,
    Path(engine): Path<Engine>,
    Query(query): Query<SelftestQuery>,
) -> Response {
    let Some(adapter) = state.providers.adapter_for(engine) else {
        let message = format!("Missing {}", credential_env(engine));
        state.trace.record(
            TraceEvent::new(engine.as_str(), "selftest_error")
                .field("status", 500u16)
                .field("message", message.as_str()),
        );
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message, "status": 500 })),
        )
            .into_response();
    };

    let normalized = registry::normalize(engine, query.model.as_deref());
    let instruction = persona::build_system_instruction(Some("You are a terse test assistant."), None, None);
    let probe = format!("Reply with the token {}_OK only.", engine.as_str().to_uppercase());

    let request = ProviderRequest {
        model: normalized.model.to_string(),
        messages: vec![
            PromptMessage { role: Role::System, content: instruction },
            PromptMessage { role: Role::User, content: probe },
        ],
        temperature: Some(0.2),
        max_tokens: Some(60),
        trace_id: new_trace_id(),
    };

    state.trace.record(
        TraceEvent::new(engine.as_str(), "selftest_request")
            .field("model", normalized.model)
            .field("parts", request.messages.len()),
    );

    match adapter.execute(&request).await {
        Ok(reply) => {
            state.trace.record(
                TraceEvent::new(engine.as_str(), "selftest_response")
                    .field("model", reply.model_used.as_str())
                    .field("chars", reply.content.len())
                    .field("summary", preview(&reply.content, 160)),
            );
            Json(json!({ "model": reply.model_used, "content": reply.content })).into_response()
        }
        Err(err) => {
            let status = err.status();
            state.trace.record(
                TraceEvent::new(engine.as_str(), "selftest_error")
                    .field("status", status)
                    .field("message", err.to_string()),
            );
            let http_status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (http_status, Json(json!({ "error": err.to_string(), "status": status }))).into_response()
        }
    }
}
