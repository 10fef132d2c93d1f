//! Streaming relay: event-block chat over SSE framing.
//!
//! Protocol: zero or more `data: {"delta": ...}` blocks followed by exactly
//! one terminal block, `event: end` with `{modelUsed, engine}` on success or
//! `event: error` with `{error, status}` on failure. No keep-alive comments
//! are sent; relay clients parse raw blocks and would render them as text.
//!
//! With no provider credentials configured the relay serves a deterministic
//! demo stream, so the full wire protocol stays testable offline.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, Sse},
    },
};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use super::{AppState, handlers};
use crate::config::CONFIG;
use crate::orchestrator::{ChatRequest, new_trace_id};
use crate::provider::Role;
use crate::trace::TraceEvent;

pub async fn chat_stream_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let mut request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return handlers::reject(&state, rejection),
    };

    let trace_id = request
        .trace_id
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(new_trace_id);
    request.trace_id = Some(trace_id.clone());

    let stream = if state.providers.is_empty() {
        state.trace.record(
            TraceEvent::new("relay", "stream_start")
                .field("traceId", trace_id.as_str())
                .field("mode", "demo"),
        );
        demo_stream(state, request, trace_id)
    } else {
        state.trace.record(
            TraceEvent::new("relay", "stream_start")
                .field("traceId", trace_id.as_str())
                .field("mode", "live"),
        );
        live_stream(state, request, trace_id)
    };

    // X-Accel-Buffering stops nginx from batching the blocks.
    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (header::HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    (headers, Sse::new(stream)).into_response()
}

type EventStream = std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Relay a real orchestration. The call runs on its own task, so a client
/// disconnect stops the relay without cancelling the upstream attempt.
fn live_stream(state: AppState, request: ChatRequest, trace_id: String) -> EventStream {
    let orchestrator = Arc::clone(&state.orchestrator);
    let handle = tokio::spawn(async move { orchestrator.orchestrate(request).await });

    Box::pin(async_stream::stream! {
        let result = match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(%join_error, %trace_id, "orchestration task failed");
                yield Ok(error_event("orchestration task failed", 500));
                return;
            }
        };

        if let Some(error) = result.error {
            yield Ok(error_event(&error, result.status.unwrap_or(502)));
            return;
        }

        let chunks = chunk_evenly(&result.content, CONFIG.stream_chunks);
        let total = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(CONFIG.stream_delay_ms)).await;
            }
            yield Ok(delta_event(&chunk));
        }
        yield Ok(end_event(&result.model_used, result.engine.as_str()));

        state.trace.record(
            TraceEvent::new("relay", "stream_end")
                .field("traceId", trace_id.as_str())
                .field("chunks", total),
        );
    })
}

/// Deterministic offline stream exercising the same wire protocol.
fn demo_stream(state: AppState, request: ChatRequest, trace_id: String) -> EventStream {
    Box::pin(async_stream::stream! {
        let text = demo_text(&request);
        let slices = char_slices(&text, CONFIG.demo_slice_chars);
        let total = slices.len();
        for (i, slice) in slices.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(CONFIG.demo_delay_ms)).await;
            }
            yield Ok(delta_event(&slice));
        }
        yield Ok(end_event("demo", "demo"));

        state.trace.record(
            TraceEvent::new("relay", "stream_end")
                .field("traceId", trace_id.as_str())
                .field("chunks", total),
        );
    })
}

fn delta_event(chunk: &str) -> Event {
    Event::default().data(json!({ "delta": chunk }).to_string())
}

fn end_event(model_used: &str, engine: &str) -> Event {
    Event::default()
        .event("end")
        .data(json!({ "modelUsed": model_used, "engine": engine }).to_string())
}

fn error_event(message: &str, status: u16) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "error": message, "status": status }).to_string())
}

fn demo_text(request: &ChatRequest) -> String {
    let last_user = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .unwrap_or("(no user message)");
    format!(
        "DEMO STREAM: no provider credentials configured. Echo: \"{last_user}\". \
         Set OPENAI_API_KEY or GEMINI_API_KEY to reach a live engine."
    )
}

/// Fixed-size slices in characters, never splitting a UTF-8 scalar.
fn char_slices(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|chunk| chunk.iter().collect()).collect()
}

/// At most `parts` roughly equal chunks; short text yields fewer.
fn chunk_evenly(text: &str, parts: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let size = chars.len().div_ceil(parts.max(1));
    chars.chunks(size).map(|chunk| chunk.iter().collect()).collect()
}
