//! HTTP surface of the gateway
//!
//! Exposes the orchestrator via REST/SSE endpoints:
//! - GET  /health          - Liveness probe
//! - GET  /trace/last      - Recent redacted trace events
//! - GET  /selftest/{engine} - One real upstream probe
//! - POST /v1/chat         - Single JSON result
//! - POST /v1/chat/stream  - Event-block relay (SSE framing)

mod handlers;
mod stream;

use anyhow::Result;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;
use crate::provider::ProviderSet;
use crate::trace::TraceBuffer;

/// API version header on all responses.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

const CHAT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for all handlers. Cloning shares the same orchestrator,
/// adapters and trace ring.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub providers: ProviderSet,
    pub trace: Arc<TraceBuffer>,
}

impl AppState {
    pub fn new(providers: ProviderSet, trace: Arc<TraceBuffer>) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(providers.clone(), trace.clone())),
            providers,
            trace,
        }
    }

    /// Swap in a custom orchestrator, e.g. one with a shortened retry policy.
    pub fn with_orchestrator(
        orchestrator: Arc<Orchestrator>,
        providers: ProviderSet,
        trace: Arc<TraceBuffer>,
    ) -> Self {
        Self { orchestrator, providers, trace }
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // API version header on all responses
    let version_header = SetResponseHeaderLayer::if_not_present(
        header::HeaderName::from_static("x-api-version"),
        HeaderValue::from_static(API_VERSION),
    );

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/trace/last", get(handlers::trace_last_handler))
        .route("/selftest/{engine}", get(handlers::selftest_handler))
        .route(
            "/v1/chat",
            post(handlers::chat_handler).layer(DefaultBodyLimit::max(CHAT_MAX_BODY_BYTES)),
        )
        .route(
            "/v1/chat/stream",
            post(stream::chat_stream_handler).layer(DefaultBodyLimit::max(CHAT_MAX_BODY_BYTES)),
        )
        .layer(version_header)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(state: AppState, bind_address: &str) -> Result<()> {
    let demo = state.providers.is_empty();
    let app = create_router(state);

    println!("Gateway listening on http://{}", bind_address);
    if demo {
        println!("Providers:    NONE (streaming runs in demo mode)");
    }

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
