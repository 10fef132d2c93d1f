// tests/test_helpers.rs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Request;

use weaver_gateway::orchestrator::Orchestrator;
use weaver_gateway::provider::{
    ProviderAdapter, ProviderError, ProviderReply, ProviderRequest, ProviderSet,
};
use weaver_gateway::registry::Engine;
use weaver_gateway::routing::RetryPolicy;
use weaver_gateway::server::{AppState, create_router};
use weaver_gateway::trace::TraceBuffer;

/// Outcomes a scripted adapter plays back, one per attempt.
pub enum Scripted {
    Reply(&'static str),
    Fail(u16, &'static str),
}

/// Adapter that replays a fixed script and records the models it was asked
/// to run. Replies echo the requested model, like the real adapters.
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderError> {
        self.calls.lock().unwrap().push(request.model.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(content)) => Ok(ProviderReply {
                content: content.to_string(),
                model_used: request.model.clone(),
            }),
            Some(Scripted::Fail(status, message)) => Err(ProviderError::Upstream {
                status,
                message: message.to_string(),
            }),
            None => Ok(ProviderReply {
                content: "out of script".to_string(),
                model_used: request.model.clone(),
            }),
        }
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 2, backoff: Duration::from_millis(5) }
}

fn app_for(providers: ProviderSet) -> (Router, Arc<TraceBuffer>) {
    let trace = Arc::new(TraceBuffer::new(100));
    let orchestrator = Arc::new(Orchestrator::with_policy(
        providers.clone(),
        trace.clone(),
        fast_policy(),
    ));
    let state = AppState::with_orchestrator(orchestrator, providers, trace.clone());
    (create_router(state), trace)
}

/// App wired with one scripted adapter and a fast retry policy.
pub fn scripted_app(engine: Engine, adapter: Arc<ScriptedAdapter>) -> (Router, Arc<TraceBuffer>) {
    app_for(ProviderSet::empty().with(engine, adapter as Arc<dyn ProviderAdapter>))
}

/// App with no adapters configured, which puts the relay in demo mode.
pub fn empty_app() -> (Router, Arc<TraceBuffer>) {
    app_for(ProviderSet::empty())
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}
