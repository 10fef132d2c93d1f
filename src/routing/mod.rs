//! Routing policy: decide which engine and model serve a request.
//!
//! Routing is a pure table lookup. An explicit engine always wins; otherwise
//! the task intent picks one; otherwise OpenAI. The same inputs always produce
//! the same selection, so retries and tests can rely on it.

use std::time::Duration;

use crate::registry::{self, Engine};

// ============================================================================
// Intent routing table
// ============================================================================

/// Intent keyword to engine, matched after trim + ASCII lowercase.
/// Exact match only; "tone-check" does not hit the "tone" row.
const INTENT_ROUTES: &[(&str, Engine)] = &[
    ("editorial", Engine::OpenAi),
    ("outline", Engine::OpenAi),
    ("tone", Engine::Gemini),
    ("style", Engine::Gemini),
];

const DEFAULT_ENGINE: Engine = Engine::OpenAi;

/// Map a task intent to an engine. Unknown or absent intents route to the
/// default engine rather than failing.
pub fn select_engine_by_intent(intent: Option<&str>) -> Engine {
    let Some(intent) = intent else {
        return DEFAULT_ENGINE;
    };
    let needle = intent.trim().to_ascii_lowercase();
    INTENT_ROUTES
        .iter()
        .find(|(keyword, _)| *keyword == needle)
        .map(|(_, engine)| *engine)
        .unwrap_or(DEFAULT_ENGINE)
}

// ============================================================================
// Combined selection
// ============================================================================

/// The routed engine and normalized model for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub engine: Engine,
    pub model: &'static str,
    pub is_fallback: bool,
}

/// Resolve the engine (explicit wins, then intent, then default) and run the
/// requested model through the registry.
pub fn select_engine_and_model(
    explicit_engine: Option<Engine>,
    requested_model: Option<&str>,
    intent: Option<&str>,
) -> Selection {
    let engine = explicit_engine.unwrap_or_else(|| select_engine_by_intent(intent));
    let normalized = registry::normalize(engine, requested_model);
    Selection {
        engine,
        model: normalized.model,
        is_fallback: normalized.is_fallback,
    }
}

// ============================================================================
// Retry policy
// ============================================================================

/// Retry bounds applied by the orchestrator. Injectable so tests can shrink
/// the backoff without touching the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

/// One retry after the first failure, 250ms apart.
pub const RETRY_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 2,
    backoff: Duration::from_millis(250),
};
