//! Lightweight diagnostic trace buffer.
//!
//! A bounded in-memory ring of structured events, shared across every request
//! so `/trace/last` can answer "what just happened" without log scraping.
//! Events are redacted on the way in; nothing secret is ever stored.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

pub const REDACTED_PLACEHOLDER: &str = "[redacted]";

// Substring match on the field name, "apiKey", "monkey" and "AUTH_TOKEN" all hit.
static SECRET_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)key|token|secret|password").expect("secret pattern compiles"));

/// One diagnostic event. `ts`, `svc` and `event` are fixed; everything else
/// rides in `fields` and is flattened into the JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub ts: String,
    pub svc: String,
    pub event: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TraceEvent {
    pub fn new(svc: &str, event: &str) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            svc: svc.to_string(),
            event: event.to_string(),
            fields: Map::new(),
        }
    }

    /// Attach one field, builder style.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Bounded FIFO ring of trace events.
pub struct TraceBuffer {
    capacity: usize,
    events: Mutex<VecDeque<TraceEvent>>,
}

impl TraceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Redact and append one event, evicting the oldest at capacity.
    /// Append is atomic under the lock, so concurrent writers interleave
    /// whole events and never corrupt each other's fields.
    pub fn record(&self, mut event: TraceEvent) {
        redact_fields(&mut event.fields);
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Last `n` events in arrival order, clamped to `1..=capacity`.
    pub fn query(&self, n: usize) -> Vec<TraceEvent> {
        let n = n.clamp(1, self.capacity);
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let skip = events.len().saturating_sub(n);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn redact_fields(fields: &mut Map<String, Value>) {
    for (key, value) in fields.iter_mut() {
        if SECRET_KEY_PATTERN.is_match(key) {
            *value = Value::String(REDACTED_PLACEHOLDER.to_string());
        }
    }
}

/// Collapse whitespace runs and cap at `max_chars` characters. Used for
/// trace summaries so prompts and replies never land in the buffer whole.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}
