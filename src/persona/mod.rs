//! Persona composer: deterministic system-instruction assembly.
//!
//! Composition is pure string work. Clauses are emitted in a fixed order and
//! joined with single spaces, so identical inputs always produce an identical
//! instruction. Nothing here talks to providers or stores state.

use serde::Deserialize;

/// Caller-supplied profile of the person being addressed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonaProfile {
    pub name: Option<String>,
    pub role: Option<String>,
    pub domain: Option<String>,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preferences {
    pub tone: Option<String>,
    pub depth: Option<String>,
}

/// What the caller is trying to get done right now.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskManifest {
    pub intent: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub output_format: Option<String>,
}

const DEFAULT_TONE: &str = "concise";
const DEFAULT_DEPTH: &str = "brief";
const HOUSE_DIRECTIVE: &str = "Avoid profanity. Keep responses actionable, using short paragraphs.";
const EMPTY_FALLBACK: &str = "You are helpful and concise.";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Build the system instruction for one request.
///
/// Clause order: base instruction, profile clauses, tone/detail (always
/// emitted, with defaults), task clauses, house directive. An all-empty
/// composition falls back to a minimal instruction instead of an empty string.
pub fn build_system_instruction(
    base: Option<&str>,
    user: Option<&PersonaProfile>,
    task: Option<&TaskManifest>,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(base) = base {
        let trimmed = base.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }

    if let Some(user) = user {
        if let Some(name) = non_empty(user.name.as_deref()) {
            parts.push(format!("Address the user as {name}."));
        }
        if let Some(role) = non_empty(user.role.as_deref()) {
            parts.push(format!("The user is a {role}."));
        }
        if let Some(domain) = non_empty(user.domain.as_deref()) {
            parts.push(format!("Primary domain: {domain}."));
        }
    }

    let preferences = user.and_then(|u| u.preferences.as_ref());
    let tone = preferences
        .and_then(|p| non_empty(p.tone.as_deref()))
        .unwrap_or(DEFAULT_TONE);
    let depth = preferences
        .and_then(|p| non_empty(p.depth.as_deref()))
        .unwrap_or(DEFAULT_DEPTH);
    parts.push(format!("Tone: {tone}. Level of detail: {depth}."));

    if let Some(task) = task {
        if let Some(intent) = non_empty(task.intent.as_deref()) {
            parts.push(format!("Intent: {intent}."));
        }
        if !task.constraints.is_empty() {
            parts.push(format!("Constraints: {}.", task.constraints.join("; ")));
        }
        if let Some(format) = non_empty(task.output_format.as_deref()) {
            parts.push(format!("Output format: {format}."));
        }
    }

    parts.push(HOUSE_DIRECTIVE.to_string());

    let instruction = parts.join(" ").trim().to_string();
    if instruction.is_empty() {
        EMPTY_FALLBACK.to_string()
    } else {
        instruction
    }
}
