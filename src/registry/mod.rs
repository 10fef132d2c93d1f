//! Static model registry: per-engine allow-lists and deterministic fallbacks.
//!
//! The registry is immutable process-wide configuration. A requested model is
//! either found in its engine's allow-list or replaced by the engine's fixed
//! default, so routing never has to reason about unknown model names.

use serde::{Deserialize, Serialize};

/// A configured AI provider. Exactly two engines exist in this gateway;
/// adding one means adding a variant here plus one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    OpenAi,
    Gemini,
}

pub const OPENAI_MODELS: &[&str] = &["gpt-5", "gpt-5-mini", "gpt-4o", "gpt-4o-mini"];
pub const GEMINI_MODELS: &[&str] = &["gemini-2.5-pro", "gemini-2.5-flash"];

const OPENAI_DEFAULT: &str = "gpt-4o-mini";
const OPENAI_ALTERNATE: &str = "gpt-4o";
const GEMINI_DEFAULT: &str = "gemini-2.5-flash";
const GEMINI_ALTERNATE: &str = "gemini-2.5-pro";

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::OpenAi => "openai",
            Engine::Gemini => "gemini",
        }
    }

    /// Models accepted for this engine, in registry order.
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Engine::OpenAi => OPENAI_MODELS,
            Engine::Gemini => GEMINI_MODELS,
        }
    }

    /// Deterministic default when a request names no usable model.
    pub fn default_model(&self) -> &'static str {
        match self {
            Engine::OpenAi => OPENAI_DEFAULT,
            Engine::Gemini => GEMINI_DEFAULT,
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of model normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized {
    pub model: &'static str,
    pub is_fallback: bool,
}

/// Look up the requested model in the engine's allow-list. Blank or unknown
/// input maps to the engine's default with `is_fallback = true`.
pub fn normalize(engine: Engine, requested: Option<&str>) -> Normalized {
    let Some(requested) = requested else {
        return Normalized { model: engine.default_model(), is_fallback: true };
    };
    let requested = requested.trim();
    match engine.models().iter().copied().find(|m| *m == requested) {
        Some(model) => Normalized { model, is_fallback: false },
        None => Normalized { model: engine.default_model(), is_fallback: true },
    }
}

/// Two-way toggle between the engine's canonical pair. Anything that is not
/// the default (including models outside the pair) toggles back to it, so
/// repeated fallbacks alternate between exactly two models.
pub fn fallback_for(engine: Engine, current: &str) -> &'static str {
    match engine {
        Engine::OpenAi => {
            if current == OPENAI_DEFAULT {
                OPENAI_ALTERNATE
            } else {
                OPENAI_DEFAULT
            }
        }
        Engine::Gemini => {
            if current == GEMINI_DEFAULT {
                GEMINI_ALTERNATE
            } else {
                GEMINI_DEFAULT
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_passes_known_models_through() {
        for model in OPENAI_MODELS {
            let n = normalize(Engine::OpenAi, Some(model));
            assert_eq!(n.model, *model);
            assert!(!n.is_fallback);
        }
        for model in GEMINI_MODELS {
            let n = normalize(Engine::Gemini, Some(model));
            assert_eq!(n.model, *model);
            assert!(!n.is_fallback);
        }
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let n = normalize(Engine::OpenAi, Some("  gpt-4o  "));
        assert_eq!(n.model, "gpt-4o");
        assert!(!n.is_fallback);
    }

    #[test]
    fn test_normalize_unknown_maps_to_default() {
        let n = normalize(Engine::OpenAi, Some("unsupported-model"));
        assert_eq!(n.model, "gpt-4o-mini");
        assert!(n.is_fallback);

        let n = normalize(Engine::Gemini, Some("gemini-1.0-ultra"));
        assert_eq!(n.model, "gemini-2.5-flash");
        assert!(n.is_fallback);
    }

    #[test]
    fn test_normalize_blank_and_absent_map_to_default() {
        for requested in [None, Some(""), Some("   ")] {
            let n = normalize(Engine::OpenAi, requested);
            assert_eq!(n.model, "gpt-4o-mini");
            assert!(n.is_fallback);
        }
    }

    #[test]
    fn test_fallback_is_a_two_way_toggle() {
        assert_eq!(fallback_for(Engine::OpenAi, "gpt-4o-mini"), "gpt-4o");
        assert_eq!(fallback_for(Engine::OpenAi, "gpt-4o"), "gpt-4o-mini");
        assert_eq!(fallback_for(Engine::Gemini, "gemini-2.5-flash"), "gemini-2.5-pro");
        assert_eq!(fallback_for(Engine::Gemini, "gemini-2.5-pro"), "gemini-2.5-flash");
    }

    #[test]
    fn test_fallback_outside_the_pair_returns_to_default() {
        // gpt-5 is allow-listed but not part of the fallback pair
        assert_eq!(fallback_for(Engine::OpenAi, "gpt-5"), "gpt-4o-mini");
        assert_eq!(fallback_for(Engine::Gemini, "gemini-9"), "gemini-2.5-flash");
    }

    #[test]
    fn test_engine_wire_names() {
        assert_eq!(Engine::OpenAi.to_string(), "openai");
        assert_eq!(Engine::Gemini.to_string(), "gemini");
        let e: Engine = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(e, Engine::OpenAi);
        let e: Engine = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(e, Engine::Gemini);
        assert!(serde_json::from_str::<Engine>("\"bedrock\"").is_err());
    }
}
