//! Gemini generateContent adapter.
//!
//! System messages become `systemInstruction`, assistant turns map to the
//! "model" role, and candidate parts are joined with newlines.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, ProviderAdapter, ProviderError, ProviderReply,
    ProviderRequest, Role, upstream_message,
};
use crate::config::CONFIG;

pub struct GeminiAdapter {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: HttpClient::new(),
            api_key,
            base_url,
        }
    }

    /// Build from `GEMINI_API_KEY`, or `None` when it is absent or blank.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty())?;
        Some(Self::new(api_key, CONFIG.gemini_base_url.clone()))
    }

    fn build_request(request: &ProviderRequest) -> GeminiRequest {
        let system = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| GeminiContent {
                role: match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }
                .to_string(),
                parts: vec![GeminiTextPart { text: m.content.clone() }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction: system.map(|text| GeminiSystemInstruction {
                parts: vec![GeminiTextPart { text }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
        }
    }

    fn extract_content(response: GeminiResponse) -> String {
        response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let api_request = Self::build_request(request);

        let response = self
            .client
            .post(&url)
            .json(&api_request)
            .timeout(Duration::from_secs(CONFIG.upstream_timeout_secs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&text, status),
            });
        }

        let payload: GeminiResponse = response.json().await?;
        Ok(ProviderReply {
            content: Self::extract_content(payload),
            model_used: request.model.clone(),
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}
