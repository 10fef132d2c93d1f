//! OpenAI chat-completions adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};

use super::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, ProviderAdapter, ProviderError, ProviderReply,
    ProviderRequest, upstream_message,
};
use crate::config::CONFIG;

pub struct OpenAiAdapter {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: HttpClient::new(),
            api_key,
            base_url,
        }
    }

    /// Build from `OPENAI_API_KEY`, or `None` when it is absent or blank.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())?;
        Some(Self::new(api_key, CONFIG.openai_base_url.clone()))
    }

    /// The gpt-5 family renames the token cap and rejects `temperature`;
    /// every other model takes the classic pair.
    fn build_body(request: &ProviderRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
        });
        if request.model.starts_with("gpt-5") {
            body["max_completion_tokens"] = json!(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));
        } else {
            body["temperature"] = json!(request.temperature.unwrap_or(DEFAULT_TEMPERATURE));
            body["max_tokens"] = json!(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));
        }
        body
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn execute(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
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

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(ProviderReply {
            content,
            model_used: request.model.clone(),
        })
    }
}
