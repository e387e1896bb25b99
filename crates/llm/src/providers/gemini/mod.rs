//! Gemini implementation of [`ToolAwareLlmProvider`] using function calling.
//!
//! Uses the non-streaming `generateContent` endpoint; each response is replayed
//! to the tool loop as a finite event stream.

mod translate;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use krknai_core::config::LlmSettings;
use krknai_tool_runtime::{
    ConversationMessage, EventStream, ProviderError, SamplingParams,
    ToolAwareLlmProvider, ToolDefinition,
};

use crate::client::LlmError;

use self::translate::{build_request_body, parse_response};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiToolProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiToolProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build from environment settings; fails without an API key.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".into()))?;
        Ok(Self::new(api_key, settings.model.clone(), settings.base_url.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ToolAwareLlmProvider for GeminiToolProvider {
    async fn stream_with_tools(
        &self,
        messages: Vec<ConversationMessage>,
        system_prompt: Option<String>,
        tools: Vec<ToolDefinition>,
        sampling: SamplingParams,
    ) -> Result<EventStream, ProviderError> {
        let body = build_request_body(&messages, system_prompt.as_deref(), &tools, &sampling);

        debug!(model = %self.model, turns = messages.len(), tools = tools.len(), "Gemini request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(match status {
                401 | 403 => ProviderError::Unauthorized,
                429 => ProviderError::RateLimited {
                    retry_after_secs: retry_after(&body_text).unwrap_or(30),
                },
                _ => ProviderError::Status {
                    status,
                    message: body_text,
                },
            });
        }

        let resp: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let events = parse_response(&resp, || format!("call_{}", Uuid::new_v4().simple()))?;
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

/// Extract the `RetryInfo` delay (e.g. `"17s"`) from an error body.
fn retry_after(body: &str) -> Option<u64> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed["error"]["details"]
        .as_array()?
        .iter()
        .find_map(|d| d["retryDelay"].as_str())
        .and_then(|s| s.trim_end_matches('s').parse::<f64>().ok())
        .map(|secs| secs.ceil() as u64)
}
