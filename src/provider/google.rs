// src/provider/google.rs — Google Generative AI (Gemini) provider

use async_trait::async_trait;
use std::sync::Arc;

use super::{ChatRequest, ChatResponse, Connector, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::RepoChatError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Build the Gemini request body from a ChatRequest.
    fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut contents: Vec<serde_json::Value> = Vec::new();

        for m in &request.messages {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "model",
            };

            contents.push(serde_json::json!({
                "role": role,
                "parts": [{ "text": m.content }],
            }));
        }

        let mut body = serde_json::json!({
            "contents": contents,
        });

        let mut gen_config = serde_json::json!({});
        if let Some(max_tokens) = request.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if gen_config != serde_json::json!({}) {
            body["generationConfig"] = gen_config;
        }

        body
    }

    fn provider_error(message: String, retriable: bool) -> RepoChatError {
        RepoChatError::Provider {
            provider: "google".into(),
            message,
            retriable,
        }
    }
}

/// Parse a `generateContent` response body.
fn parse_response(resp: &serde_json::Value) -> Result<ChatResponse, RepoChatError> {
    let parts = resp["candidates"][0]["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let content: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();

    let stop_reason = match resp["candidates"][0]["finishReason"].as_str() {
        Some("STOP") => StopReason::EndTurn,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY") => StopReason::Safety,
        _ => StopReason::Unknown,
    };

    // A blocked prompt comes back with no candidates at all
    if content.is_empty() && resp["candidates"].as_array().map_or(true, |c| c.is_empty()) {
        let reason = resp["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        return Err(GoogleProvider::provider_error(
            format!("Empty response: {reason}"),
            false,
        ));
    }

    let usage = TokenUsage {
        input_tokens: resp["usageMetadata"]["promptTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
        output_tokens: resp["usageMetadata"]["candidatesTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
        cache_read_tokens: resp["usageMetadata"]["cachedContentTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
    };

    Ok(ChatResponse {
        content,
        usage,
        stop_reason,
    })
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RepoChatError> {
        let body = self.build_request_body(&request);

        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::provider_error(e.to_string(), e.is_timeout() || e.is_connect()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RepoChatError::RateLimited {
                provider: "google".into(),
                retry_after_ms: 5000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::provider_error(
                format!("HTTP {}: {}", status, error_body),
                status.is_server_error(),
            ));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Self::provider_error(format!("Failed to parse response: {}", e), false))?;

        let parsed = parse_response(&resp)?;
        tracing::debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "gemini reply received"
        );
        Ok(parsed)
    }
}

/// Connector that builds a `GoogleProvider` per API key.
#[derive(Debug, Clone, Default)]
pub struct GoogleConnector {
    base_url: Option<String>,
}

impl GoogleConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }
}

impl Connector for GoogleConnector {
    fn connect(&self, api_key: &str) -> Arc<dyn ModelProvider> {
        match self.base_url {
            Some(ref base) => Arc::new(GoogleProvider::with_base_url(
                api_key.to_string(),
                base.clone(),
            )),
            None => Arc::new(GoogleProvider::new(api_key.to_string())),
        }
    }
}
