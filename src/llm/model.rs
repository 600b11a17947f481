//! GroqModel: chat completions against an OpenAI-compatible endpoint.

use crate::config::LlmConfig;
use crate::conversation::ConversationTurn;
use crate::error::LlmError;
use crate::llm::TextGenerator;

use anyhow::Context as _;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Chat completion client for Groq (or any OpenAI-compatible provider).
#[derive(Debug, Clone)]
pub struct GroqModel {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_name: String,
}

impl GroqModel {
    pub fn new(config: &LlmConfig) -> crate::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model_name: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for GroqModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, turns: &[ConversationTurn]) -> Result<Option<String>, LlmError> {
        let body = serde_json::json!({
            "model": self.model_name,
            "messages": turns,
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ProviderRequest(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ProviderRequest(format!("failed to read response body: {e}")))?;

        let response_body = serde_json::from_str::<serde_json::Value>(&response_text);

        if !status.is_success() {
            let message = response_body
                .ok()
                .and_then(|body| body["error"]["message"].as_str().map(str::to_owned))
                .unwrap_or_else(|| truncate_body(&response_text).to_owned());
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let response_body = response_body.map_err(|e| {
            LlmError::InvalidResponse(format!(
                "response ({status}) is not valid JSON: {e}\nBody: {}",
                truncate_body(&response_text)
            ))
        })?;

        Ok(parse_reply(&response_body))
    }
}

/// Text of the first choice, if the provider produced any.
fn parse_reply(body: &serde_json::Value) -> Option<String> {
    let content = body["choices"][0]["message"]["content"].as_str()?;
    if content.is_empty() {
        tracing::debug!("provider returned empty content");
        return None;
    }
    Some(content.to_string())
}

/// Parse a `retry-after` header given as seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    // Leading digits count as seconds, so "1.5" waits one second.
    let digits_end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    if digits_end > 0 {
        let seconds = raw[..digits_end].parse::<u64>().unwrap_or(u64::MAX);
        return Some(Duration::from_secs(seconds));
    }

    let retry_at = chrono::DateTime::parse_from_rfc2822(raw)
        .ok()?
        .with_timezone(&chrono::Utc);
    let delay = retry_at.signed_duration_since(chrono::Utc::now());
    Some(delay.to_std().unwrap_or(Duration::ZERO))
}

/// Truncate a response body for error messages to avoid dumping megabytes of HTML.
fn truncate_body(body: &str) -> &str {
    crate::conversation::truncate_chars(body, 500)
}
