//! Completion gateway.
//!
//! Defines the [`Completer`] trait and the [`OpenAiCompleter`] implementation
//! over the OpenAI chat completions API. The answer pipeline supplies a
//! fixed system instruction and a user message carrying context + question;
//! sampling temperature and the output-length cap come from configuration.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{require_env_key, OpenAiConfig};
use crate::http::{expect_json, send_with_retry};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Fixed system instruction for answer generation.
pub const SYSTEM_PROMPT: &str =
    "You are a knowledgeable assistant. Answer the question using the supplied context.";

/// Fixed user-facing fallback when the completion call fails. A deliberate
/// degradation, not an error — callers still record it as the assistant turn.
pub const APOLOGY: &str = "Sorry, I can't answer this question right now.";

/// Generates answer text from a system instruction and a user message.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat completion client for the OpenAI API (`POST /v1/chat/completions`).
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiCompleter {
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiCompleter {
    /// Create a new completion client from configuration.
    ///
    /// Fails before any network call if `OPENAI_API_KEY` is missing.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = require_env_key("OPENAI_API_KEY")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

#[async_trait]
impl Completer for OpenAiCompleter {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_output_tokens,
        });

        let response = send_with_retry(
            || {
                self.client
                    .post(CHAT_COMPLETIONS_URL)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&body)
            },
            self.max_retries,
        )
        .await?;

        let json = expect_json(response).await?;
        parse_completion_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat completion response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_response() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Bananas are yellow." } }
            ]
        });
        assert_eq!(
            parse_completion_response(&json).unwrap(),
            "Bananas are yellow."
        );
    }

    #[test]
    fn test_parse_rejects_empty_choices() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_completion_response(&json).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_content() {
        let json = serde_json::json!({
            "choices": [ { "message": { "role": "assistant" } } ]
        });
        assert!(parse_completion_response(&json).is_err());
    }
}
