//! DeepSeek-compatible chat-completions client used for intent extraction.
//!
//! The endpoint is OpenAI-compatible: POST {base_url}/chat/completions with a
//! bearer token. Temperature is pinned to 0 so the model behaves as a
//! deterministic extractor rather than a chat partner.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// System prompt instructing the model to act as an intent & parameter
/// extractor for the booking tools. The contract is strict JSON only.
pub const INTENT_PROMPT: &str = r#"You are an intent & parameter extractor for a movie booking system.
Valid intents and mandatory parameters:
- list_movies: { "location": string }
- get_showtimes: { "movie_name": string, "location": string }
- book_ticket: { "show_id": string, "seats": number, "user_id"?: string }

Return STRICT JSON ONLY like:
{"intent": "list_movies", "parameters": {"location": "Delhi"}}
"#;

const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("completion contained no choices")]
    EmptyCompletion,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl LlmConfig {
    /// Read configuration from DEEPSEEK_API_KEY / DEEPSEEK_MODEL /
    /// DEEPSEEK_API_BASE. Only the key is mandatory.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .context("DEEPSEEK_API_KEY is not set (put it in the environment or a .env file)")?;
        let model =
            std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("DEEPSEEK_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Ok(Self {
            api_key,
            model,
            base_url,
            timeout: REQUEST_TIMEOUT,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

pub struct IntentExtractor {
    config: LlmConfig,
    client: Client,
}

impl IntentExtractor {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    /// Send one user utterance through the extraction prompt and return the
    /// raw assistant message content (expected, but not guaranteed, to be the
    /// strict-JSON envelope).
    pub async fn extract(&self, user_text: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: INTENT_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user_text.into(),
                },
            ],
            temperature: 0.0,
            stream: false,
        };

        let response = self
            .client
            .post(self.config.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::Auth(body),
                429 => LlmError::RateLimited(body),
                code => LlmError::Api { status: code, body },
            });
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> LlmConfig {
        LlmConfig {
            api_key: "test-key".into(),
            model: DEFAULT_MODEL.into(),
            base_url: base.into(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[test]
    fn completions_url_handles_trailing_slash() {
        assert_eq!(
            config("https://api.deepseek.com/v1/").completions_url(),
            "https://api.deepseek.com/v1/chat/completions"
        );
        assert_eq!(
            config("https://api.deepseek.com/v1").completions_url(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn chat_response_parses_openai_shape() {
        let raw = r#"{
            "id": "cmpl-1", "object": "chat.completion", "created": 0,
            "model": "deepseek-chat",
            "choices": [
                { "index": 0, "finish_reason": "stop",
                  "message": { "role": "assistant",
                               "content": "{\"intent\":\"list_movies\",\"parameters\":{\"location\":\"Delhi\"}}" } }
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.contains("list_movies"));
    }
}
