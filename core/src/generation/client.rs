//! HTTP generator for OpenAI-compatible `chat/completions` endpoints.

use crate::{Result, ReverieError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{ChatMessage, Generator};

/// Configuration for ChatClient loaded from environment variables
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    pub base_url: String, // e.g., https://api.openai.com/v1
    pub model: String,    // e.g., gpt-4o
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub temperature: f32,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("CHAT_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: std::env::var("CHAT_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "gpt-4o".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60_000),
            temperature: std::env::var("CHAT_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.7),
            max_retries: 5,
            initial_backoff_ms: 1_000,
        }
    }
}

/// HTTP client for an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    cfg: ChatClientConfig,
}

impl ChatClient {
    pub fn new(cfg: ChatClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| {
                ReverieError::GenerationUnavailable(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ChatClientConfig::default())
    }

    async fn request(&self, messages: &[ChatMessage]) -> std::result::Result<String, Attempt> {
        let url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.cfg.model,
            "messages": messages,
            "temperature": self.cfg.temperature,
        });

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| Attempt::Retry(ReverieError::GenerationUnavailable(format!(
                "Chat Completions HTTP error: {e}"
            ))))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = resp.text().await.unwrap_or_default();
            return Err(Attempt::Retry(ReverieError::RateLimited(format!(
                "chat endpoint: {text}"
            ))));
        }
        if status.is_server_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Attempt::Retry(ReverieError::GenerationUnavailable(format!(
                "Chat Completions error: status={status} body={text}"
            ))));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(target = "chat_client", %status, body = %text, "Chat Completions error");
            return Err(Attempt::Fatal(ReverieError::GenerationUnavailable(format!(
                "Chat Completions error: status={status} body={text}"
            ))));
        }

        let val: serde_json::Value = resp.json().await.map_err(|e| {
            Attempt::Fatal(ReverieError::GenerationUnavailable(format!(
                "Failed to parse Chat Completions JSON: {e}"
            )))
        })?;

        extract_text(&val).ok_or_else(|| {
            Attempt::Fatal(ReverieError::GenerationUnavailable(
                "Missing choices[0].message.content in chat completions".to_string(),
            ))
        })
    }
}

/// Outcome of one request attempt: worth retrying, or terminal.
enum Attempt {
    Retry(ReverieError),
    Fatal(ReverieError),
}

#[async_trait]
impl Generator for ChatClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            target = "chat_client",
            model = %self.cfg.model,
            messages = messages.len(),
            "POST chat/completions"
        );

        let mut backoff = self.cfg.initial_backoff_ms;
        let mut attempt = 0;
        loop {
            match self.request(messages).await {
                Ok(text) => return Ok(text),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    attempt += 1;
                    if attempt >= self.cfg.max_retries {
                        return Err(e);
                    }
                    warn!(
                        target = "chat_client",
                        error = %e,
                        attempt,
                        backoff_ms = backoff,
                        "Chat request failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "ChatClient"
    }
}

fn extract_text(v: &serde_json::Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        let val = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        });
        assert_eq!(extract_text(&val).unwrap(), "hello");

        let empty = serde_json::json!({"choices": []});
        assert!(extract_text(&empty).is_none());
    }

    #[test]
    fn test_message_serialization_roles() {
        let msg = ChatMessage::system("sys");
        let val = serde_json::to_value(&msg).unwrap();
        assert_eq!(val["role"], "system");

        let msg = ChatMessage::assistant("a");
        let val = serde_json::to_value(&msg).unwrap();
        assert_eq!(val["role"], "assistant");
    }
}
