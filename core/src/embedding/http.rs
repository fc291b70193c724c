//! HTTP embedder for OpenAI-compatible `/embeddings` endpoints.

use crate::{Result, ReverieError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::Embedder;

/// Configuration for HttpEmbedder loaded from environment variables
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub base_url: String, // e.g., https://api.openai.com/v1
    pub model: String,    // e.g., text-embedding-3-small
    pub api_key: Option<String>,
    /// Requested vector dimensionality; None keeps the model default
    pub dimensions: Option<u32>,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("EMBEDDINGS_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: std::env::var("EMBEDDINGS_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty()),
            dimensions: std::env::var("EMBEDDINGS_DIMENSIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
            max_retries: 5,
            initial_backoff_ms: 1_000,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

/// HTTP client for an OpenAI-compatible embeddings endpoint.
///
/// Retry with exponential backoff lives here, inside the collaborator; the
/// stores see one call that either yields vectors or a terminal error.
pub struct HttpEmbedder {
    http: Client,
    cfg: EmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(cfg: EmbedderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| {
                ReverieError::EmbeddingUnavailable(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(EmbedderConfig::default())
    }

    async fn request_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, Attempt> {
        let url = format!("{}/embeddings", self.cfg.base_url.trim_end_matches('/'));
        let mut body = json!({
            "model": self.cfg.model,
            "input": texts,
        });
        if let Some(dimensions) = self.cfg.dimensions {
            body["dimensions"] = json!(dimensions);
        }

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
            .map_err(|e| Attempt::Retry(ReverieError::EmbeddingUnavailable(format!(
                "Embeddings HTTP error: {e}"
            ))))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = resp.text().await.unwrap_or_default();
            return Err(Attempt::Retry(ReverieError::RateLimited(format!(
                "embeddings endpoint: {text}"
            ))));
        }
        if status.is_server_error() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Attempt::Retry(ReverieError::EmbeddingUnavailable(format!(
                "Embeddings error: status={status} body={text}"
            ))));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Attempt::Fatal(ReverieError::EmbeddingUnavailable(format!(
                "Embeddings error: status={status} body={text}"
            ))));
        }

        let parsed: EmbeddingsResponse = resp.json().await.map_err(|e| {
            Attempt::Fatal(ReverieError::EmbeddingUnavailable(format!(
                "Failed to parse embeddings JSON: {e}"
            )))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(Attempt::Fatal(ReverieError::EmbeddingUnavailable(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.data.len()
            ))));
        }

        // The API reports an index per vector; order by it rather than
        // trusting response order.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Outcome of one request attempt: worth retrying, or terminal.
enum Attempt {
    Retry(ReverieError),
    Fatal(ReverieError),
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            target = "embedder",
            model = %self.cfg.model,
            batch = texts.len(),
            "Embedding batch"
        );

        let mut backoff = self.cfg.initial_backoff_ms;
        let mut attempt = 0;
        loop {
            match self.request_batch(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    attempt += 1;
                    if attempt >= self.cfg.max_retries {
                        return Err(e);
                    }
                    warn!(
                        target = "embedder",
                        error = %e,
                        attempt,
                        backoff_ms = backoff,
                        "Embedding request failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "HttpEmbedder"
    }
}
