//! Text embedding collaborator.
//!
//! The memory stores treat embedding as a pure function from text to a
//! fixed-dimension vector. The backend is expected to be deterministic for a
//! given model, and batching is an optimization only: a batch of one must
//! produce exactly the vector the single call produces.

mod http;

pub use http::{EmbedderConfig, HttpEmbedder};

use crate::{Result, ReverieError};
use async_trait::async_trait;

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text. Defined as a batch of one so the two paths can
    /// never diverge numerically.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| {
            ReverieError::EmbeddingUnavailable("backend returned no vectors".to_string())
        })
    }

    /// Get a human-readable name for this embedder
    fn name(&self) -> &str;
}
