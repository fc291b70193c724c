//! Append-only memory store with two-stage retrieval.
//!
//! Items are stored immutably - they are never modified or deleted. A query
//! runs in two stages: cosine similarity gates a candidate pool, then the
//! pool is reordered most-recent-first and truncated. Relevance decides
//! candidacy; recency breaks ties among the relevant.

use crate::embedding::Embedder;
use crate::memory::types::{MemoryItem, MemoryKind};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, trace};

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the dimensions differ,
/// so a degenerate embedding never poisons a ranking with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Append-only collection of memory items of a single kind.
///
/// One store exists per (agent, perspective, kind). Insertion order equals
/// timestamp order: the single-threaded cycle driver only ever moves time
/// forward.
pub struct MemoryStore {
    kind: MemoryKind,
    embedder: Arc<dyn Embedder>,
    items: Vec<MemoryItem>,
}

impl MemoryStore {
    pub fn new(kind: MemoryKind, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            kind,
            embedder,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in insertion (= timestamp) order
    pub fn items(&self) -> &[MemoryItem] {
        &self.items
    }

    /// Embed `text` and append it as a new item.
    ///
    /// Fails only if embedding fails; nothing is appended in that case.
    pub async fn insert(&mut self, text: &str, timestamp: i64) -> Result<&MemoryItem> {
        let embedding = self.embedder.embed(text).await?;

        trace!(
            kind = self.kind.label(),
            timestamp,
            chars = text.len(),
            "Storing memory item"
        );

        let index = self.items.len();
        self.items
            .push(MemoryItem::new(text.to_string(), embedding, timestamp, self.kind));
        Ok(&self.items[index])
    }

    /// Insert several texts sharing one timestamp, embedding them as a batch.
    pub async fn insert_batch(&mut self, texts: &[String], timestamp: i64) -> Result<()> {
        if texts.is_empty() {
            return Ok(());
        }
        let embeddings = self.embedder.embed_batch(texts).await?;

        debug!(
            kind = self.kind.label(),
            count = texts.len(),
            timestamp,
            "Storing memory batch"
        );

        for (text, embedding) in texts.iter().zip(embeddings) {
            self.items
                .push(MemoryItem::new(text.clone(), embedding, timestamp, self.kind));
        }
        Ok(())
    }

    /// Retrieve up to `k` items relevant to `query_text`.
    ///
    /// The `pool` most similar items (cosine, descending) form the candidate
    /// set; candidates are then ordered by timestamp descending and the first
    /// `k` returned. The sort is stable, so equally recent candidates keep
    /// their similarity order. `pool` is clamped to at least `k`.
    ///
    /// An empty store yields an empty vec, never an error. Fewer than `k`
    /// items yield everything, same rule.
    pub async fn query(&self, query_text: &str, k: usize, pool: usize) -> Result<Vec<MemoryItem>> {
        if self.items.is_empty() || k == 0 {
            trace!(kind = self.kind.label(), "Query against empty store");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query_text).await?;

        let mut scored: Vec<(f32, &MemoryItem)> = self
            .items
            .iter()
            .map(|item| (cosine_similarity(&query_embedding, &item.embedding), item))
            .collect();

        // Stage 1: similarity gates the candidate pool
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let pool = pool.max(k).min(scored.len());
        scored.truncate(pool);

        // Stage 2: recency orders the survivors
        scored.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        scored.truncate(k);

        debug!(
            kind = self.kind.label(),
            stored = self.items.len(),
            pool,
            returned = scored.len(),
            "Memory query completed"
        );

        Ok(scored.into_iter().map(|(_, item)| item.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use async_trait::async_trait;

    /// Deterministic test embedder: known phrases map to fixed axes, anything
    /// else hashes to a unit vector.
    struct StubEmbedder;

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; 4];
        v[i] = 1.0;
        v
    }

    fn hash_vector(text: &str) -> Vec<f32> {
        let mut h: u64 = 0xcbf29ce484222325;
        let mut v = [0.0f32; 4];
        for (i, b) in text.bytes().enumerate() {
            h = (h ^ b as u64).wrapping_mul(0x100000001b3);
            v[i % 4] += (h % 1000) as f32 / 1000.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm.max(1e-6)).collect()
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "alpha" => axis(0),
                    "beta" => axis(1),
                    "gamma" => axis(2),
                    other => hash_vector(other),
                })
                .collect())
        }

        fn name(&self) -> &str {
            "StubEmbedder"
        }
    }

    fn store(kind: MemoryKind) -> MemoryStore {
        MemoryStore::new(kind, Arc::new(StubEmbedder))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);

        // Degenerate inputs stay finite
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn test_empty_store_query_is_not_an_error() {
        let s = store(MemoryKind::Fact);
        let results = s.query("anything", 3, 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_self_similarity_ranks_first() {
        let mut s = store(MemoryKind::Fact);
        s.insert("alpha", 0).await.unwrap();
        s.insert("beta", 0).await.unwrap();
        s.insert("gamma", 0).await.unwrap();

        // Pool of 1: pure similarity, the identical item must win
        let results = s.query("beta", 1, 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "beta");
    }

    #[tokio::test]
    async fn test_recency_breaks_ties_among_equals() {
        let mut s = store(MemoryKind::Fact);
        // Identical text => identical embedding => equal similarity
        s.insert("alpha", 1).await.unwrap();
        s.insert("alpha", 2).await.unwrap();
        s.insert("alpha", 3).await.unwrap();

        let results = s.query("alpha", 2, 3).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].timestamp, 3);
        assert_eq!(results[1].timestamp, 2);
    }

    #[tokio::test]
    async fn test_narrow_pool_gates_recency() {
        let mut s = store(MemoryKind::Fact);
        s.insert("alpha", 1).await.unwrap();
        s.insert("beta", 2).await.unwrap();

        // Pool clamped to k=1: only the most similar item competes, so the
        // older-but-relevant item beats the newer-but-orthogonal one.
        let results = s.query("alpha", 1, 1).await.unwrap();
        assert_eq!(results[0].text, "alpha");
    }

    #[tokio::test]
    async fn test_fewer_than_k_returns_all() {
        let mut s = store(MemoryKind::Reflection);
        s.insert("alpha", 1).await.unwrap();
        s.insert("beta", 2).await.unwrap();

        let results = s.query("alpha", 10, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        // Recency ordering still applies
        assert_eq!(results[0].timestamp, 2);
    }

    #[tokio::test]
    async fn test_append_only_items_never_mutate() {
        let mut s = store(MemoryKind::Fact);
        s.insert("alpha", 1).await.unwrap();
        let before: Vec<(String, Vec<f32>, i64)> = s
            .items()
            .iter()
            .map(|i| (i.text.clone(), i.embedding.clone(), i.timestamp))
            .collect();

        s.insert("beta", 2).await.unwrap();
        s.query("alpha", 5, 5).await.unwrap();
        s.insert_batch(&["gamma".to_string()], 3).await.unwrap();

        for (item, (text, embedding, timestamp)) in s.items().iter().zip(before.iter()) {
            assert_eq!(&item.text, text);
            assert_eq!(&item.embedding, embedding);
            assert_eq!(&item.timestamp, timestamp);
        }
        assert_eq!(s.len(), 3);
    }

    #[tokio::test]
    async fn test_batch_insert_matches_single_insert() {
        let mut singles = store(MemoryKind::Fact);
        singles.insert("alpha", 1).await.unwrap();
        singles.insert("walked the dog", 1).await.unwrap();

        let mut batched = store(MemoryKind::Fact);
        batched
            .insert_batch(&["alpha".to_string(), "walked the dog".to_string()], 1)
            .await
            .unwrap();

        for (a, b) in singles.items().iter().zip(batched.items()) {
            assert_eq!(a.embedding, b.embedding);
        }
    }

    #[tokio::test]
    async fn test_spec_scenario_recent_relevant_first() {
        let mut s = store(MemoryKind::Fact);
        s.insert("met at park", 1).await.unwrap();
        s.insert("had coffee", 2).await.unwrap();
        s.insert("argued about politics", 3).await.unwrap();

        let results = s.query("what happened between them", 2, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        // All three survive the wide pool, so recency ordering decides
        assert_eq!(results[0].timestamp, 3);
        assert_eq!(results[1].timestamp, 2);
        assert!(results.iter().all(|i| i.kind == MemoryKind::Fact));
    }
}
