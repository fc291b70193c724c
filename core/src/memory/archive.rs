//! Layered memory archive: the three tier stores for one subject.

use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::memory::store::MemoryStore;
use crate::memory::types::{MemoryItem, MemoryKind};
use crate::Result;
use std::fmt::Write as _;
use std::sync::Arc;

/// Facts, reflections, and deep reflections about a single subject.
///
/// Each agent owns two archives: one about itself and one about its
/// counterpart. The archive is a thin router over the per-kind stores; all
/// retrieval semantics live in [`MemoryStore`].
pub struct MemoryArchive {
    facts: MemoryStore,
    reflections: MemoryStore,
    deep_reflections: MemoryStore,
}

impl MemoryArchive {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            facts: MemoryStore::new(MemoryKind::Fact, Arc::clone(&embedder)),
            reflections: MemoryStore::new(MemoryKind::Reflection, Arc::clone(&embedder)),
            deep_reflections: MemoryStore::new(MemoryKind::DeepReflection, embedder),
        }
    }

    pub fn store(&self, kind: MemoryKind) -> &MemoryStore {
        match kind {
            MemoryKind::Fact => &self.facts,
            MemoryKind::Reflection => &self.reflections,
            MemoryKind::DeepReflection => &self.deep_reflections,
        }
    }

    fn store_mut(&mut self, kind: MemoryKind) -> &mut MemoryStore {
        match kind {
            MemoryKind::Fact => &mut self.facts,
            MemoryKind::Reflection => &mut self.reflections,
            MemoryKind::DeepReflection => &mut self.deep_reflections,
        }
    }

    /// Append a batch of texts to the given tier, all at one timestamp.
    pub async fn add(&mut self, kind: MemoryKind, texts: &[String], timestamp: i64) -> Result<()> {
        self.store_mut(kind).insert_batch(texts, timestamp).await
    }

    /// Append a single text to the given tier.
    pub async fn add_one(&mut self, kind: MemoryKind, text: &str, timestamp: i64) -> Result<()> {
        self.store_mut(kind).insert(text, timestamp).await?;
        Ok(())
    }

    /// Query one tier with the shared retrieval knobs.
    pub async fn recall(
        &self,
        kind: MemoryKind,
        query_text: &str,
        retrieval: RetrievalConfig,
    ) -> Result<Vec<MemoryItem>> {
        self.store(kind)
            .query(query_text, retrieval.top_k, retrieval.similarity_pool)
            .await
    }

    /// Total item count across all tiers
    pub fn len(&self) -> usize {
        self.facts.len() + self.reflections.len() + self.deep_reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every item, tier by tier, for external persistence.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for kind in [
            MemoryKind::Fact,
            MemoryKind::Reflection,
            MemoryKind::DeepReflection,
        ] {
            for item in self.store(kind).items() {
                let _ = writeln!(
                    out,
                    "[{} @ {}] {}",
                    kind.label(),
                    item.timestamp,
                    item.text
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use async_trait::async_trait;

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn name(&self) -> &str {
            "FlatEmbedder"
        }
    }

    #[tokio::test]
    async fn test_tiers_are_isolated() {
        let mut archive = MemoryArchive::new(Arc::new(FlatEmbedder));
        archive
            .add(MemoryKind::Fact, &["a fact".to_string()], 1)
            .await
            .unwrap();
        archive
            .add_one(MemoryKind::Reflection, "a reflection", 1)
            .await
            .unwrap();

        assert_eq!(archive.store(MemoryKind::Fact).len(), 1);
        assert_eq!(archive.store(MemoryKind::Reflection).len(), 1);
        assert!(archive.store(MemoryKind::DeepReflection).is_empty());

        let recalled = archive
            .recall(MemoryKind::Fact, "query", RetrievalConfig::default())
            .await
            .unwrap();
        assert_eq!(recalled.len(), 1);
        assert_eq!(recalled[0].kind, MemoryKind::Fact);
    }

    #[tokio::test]
    async fn test_render_lists_all_tiers() {
        let mut archive = MemoryArchive::new(Arc::new(FlatEmbedder));
        archive.add_one(MemoryKind::Fact, "saw a heron", 2).await.unwrap();
        archive
            .add_one(MemoryKind::DeepReflection, "values stillness", 2)
            .await
            .unwrap();

        let rendered = archive.render();
        assert!(rendered.contains("[fact @ 2] saw a heron"));
        assert!(rendered.contains("[deep reflection @ 2] values stillness"));
    }
}
