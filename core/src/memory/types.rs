//! Core types for the memory system.

use serde::{Deserialize, Serialize};

/// The three tiers of derived memory, from concrete to abstract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryKind {
    /// Atomic observation lifted directly from a transcript
    Fact,

    /// Pattern or insight synthesized from facts
    Reflection,

    /// Identity-level synthesis rolled up from reflections
    DeepReflection,
}

impl MemoryKind {
    /// Human label used in prompts and logs
    pub fn label(&self) -> &'static str {
        match self {
            MemoryKind::Fact => "fact",
            MemoryKind::Reflection => "reflection",
            MemoryKind::DeepReflection => "deep reflection",
        }
    }
}

/// One unit of agent memory.
///
/// Items are immutable once created: the text, embedding, and timestamp are
/// set at insertion and never touched again. An item belongs to exactly one
/// store and is never shared across agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique identifier for this item
    pub id: String,

    /// Natural-language content
    pub text: String,

    /// Embedding vector, computed once at insertion
    pub embedding: Vec<f32>,

    /// Logical creation time (conversation cycle index)
    pub timestamp: i64,

    /// Which tier this item belongs to
    pub kind: MemoryKind,
}

impl MemoryItem {
    /// Create a new item with a generated unique id
    pub(crate) fn new(text: String, embedding: Vec<f32>, timestamp: i64, kind: MemoryKind) -> Self {
        // Generate a unique ID using wall-clock millis + process-wide counter
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

        let id = format!("{}-{}", chrono::Utc::now().timestamp_millis(), counter);

        Self {
            id,
            text,
            embedding,
            timestamp,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ids_are_unique() {
        let a = MemoryItem::new("a".to_string(), vec![1.0], 0, MemoryKind::Fact);
        let b = MemoryItem::new("a".to_string(), vec![1.0], 0, MemoryKind::Fact);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_kind_serde_casing() {
        let val = serde_json::to_value(MemoryKind::DeepReflection).unwrap();
        assert_eq!(val, "deep-reflection");
    }
}
