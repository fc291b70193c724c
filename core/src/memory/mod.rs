//! Layered agent memory with similarity-plus-recency retrieval.
//!
//! Three tiers of derived memory (facts, reflections, deep reflections) live
//! in append-only stores, one store per tier. A query embeds its text, gates
//! candidates by cosine similarity, and orders the survivors most-recent
//! first. Relevance decides who competes; recency decides who wins.

mod archive;
mod store;
mod types;

pub use archive::MemoryArchive;
pub use store::{cosine_similarity, MemoryStore};
pub use types::{MemoryItem, MemoryKind};
