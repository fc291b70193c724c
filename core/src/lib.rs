// Reverie Core Library
// Memory and retrieval engine for a long-horizon two-agent conversation simulation

pub mod agent;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod embedding;
pub mod generation;
pub mod memory;
pub mod reflection;
pub mod scenario;
pub mod simulation;
pub mod telemetry;

// Export core types
pub use agent::{Agent, Perspective};
pub use composer::{ContextBundle, ConversationComposer, MemoryDigest};
pub use config::{AgentProfile, RetrievalConfig, SimulationConfig};
pub use conversation::{ConversationKind, DialogueRunner, DialogueTurn, Transcript};
pub use embedding::{Embedder, HttpEmbedder};
pub use generation::{ChatClient, ChatMessage, Generator, Role};
pub use memory::{MemoryArchive, MemoryItem, MemoryKind, MemoryStore};
pub use reflection::{ReflectionEngine, ReflectionReport};
pub use scenario::{Scenario, ScenarioKind, ScenarioSource, Severity};
pub use simulation::{ConversationRecord, CycleOutcome, SimDate, Simulation};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReverieError {
    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Malformed scenario: {0}")]
    MalformedScenario(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReverieError>;
