//! Text generation collaborator.
//!
//! Everything the engine says, reflects, or composes goes through the
//! `Generator` trait: a chat-shaped prompt in, assistant text out. Retry and
//! backoff policy belongs to the implementation behind the trait, never to
//! the callers.

mod client;

pub use client::{ChatClient, ChatClientConfig};

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Roles for messages in a chat prompt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Produces assistant text for a chat prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for the given messages
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get a human-readable name for this generator
    fn name(&self) -> &str;
}
