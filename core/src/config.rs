//! Validated configuration for agents and the simulation driver.
//!
//! Every configuration is an explicit struct passed by reference into the
//! component that consumes it. There is no registry, no lookup-by-name, and
//! no process-wide state.

use crate::{Result, ReverieError};
use serde::{Deserialize, Serialize};

/// Static profile of one simulated agent.
///
/// Loaded once at simulation start and validated before any agent is built.
/// The description seeds the agent's initial self-image; it evolves through
/// reflection afterwards while the profile itself stays fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Display name used in prompts and transcripts
    pub name: String,

    /// Birth year, used to compute the agent's age for a simulated date
    pub birth_year: i32,

    /// Backstory and personality sketch
    pub description: String,
}

impl AgentProfile {
    pub fn new(
        name: impl Into<String>,
        birth_year: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            birth_year,
            description: description.into(),
        }
    }

    /// Validate the profile at load time
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReverieError::ConfigError(
                "agent profile requires a non-empty name".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ReverieError::ConfigError(format!(
                "agent profile '{}' requires a non-empty description",
                self.name
            )));
        }
        if !(1800..=2100).contains(&self.birth_year) {
            return Err(ReverieError::ConfigError(format!(
                "agent profile '{}' has implausible birth year {}",
                self.name, self.birth_year
            )));
        }
        Ok(())
    }

    /// Age of the agent in the given simulated year
    pub fn age_in(&self, year: i32) -> i32 {
        year - self.birth_year
    }
}

/// Knobs for a single memory query.
///
/// `similarity_pool` is the width of the relevance gate: the query keeps the
/// `similarity_pool` most similar items, reorders them most-recent-first, and
/// returns the first `top_k`. A pool equal to `top_k` degenerates to pure
/// similarity ranking; a wider pool weights recency more heavily.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of items a query returns
    pub top_k: usize,

    /// Size of the similarity-filtered candidate set
    pub similarity_pool: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_pool: 10,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ReverieError::ConfigError(
                "retrieval top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// First simulated year; conversations happen quarterly from here
    pub start_year: i32,

    /// Number of simulated years to run
    pub years: u32,

    /// Number of back-and-forth rounds per conversation
    pub turns_per_conversation: usize,

    /// Retrieval knobs shared by the composer, runner, and reflection engine
    pub retrieval: RetrievalConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_year: 2024,
            years: 1,
            turns_per_conversation: 8,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.years == 0 {
            return Err(ReverieError::ConfigError(
                "simulation must run at least one year".to_string(),
            ));
        }
        if self.turns_per_conversation == 0 {
            return Err(ReverieError::ConfigError(
                "conversations need at least one turn".to_string(),
            ));
        }
        self.retrieval.validate()
    }
}
