//! A simulated agent: profile, evolving descriptions, and layered memory.

use crate::config::AgentProfile;
use crate::embedding::Embedder;
use crate::memory::MemoryArchive;
use crate::Result;
use std::sync::Arc;

/// Which subject an archive or description is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perspective {
    /// The agent itself
    Own,

    /// The agent's counterpart
    Other,
}

/// One of the two conversation participants.
///
/// An agent owns six stores: facts, reflections, and deep reflections about
/// itself and the same three about its counterpart. Both descriptions start
/// from the static profiles and are rewritten by the reflection engine after
/// every conversation. Agents are created once at simulation start and live
/// for the whole run.
pub struct Agent {
    profile: AgentProfile,
    counterpart_name: String,
    self_description: String,
    counterpart_description: String,
    own_memory: MemoryArchive,
    other_memory: MemoryArchive,
}

impl Agent {
    /// Build an agent from two validated profiles.
    pub fn new(
        profile: &AgentProfile,
        counterpart: &AgentProfile,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        profile.validate()?;
        counterpart.validate()?;

        Ok(Self {
            profile: profile.clone(),
            counterpart_name: counterpart.name.clone(),
            self_description: profile.description.clone(),
            counterpart_description: counterpart.description.clone(),
            own_memory: MemoryArchive::new(Arc::clone(&embedder)),
            other_memory: MemoryArchive::new(embedder),
        })
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn counterpart_name(&self) -> &str {
        &self.counterpart_name
    }

    /// The agent's current self-image
    pub fn self_description(&self) -> &str {
        &self.self_description
    }

    /// The agent's current picture of its counterpart
    pub fn counterpart_description(&self) -> &str {
        &self.counterpart_description
    }

    pub fn description(&self, perspective: Perspective) -> &str {
        match perspective {
            Perspective::Own => &self.self_description,
            Perspective::Other => &self.counterpart_description,
        }
    }

    /// Name of the subject seen from the given perspective
    pub fn subject_name(&self, perspective: Perspective) -> &str {
        match perspective {
            Perspective::Own => self.name(),
            Perspective::Other => self.counterpart_name(),
        }
    }

    pub fn memory(&self, perspective: Perspective) -> &MemoryArchive {
        match perspective {
            Perspective::Own => &self.own_memory,
            Perspective::Other => &self.other_memory,
        }
    }

    /// Mutable archive access, used by the reflection engine when it writes
    /// new tiers back.
    pub fn memory_mut(&mut self, perspective: Perspective) -> &mut MemoryArchive {
        match perspective {
            Perspective::Own => &mut self.own_memory,
            Perspective::Other => &mut self.other_memory,
        }
    }

    pub(crate) fn set_description(&mut self, perspective: Perspective, text: String) {
        match perspective {
            Perspective::Own => self.self_description = text,
            Perspective::Other => self.counterpart_description = text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        fn name(&self) -> &str {
            "FlatEmbedder"
        }
    }

    fn profiles() -> (AgentProfile, AgentProfile) {
        (
            AgentProfile::new("Margot", 1994, "A marine biologist in Halifax."),
            AgentProfile::new("Theo", 1993, "A jazz bar owner in Montreal."),
        )
    }

    #[test]
    fn test_agent_construction() {
        let (margot, theo) = profiles();
        let agent = Agent::new(&margot, &theo, Arc::new(FlatEmbedder)).unwrap();

        assert_eq!(agent.name(), "Margot");
        assert_eq!(agent.counterpart_name(), "Theo");
        assert_eq!(agent.self_description(), margot.description);
        assert_eq!(agent.counterpart_description(), theo.description);
        assert!(agent.memory(Perspective::Own).is_empty());
        assert!(agent.memory(Perspective::Other).is_empty());
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let (margot, _) = profiles();
        let blank = AgentProfile::new("", 1994, "desc");
        assert!(Agent::new(&blank, &margot, Arc::new(FlatEmbedder)).is_err());
        assert!(Agent::new(&margot, &blank, Arc::new(FlatEmbedder)).is_err());
    }

    #[test]
    fn test_descriptions_update() {
        let (margot, theo) = profiles();
        let mut agent = Agent::new(&margot, &theo, Arc::new(FlatEmbedder)).unwrap();

        agent.set_description(Perspective::Own, "Updated self".to_string());
        agent.set_description(Perspective::Other, "Updated other".to_string());
        assert_eq!(agent.self_description(), "Updated self");
        assert_eq!(agent.description(Perspective::Other), "Updated other");
        assert_eq!(agent.subject_name(Perspective::Other), "Theo");
    }
}
