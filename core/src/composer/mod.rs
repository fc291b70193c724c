//! Conversation composer: turns a scenario plus remembered history into the
//! context bundle the next conversation is prompted with.
//!
//! Composing is the Retrieve half of the cycle state machine. The composer
//! only reads the agents' stores; nothing here writes memory.

use crate::agent::{Agent, Perspective};
use crate::config::RetrievalConfig;
use crate::generation::{ChatMessage, Generator};
use crate::memory::MemoryKind;
use crate::scenario::Scenario;
use crate::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs for the composer's store queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposerConfig {
    pub retrieval: RetrievalConfig,
}

/// Memories one agent brings into the next conversation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryDigest {
    pub own_facts: Vec<String>,
    pub own_reflections: Vec<String>,
    pub own_deep_reflections: Vec<String>,
    pub counterpart_facts: Vec<String>,
    pub counterpart_reflections: Vec<String>,
    pub counterpart_deep_reflections: Vec<String>,
}

impl MemoryDigest {
    pub fn is_empty(&self) -> bool {
        self.own_facts.is_empty()
            && self.own_reflections.is_empty()
            && self.own_deep_reflections.is_empty()
            && self.counterpart_facts.is_empty()
            && self.counterpart_reflections.is_empty()
            && self.counterpart_deep_reflections.is_empty()
    }

    /// Render for inclusion in a prompt
    pub fn render(&self) -> String {
        let mut out = String::new();
        let sections = [
            ("Facts about yourself", &self.own_facts),
            ("Your reflections", &self.own_reflections),
            ("Your deep reflections", &self.own_deep_reflections),
            ("Facts about your friend", &self.counterpart_facts),
            ("Reflections about your friend", &self.counterpart_reflections),
            (
                "Deep reflections about your friend",
                &self.counterpart_deep_reflections,
            ),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{title}:");
            for item in items {
                let _ = writeln!(out, "- {item}");
            }
        }
        out
    }
}

/// Retrieved context for one participant, in conversation order.
#[derive(Debug, Clone, Serialize)]
pub struct AgentContext {
    pub name: String,
    pub digest: MemoryDigest,
}

/// Everything the dialogue runner needs to stage the next conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    /// The orchestrator's event, absent for the base conversation
    pub scenario: Option<Scenario>,

    /// One-line synthesis of the scenario used as the retrieval query
    pub seed_query: Option<String>,

    /// Generated storyline grounding the conversation, absent for the base
    pub storyline: Option<String>,

    /// Per-participant retrieved memories
    pub contexts: Vec<AgentContext>,
}

impl ContextBundle {
    /// True for the cycle-0 bundle built without any retrieval
    pub fn is_base(&self) -> bool {
        self.storyline.is_none()
    }
}

/// Builds context bundles by querying agent memory.
pub struct ConversationComposer {
    generator: Arc<dyn Generator>,
    cfg: ComposerConfig,
}

impl ConversationComposer {
    pub fn new(generator: Arc<dyn Generator>, cfg: ComposerConfig) -> Self {
        Self { generator, cfg }
    }

    /// The base-case bundle: stores are empty at cycle 0, so the context
    /// derives solely from the agents' initial configuration.
    pub fn compose_base(first: &Agent, second: &Agent) -> ContextBundle {
        ContextBundle {
            scenario: None,
            seed_query: None,
            storyline: None,
            contexts: vec![
                AgentContext {
                    name: first.name().to_string(),
                    digest: MemoryDigest::default(),
                },
                AgentContext {
                    name: second.name().to_string(),
                    digest: MemoryDigest::default(),
                },
            ],
        }
    }

    /// Compose the bundle for an ongoing conversation: synthesize a seed
    /// query from the scenario, pull each agent's relevant memories, and
    /// generate the storyline that grounds the dialogue.
    pub async fn compose(
        &self,
        scenario: &Scenario,
        first: &Agent,
        second: &Agent,
    ) -> Result<ContextBundle> {
        scenario.validate()?;

        info!(
            scenario = %scenario.describe(),
            "Composing conversation context"
        );

        let seed = self.synthesize_seed(scenario).await?;

        let first_digest = self.digest(first, &seed).await?;
        let second_digest = self.digest(second, &seed).await?;

        let storyline = self
            .generate_storyline(scenario, first, &first_digest, second, &second_digest)
            .await?;

        Ok(ContextBundle {
            scenario: Some(scenario.clone()),
            seed_query: Some(seed),
            storyline: Some(storyline),
            contexts: vec![
                AgentContext {
                    name: first.name().to_string(),
                    digest: first_digest,
                },
                AgentContext {
                    name: second.name().to_string(),
                    digest: second_digest,
                },
            ],
        })
    }

    async fn synthesize_seed(&self, scenario: &Scenario) -> Result<String> {
        let messages = vec![
            ChatMessage::system(
                "You condense conversation scenarios into search queries for a \
                 memory system. Answer with one or two plain sentences, nothing else.",
            ),
            ChatMessage::user(format!(
                "Condense this upcoming conversation scenario into a single \
                 sentence or two, to be used to retrieve relevant memories:\n\n{}",
                scenario.describe()
            )),
        ];
        let seed = self.generator.generate(&messages).await?;
        Ok(seed.trim().to_string())
    }

    /// Query all six stores of one agent with the seed.
    async fn digest(&self, agent: &Agent, seed: &str) -> Result<MemoryDigest> {
        let retrieval = self.cfg.retrieval;
        let own = agent.memory(Perspective::Own);
        let other = agent.memory(Perspective::Other);

        let texts = |items: Vec<crate::memory::MemoryItem>| -> Vec<String> {
            items.into_iter().map(|i| i.text).collect()
        };

        let digest = MemoryDigest {
            own_facts: texts(own.recall(MemoryKind::Fact, seed, retrieval).await?),
            own_reflections: texts(own.recall(MemoryKind::Reflection, seed, retrieval).await?),
            own_deep_reflections: texts(
                own.recall(MemoryKind::DeepReflection, seed, retrieval).await?,
            ),
            counterpart_facts: texts(other.recall(MemoryKind::Fact, seed, retrieval).await?),
            counterpart_reflections: texts(
                other.recall(MemoryKind::Reflection, seed, retrieval).await?,
            ),
            counterpart_deep_reflections: texts(
                other
                    .recall(MemoryKind::DeepReflection, seed, retrieval)
                    .await?,
            ),
        };

        debug!(
            agent = agent.name(),
            empty = digest.is_empty(),
            "Built memory digest"
        );
        Ok(digest)
    }

    async fn generate_storyline(
        &self,
        scenario: &Scenario,
        first: &Agent,
        first_digest: &MemoryDigest,
        second: &Agent,
        second_digest: &MemoryDigest,
    ) -> Result<String> {
        let messages = vec![
            ChatMessage::system(
                "You are an expert storyteller crafting believable storylines for \
                 phone conversations between two long-time friends.",
            ),
            ChatMessage::user(format!(
                "Create a detailed one-to-two paragraph storyline for the friends' \
                 upcoming phone call.\n\n\
                 Scenario: {}\n\n\
                 {}'s memories:\n{}\n\
                 {}'s memories:\n{}\n\
                 For a regular catch-up, sketch likely topics. For good or bad \
                 news, give the event concrete detail. For a fight, spell out what \
                 the disagreement is about. Weave in the memories where they fit.",
                scenario.describe(),
                first.name(),
                first_digest.render(),
                second.name(),
                second_digest.render(),
            )),
        ];
        let storyline = self.generator.generate(&messages).await?;
        Ok(storyline.trim().to_string())
    }
}
