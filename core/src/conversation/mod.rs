//! Dialogue runner: stages one phone call between the two agents.
//!
//! Each agent keeps its own message log seeded with its own system prompt;
//! the other agent's lines arrive as user messages. Before an agent speaks,
//! a recall step turns its intent into a memory query and injects what comes
//! back, so mid-conversation replies are conditioned on remembered history.

mod prompts;

use crate::agent::{Agent, Perspective};
use crate::composer::ContextBundle;
use crate::config::RetrievalConfig;
use crate::generation::{ChatMessage, Generator};
use crate::memory::MemoryKind;
use crate::simulation::SimDate;
use crate::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Framing of a single conversation.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    /// The first recorded call: catching up and talking about the future
    Opening,

    /// A storyline-driven quarterly call
    Ongoing,

    /// The final call of the simulation
    Farewell,
}

/// One spoken line.
#[derive(Debug, Clone, Serialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
}

/// An ordered conversation transcript.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    pub turns: Vec<DialogueTurn>,
}

impl Transcript {
    pub fn push(&mut self, speaker: impl Into<String>, text: impl Into<String>) {
        self.turns.push(DialogueTurn {
            speaker: speaker.into(),
            text: text.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render as `Name: line` text for reflection prompts and persistence
    pub fn render(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            let _ = writeln!(out, "{}: {}", turn.speaker, turn.text);
        }
        out
    }
}

/// Knobs for the dialogue loop.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// Number of back-and-forth rounds
    pub turns: usize,

    /// Retrieval knobs for the in-dialogue recall step
    pub retrieval: RetrievalConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            turns: 8,
            retrieval: RetrievalConfig::default(),
        }
    }
}

/// Runs one conversation between two agents.
pub struct DialogueRunner {
    generator: Arc<dyn Generator>,
    cfg: RunnerConfig,
}

impl DialogueRunner {
    pub fn new(generator: Arc<dyn Generator>, cfg: RunnerConfig) -> Self {
        Self { generator, cfg }
    }

    /// Stage the call and return its transcript.
    ///
    /// The second agent opens, mirroring a picked-up phone; each round is one
    /// line from each side, with a recall step before every reply.
    pub async fn run(
        &self,
        kind: ConversationKind,
        bundle: &ContextBundle,
        first: &Agent,
        second: &Agent,
        date: &SimDate,
    ) -> Result<Transcript> {
        info!(
            kind = ?kind,
            date = %date.label(),
            turns = self.cfg.turns,
            "Starting conversation"
        );

        let mut first_log = vec![ChatMessage::system(prompts::agent_system(
            first, kind, bundle, date,
        ))];
        let mut second_log = vec![
            ChatMessage::system(prompts::agent_system(second, kind, bundle, date)),
            ChatMessage::user(prompts::OPENING_CUE),
        ];

        let mut transcript = Transcript::default();

        for round in 0..self.cfg.turns {
            let second_line = self.generator.generate(&second_log).await?;
            transcript.push(second.name(), second_line.trim());
            first_log.push(ChatMessage::user(second_line.clone()));
            second_log.push(ChatMessage::assistant(second_line));

            self.recall_step(first, &mut first_log).await?;
            let first_line = self.generator.generate(&first_log).await?;
            transcript.push(first.name(), first_line.trim());
            second_log.push(ChatMessage::user(first_line.clone()));
            first_log.push(ChatMessage::assistant(first_line));

            self.recall_step(second, &mut second_log).await?;

            debug!(round, lines = transcript.len(), "Conversation round done");
        }

        Ok(transcript)
    }

    /// Ask the agent how it wants to respond, query its memory with that
    /// intent, and inject the recalled context before it speaks.
    async fn recall_step(&self, agent: &Agent, log: &mut Vec<ChatMessage>) -> Result<()> {
        let last_line = log
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::generation::Role::User))
            .map(|m| m.content.clone())
            .unwrap_or_default();

        log.push(ChatMessage::user(prompts::RECALL_CUE));
        let intent = self.generator.generate(log).await?;
        log.push(ChatMessage::assistant(intent.clone()));

        let retrieval = self.cfg.retrieval;
        let own = agent.memory(Perspective::Own);
        let other = agent.memory(Perspective::Other);

        let facts = own.recall(MemoryKind::Fact, &intent, retrieval).await?;
        let reflections = own.recall(MemoryKind::Reflection, &intent, retrieval).await?;
        let deep = own
            .recall(MemoryKind::DeepReflection, &intent, retrieval)
            .await?;
        let counterpart_facts = other.recall(MemoryKind::Fact, &intent, retrieval).await?;
        let counterpart_reflections = other
            .recall(MemoryKind::Reflection, &intent, retrieval)
            .await?;

        debug!(
            agent = agent.name(),
            recalled = facts.len()
                + reflections.len()
                + deep.len()
                + counterpart_facts.len()
                + counterpart_reflections.len(),
            "In-dialogue recall"
        );

        log.push(ChatMessage::user(prompts::recall_context(
            &last_line,
            &facts,
            &reflections,
            &deep,
            &counterpart_facts,
            &counterpart_reflections,
        )));
        Ok(())
    }
}
