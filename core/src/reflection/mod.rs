//! Post-conversation reflection: transcript in, layered memory out.
//!
//! After each conversation an agent distills the transcript into three
//! increasingly abstract tiers, for itself and for its counterpart:
//! facts straight from the transcript, reflections synthesized over the
//! fact store, and deep reflections rolled up from the reflection store.
//! Every tier is the same retrieve-generate-insert step, parametrized by
//! its source and target kinds. Finally both of the agent's descriptions
//! are regenerated over the updated deep-reflection store.

mod prompts;

use crate::agent::{Agent, Perspective};
use crate::config::RetrievalConfig;
use crate::generation::Generator;
use crate::memory::{MemoryArchive, MemoryKind};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Knobs for one reflection pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReflectionConfig {
    /// How many items each tier produces per perspective
    pub items_per_tier: usize,

    /// Retrieval knobs for the tier-below queries
    pub retrieval: RetrievalConfig,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            items_per_tier: 3,
            retrieval: RetrievalConfig::default(),
        }
    }
}

/// Fresh items one perspective produced in a single pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TierYield {
    pub facts: Vec<String>,
    pub reflections: Vec<String>,
    pub deep_reflections: Vec<String>,
}

/// Everything one agent derived from one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ReflectionReport {
    /// The reflecting agent
    pub agent: String,

    /// Logical time of the conversation
    pub timestamp: i64,

    /// Items about the agent itself
    pub own: TierYield,

    /// Items about the counterpart
    pub other: TierYield,

    /// Description of self after the refresh
    pub self_description: String,

    /// Description of the counterpart after the refresh
    pub counterpart_description: String,
}

impl ReflectionReport {
    /// Render the fresh items for the description-refresh prompt and for
    /// external persistence.
    pub fn summary(&self, counterpart: &str) -> String {
        let mut out = String::new();
        let sections: [(&str, &TierYield); 2] =
            [(self.agent.as_str(), &self.own), (counterpart, &self.other)];
        for (subject, tiers) in sections {
            let _ = writeln!(out, "Facts learned about {subject}:");
            for fact in &tiers.facts {
                let _ = writeln!(out, "- {fact}");
            }
            let _ = writeln!(out, "Reflections about {subject}:");
            for reflection in &tiers.reflections {
                let _ = writeln!(out, "- {reflection}");
            }
            let _ = writeln!(out, "Deep reflections about {subject}:");
            for deep in &tiers.deep_reflections {
                let _ = writeln!(out, "- {deep}");
            }
            let _ = writeln!(out);
        }
        out
    }
}

/// Shape the generator is asked to return for every tier.
#[derive(Deserialize)]
struct TierOutput {
    items: Vec<String>,
}

/// Cut the first top-level JSON object out of a model response, tolerating
/// prose before and after it.
fn extract_json_object(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

fn parse_items(raw: &str) -> Result<Vec<String>> {
    let out: TierOutput = serde_json::from_str(extract_json_object(raw))?;
    Ok(out.items)
}

/// Derives tiered memory from transcripts.
pub struct ReflectionEngine {
    generator: Arc<dyn Generator>,
    cfg: ReflectionConfig,
}

impl ReflectionEngine {
    pub fn new(generator: Arc<dyn Generator>, cfg: ReflectionConfig) -> Self {
        Self { generator, cfg }
    }

    /// Run one full reflection pass for `agent` over `transcript`.
    ///
    /// Tier order is facts, reflections, deep reflections, first about the
    /// agent and then about the counterpart. Items are only inserted after
    /// their tier's generation succeeds, so a failure aborts the pass while
    /// leaving every previously inserted tier intact.
    pub async fn reflect(
        &self,
        agent: &mut Agent,
        transcript: &str,
        timestamp: i64,
    ) -> Result<ReflectionReport> {
        info!(
            agent = agent.name(),
            timestamp,
            "Starting reflection pass"
        );

        let speaker = agent.name().to_string();
        let counterpart = agent.counterpart_name().to_string();

        let own = self
            .reflect_perspective(agent, Perspective::Own, transcript, timestamp)
            .await?;
        let other = self
            .reflect_perspective(agent, Perspective::Other, transcript, timestamp)
            .await?;

        let mut report = ReflectionReport {
            agent: speaker.clone(),
            timestamp,
            own,
            other,
            self_description: String::new(),
            counterpart_description: String::new(),
        };
        let summary = report.summary(&counterpart);

        for perspective in [Perspective::Own, Perspective::Other] {
            let updated = self
                .refresh_description(agent, perspective, &summary)
                .await?;
            agent.set_description(perspective, updated);
        }
        report.self_description = agent.self_description().to_string();
        report.counterpart_description = agent.counterpart_description().to_string();

        info!(
            agent = %report.agent,
            facts = report.own.facts.len() + report.other.facts.len(),
            reflections = report.own.reflections.len() + report.other.reflections.len(),
            deep = report.own.deep_reflections.len() + report.other.deep_reflections.len(),
            "Reflection pass complete"
        );

        Ok(report)
    }

    async fn reflect_perspective(
        &self,
        agent: &mut Agent,
        perspective: Perspective,
        transcript: &str,
        timestamp: i64,
    ) -> Result<TierYield> {
        let speaker = agent.name().to_string();
        let counterpart = agent.counterpart_name().to_string();
        let subject = agent.subject_name(perspective).to_string();
        let archive = agent.memory_mut(perspective);

        let facts = self
            .derive_tier(
                archive,
                &speaker,
                &counterpart,
                &subject,
                None,
                MemoryKind::Fact,
                transcript,
                timestamp,
            )
            .await?;

        let reflections = self
            .derive_tier(
                archive,
                &speaker,
                &counterpart,
                &subject,
                Some(MemoryKind::Fact),
                MemoryKind::Reflection,
                &facts.join("\n"),
                timestamp,
            )
            .await?;

        let deep_reflections = self
            .derive_tier(
                archive,
                &speaker,
                &counterpart,
                &subject,
                Some(MemoryKind::Reflection),
                MemoryKind::DeepReflection,
                &reflections.join("\n"),
                timestamp,
            )
            .await?;

        Ok(TierYield {
            facts,
            reflections,
            deep_reflections,
        })
    }

    /// One retrieve-generate-insert step.
    ///
    /// `seed` is the fresh material driving this tier: the transcript for the
    /// fact tier, the tier-below's fresh items otherwise. When a source kind
    /// is given, the archive is queried with the seed and the recalled items
    /// join the prompt. Insertion happens only after generation succeeds.
    #[allow(clippy::too_many_arguments)]
    async fn derive_tier(
        &self,
        archive: &mut MemoryArchive,
        speaker: &str,
        counterpart: &str,
        subject: &str,
        source: Option<MemoryKind>,
        target: MemoryKind,
        seed: &str,
        timestamp: i64,
    ) -> Result<Vec<String>> {
        let recalled = match source {
            Some(kind) => archive.recall(kind, seed, self.cfg.retrieval).await?,
            None => Vec::new(),
        };

        debug!(
            speaker,
            subject,
            tier = target.label(),
            recalled = recalled.len(),
            "Deriving memory tier"
        );

        let messages = prompts::tier_messages(
            speaker,
            counterpart,
            subject,
            target,
            seed,
            &recalled,
            self.cfg.items_per_tier,
        );
        let raw = self.generator.generate(&messages).await?;
        let items = parse_items(&raw)?;

        archive.add(target, &items, timestamp).await?;
        Ok(items)
    }

    async fn refresh_description(
        &self,
        agent: &Agent,
        perspective: Perspective,
        summary: &str,
    ) -> Result<String> {
        let subject = agent.subject_name(perspective);
        let current = agent.description(perspective);

        let recalled = agent
            .memory(perspective)
            .recall(MemoryKind::DeepReflection, current, self.cfg.retrieval)
            .await?;

        let messages = prompts::description_messages(
            agent.name(),
            subject,
            perspective == Perspective::Own,
            current,
            summary,
            &recalled,
        );
        let updated = self.generator.generate(&messages).await?;
        Ok(updated.trim().to_string())
    }
}
