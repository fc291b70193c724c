//! Reflection engine tests: tier pipeline, atomicity, description refresh.

use async_trait::async_trait;
use reverie_core::agent::{Agent, Perspective};
use reverie_core::config::AgentProfile;
use reverie_core::embedding::Embedder;
use reverie_core::generation::{ChatMessage, Generator};
use reverie_core::memory::MemoryKind;
use reverie_core::reflection::{ReflectionConfig, ReflectionEngine};
use reverie_core::Result;
use reverie_core::ReverieError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

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

/// Replays a fixed script of responses; a `None` entry simulates a dead
/// generation backend at that call.
struct ScriptedGenerator {
    script: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedGenerator {
    fn new(script: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(|s| s.map(String::from)).collect()),
        })
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        match self.script.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(ReverieError::GenerationUnavailable(
                "scripted outage".to_string(),
            )),
            None => Err(ReverieError::GenerationUnavailable(
                "script exhausted".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "ScriptedGenerator"
    }
}

fn items_json(prefix: &str) -> String {
    format!(
        r#"{{"items": ["{prefix} one", "{prefix} two", "{prefix} three"]}}"#
    )
}

fn make_agent() -> Agent {
    let margot = AgentProfile::new("Margot", 1994, "Marine biologist in Halifax.");
    let theo = AgentProfile::new("Theo", 1993, "Jazz bar owner in Montreal.");
    Agent::new(&margot, &theo, Arc::new(FlatEmbedder)).unwrap()
}

const TRANSCRIPT: &str = "Theo: I finally signed the lease on the bigger venue.\n\
                          Margot: That's huge! I spent the month at sea again.\n";

#[tokio::test]
async fn full_pass_populates_all_six_stores_and_descriptions() {
    // Call order: own facts, own reflections, own deep, other facts, other
    // reflections, other deep, self description, counterpart description.
    let own_facts = items_json("own fact");
    let own_refl = items_json("own reflection");
    let own_deep = items_json("own deep");
    let other_facts = items_json("other fact");
    let other_refl = items_json("other reflection");
    let other_deep = items_json("other deep");
    let generator = ScriptedGenerator::new(vec![
        Some(own_facts.as_str()),
        Some(own_refl.as_str()),
        Some(own_deep.as_str()),
        Some(other_facts.as_str()),
        Some(other_refl.as_str()),
        Some(other_deep.as_str()),
        Some("Margot, updated."),
        Some("Theo, updated."),
    ]);

    let engine = ReflectionEngine::new(generator, ReflectionConfig::default());
    let mut agent = make_agent();

    let report = engine.reflect(&mut agent, TRANSCRIPT, 7).await.unwrap();

    for perspective in [Perspective::Own, Perspective::Other] {
        let archive = agent.memory(perspective);
        assert_eq!(archive.store(MemoryKind::Fact).len(), 3);
        assert_eq!(archive.store(MemoryKind::Reflection).len(), 3);
        assert_eq!(archive.store(MemoryKind::DeepReflection).len(), 3);
        for kind in [
            MemoryKind::Fact,
            MemoryKind::Reflection,
            MemoryKind::DeepReflection,
        ] {
            assert!(archive.store(kind).items().iter().all(|i| i.timestamp == 7));
        }
    }

    assert_eq!(report.own.facts[0], "own fact one");
    assert_eq!(report.other.deep_reflections[2], "other deep three");
    assert_eq!(agent.self_description(), "Margot, updated.");
    assert_eq!(agent.counterpart_description(), "Theo, updated.");
    assert_eq!(report.self_description, "Margot, updated.");
}

#[tokio::test]
async fn deep_tier_failure_keeps_lower_tiers() {
    let facts = items_json("fact");
    let reflections = items_json("reflection");
    let generator = ScriptedGenerator::new(vec![
        Some(facts.as_str()),
        Some(reflections.as_str()),
        None, // deep-reflection generation dies here
    ]);

    let engine = ReflectionEngine::new(generator, ReflectionConfig::default());
    let mut agent = make_agent();

    let err = engine.reflect(&mut agent, TRANSCRIPT, 3).await;
    assert!(matches!(
        err,
        Err(ReverieError::GenerationUnavailable(_))
    ));

    // The two completed tiers landed; the failed tier inserted nothing
    let own = agent.memory(Perspective::Own);
    assert_eq!(own.store(MemoryKind::Fact).len(), 3);
    assert_eq!(own.store(MemoryKind::Reflection).len(), 3);
    assert_eq!(own.store(MemoryKind::DeepReflection).len(), 0);

    // The counterpart pass never started
    assert!(agent.memory(Perspective::Other).is_empty());

    // Descriptions were not touched
    assert_eq!(agent.self_description(), "Marine biologist in Halifax.");
}

#[tokio::test]
async fn malformed_tier_json_is_a_serialization_error() {
    let generator = ScriptedGenerator::new(vec![Some("I would rather chat than emit JSON")]);
    let engine = ReflectionEngine::new(generator, ReflectionConfig::default());
    let mut agent = make_agent();

    let err = engine.reflect(&mut agent, TRANSCRIPT, 1).await;
    assert!(matches!(err, Err(ReverieError::SerializationError(_))));
    assert!(agent.memory(Perspective::Own).is_empty());
}

#[tokio::test]
async fn second_pass_retrieves_what_the_first_wrote() {
    // Two consecutive reflection passes; the engine queries tier-below
    // stores during the second pass without error and appends, never
    // overwrites.
    let p1 = [
        items_json("own fact"),
        items_json("own reflection"),
        items_json("own deep"),
        items_json("other fact"),
        items_json("other reflection"),
        items_json("other deep"),
    ];
    let p2 = [
        items_json("own fact late"),
        items_json("own reflection late"),
        items_json("own deep late"),
        items_json("other fact late"),
        items_json("other reflection late"),
        items_json("other deep late"),
    ];
    let mut script: Vec<Option<&str>> = Vec::new();
    script.extend(p1.iter().map(|s| Some(s.as_str())));
    script.extend([Some("desc one"), Some("desc two")]);
    script.extend(p2.iter().map(|s| Some(s.as_str())));
    script.extend([Some("desc three"), Some("desc four")]);

    let generator = ScriptedGenerator::new(script);
    let engine = ReflectionEngine::new(generator, ReflectionConfig::default());
    let mut agent = make_agent();

    engine.reflect(&mut agent, TRANSCRIPT, 0).await.unwrap();
    engine.reflect(&mut agent, TRANSCRIPT, 1).await.unwrap();

    let own = agent.memory(Perspective::Own);
    assert_eq!(own.store(MemoryKind::Fact).len(), 6);
    assert_eq!(own.store(MemoryKind::DeepReflection).len(), 6);

    // Append-only: pass-one items still sit in front with their timestamp
    let facts = own.store(MemoryKind::Fact).items();
    assert_eq!(facts[0].text, "own fact one");
    assert_eq!(facts[0].timestamp, 0);
    assert_eq!(facts[3].timestamp, 1);
}
