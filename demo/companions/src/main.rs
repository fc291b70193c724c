mod config;
mod persist;
mod scenario;

use config::CompanionsConfig;
use persist::OutputWriter;
use scenario::WeightedScenarioSource;

use reverie_core::composer::{ComposerConfig, ConversationComposer};
use reverie_core::conversation::{DialogueRunner, RunnerConfig};
use reverie_core::reflection::{ReflectionConfig, ReflectionEngine};
use reverie_core::{
    Agent, ChatClient, Embedder, Generator, HttpEmbedder, Simulation,
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    reverie_core::telemetry::init("info,reverie_core=info,companions=info");

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = CompanionsConfig::load();
    cfg.simulation.validate()?;

    info!(
        target = "companions",
        first = %cfg.first.name,
        second = %cfg.second.name,
        years = cfg.simulation.years,
        "Starting companions demo"
    );

    // Collaborators: embedding and generation backends from env
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::from_env()?);
    let generator: Arc<dyn Generator> = Arc::new(ChatClient::from_env()?);

    // Agents
    let first = Agent::new(&cfg.first, &cfg.second, Arc::clone(&embedder))?;
    let second = Agent::new(&cfg.second, &cfg.first, Arc::clone(&embedder))?;

    // Engine components share the retrieval knobs
    let retrieval = cfg.simulation.retrieval;
    let composer =
        ConversationComposer::new(Arc::clone(&generator), ComposerConfig { retrieval });
    let runner = DialogueRunner::new(
        Arc::clone(&generator),
        RunnerConfig {
            turns: cfg.simulation.turns_per_conversation,
            retrieval,
        },
    );
    let engine = ReflectionEngine::new(
        Arc::clone(&generator),
        ReflectionConfig {
            retrieval,
            ..Default::default()
        },
    );

    let scenarios = Box::new(WeightedScenarioSource::new(cfg.scenario_seed));

    let mut simulation = Simulation::new(
        cfg.simulation.clone(),
        first,
        second,
        composer,
        runner,
        engine,
        scenarios,
    )?;

    let writer = OutputWriter::new(&cfg.output_dir)?;

    // Drive every cycle; a failed cycle halts the run with its error, and
    // everything already written stays on disk.
    let finale = match simulation.run(|outcome| writer.write_cycle(outcome)).await {
        Ok(finale) => finale,
        Err(e) => {
            error!(target = "companions", error = %e, "Simulation halted");
            let (first, second) = simulation.agents();
            writer.write_memory_dump(first, second);
            return Err(e.into());
        }
    };

    writer.write_finale(&finale);
    let (first, second) = simulation.agents();
    writer.write_memory_dump(first, second);

    info!(
        target = "companions",
        cycles = simulation.current_cycle(),
        "Simulation complete"
    );
    Ok(())
}
