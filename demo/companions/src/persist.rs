//! JSON persistence for simulation outputs.
//!
//! The core hands over immutable records; everything about where and how
//! they land on disk is decided here.

use reverie_core::simulation::{ConversationRecord, CycleOutcome};
use reverie_core::Agent;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct OutputWriter {
    transcripts: PathBuf,
    reflections: PathBuf,
    memory: PathBuf,
}

impl OutputWriter {
    pub fn new(output_dir: &str) -> io::Result<Self> {
        let root = Path::new(output_dir);
        let writer = Self {
            transcripts: root.join("transcripts"),
            reflections: root.join("reflections"),
            memory: root.join("memory"),
        };
        fs::create_dir_all(&writer.transcripts)?;
        fs::create_dir_all(&writer.reflections)?;
        fs::create_dir_all(&writer.memory)?;
        Ok(writer)
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
        let rendered = match serde_json::to_string_pretty(value) {
            Ok(s) => s,
            Err(e) => {
                warn!(target = "companions", error = %e, "Failed to serialize output");
                return;
            }
        };
        if let Err(e) = fs::write(path, rendered) {
            warn!(target = "companions", path = %path.display(), error = %e, "Failed to write output");
        }
    }

    /// Persist one cycle: the transcript and both reflection reports.
    pub fn write_cycle(&self, outcome: &CycleOutcome) {
        let cycle = outcome.record.cycle;
        Self::write_json(
            &self.transcripts.join(format!("{cycle:04}_conversation.json")),
            &outcome.record,
        );
        Self::write_json(
            &self
                .reflections
                .join(format!("{cycle:04}_{}.json", outcome.reflections.0.agent)),
            &outcome.reflections.0,
        );
        Self::write_json(
            &self
                .reflections
                .join(format!("{cycle:04}_{}.json", outcome.reflections.1.agent)),
            &outcome.reflections.1,
        );
        info!(target = "companions", cycle, "Cycle outputs written");
    }

    pub fn write_finale(&self, record: &ConversationRecord) {
        Self::write_json(&self.transcripts.join("final_conversation.json"), record);
    }

    /// Dump each agent's full memory, tier by tier, at the end of the run.
    pub fn write_memory_dump(&self, first: &Agent, second: &Agent) {
        for agent in [first, second] {
            for (suffix, perspective) in [
                ("self", reverie_core::Perspective::Own),
                ("counterpart", reverie_core::Perspective::Other),
            ] {
                let path = self
                    .memory
                    .join(format!("{}_{suffix}.txt", agent.name().to_lowercase()));
                if let Err(e) = fs::write(&path, agent.memory(perspective).render()) {
                    warn!(target = "companions", path = %path.display(), error = %e, "Failed to write memory dump");
                }
            }
        }
    }
}
