//! The cycle driver: one conversation plus its reflection pass, repeated
//! quarterly for the configured number of simulated years.
//!
//! Each cycle is strictly sequential: Retrieve (composer queries stores),
//! then the conversation, then Reflect (engine writes stores). Reflect for
//! cycle N always completes before Retrieve for cycle N+1, because N+1's
//! retrieval depends on the memory N wrote. Cycle 0 skips Retrieve; the
//! stores are still empty. A failed cycle halts the run with the
//! originating error and already-written memory stays intact.

use crate::agent::Agent;
use crate::composer::ConversationComposer;
use crate::config::SimulationConfig;
use crate::conversation::{ConversationKind, DialogueRunner, Transcript};
use crate::reflection::{ReflectionEngine, ReflectionReport};
use crate::scenario::{Scenario, ScenarioSource};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A date in simulated time: one of four quarterly call days per year.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimDate {
    pub year: i32,
    pub quarter: u8,
}

impl SimDate {
    const CALL_DAYS: [&'static str; 4] =
        ["January 1st", "April 1st", "July 1st", "October 1st"];

    pub fn from_cycle(start_year: i32, cycle: u64) -> Self {
        Self {
            year: start_year + (cycle / 4) as i32,
            quarter: (cycle % 4) as u8,
        }
    }

    /// Human-readable call day, e.g. "April 1st 2031"
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            Self::CALL_DAYS[(self.quarter as usize) % 4],
            self.year
        )
    }
}

/// Everything one conversation produced, immutable after creation.
/// Persisting it (files, audio, whatever) is the caller's business.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRecord {
    pub cycle: u64,
    pub date: SimDate,
    pub kind: ConversationKind,
    pub scenario: Option<Scenario>,
    pub storyline: Option<String>,
    pub transcript: Transcript,
}

/// One cycle's outputs: the conversation and both reflection passes.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub record: ConversationRecord,
    pub reflections: (ReflectionReport, ReflectionReport),
}

/// Drives the whole simulation, one cycle at a time.
pub struct Simulation {
    cfg: SimulationConfig,
    first: Agent,
    second: Agent,
    composer: ConversationComposer,
    runner: DialogueRunner,
    engine: ReflectionEngine,
    scenarios: Box<dyn ScenarioSource>,
    cycle: u64,
}

impl Simulation {
    pub fn new(
        cfg: SimulationConfig,
        first: Agent,
        second: Agent,
        composer: ConversationComposer,
        runner: DialogueRunner,
        engine: ReflectionEngine,
        scenarios: Box<dyn ScenarioSource>,
    ) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            first,
            second,
            composer,
            runner,
            engine,
            scenarios,
            cycle: 0,
        })
    }

    /// Cycles the configured years cover (four calls a year)
    pub fn total_cycles(&self) -> u64 {
        self.cfg.years as u64 * 4
    }

    pub fn current_cycle(&self) -> u64 {
        self.cycle
    }

    pub fn is_done(&self) -> bool {
        self.cycle >= self.total_cycles()
    }

    pub fn agents(&self) -> (&Agent, &Agent) {
        (&self.first, &self.second)
    }

    /// Run one full cycle: retrieve, converse, reflect.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let cycle = self.cycle;
        let date = SimDate::from_cycle(self.cfg.start_year, cycle);

        info!(cycle, date = %date.label(), "Cycle starting");

        let (kind, bundle) = if cycle == 0 {
            // Base case: nothing to retrieve yet
            (
                ConversationKind::Opening,
                ConversationComposer::compose_base(&self.first, &self.second),
            )
        } else {
            info!(cycle, phase = "retrieve", "Composing context from memory");
            let scenario = self.scenarios.next_scenario(&date).await?;
            let bundle = self
                .composer
                .compose(&scenario, &self.first, &self.second)
                .await?;
            (ConversationKind::Ongoing, bundle)
        };

        let transcript = self
            .runner
            .run(kind, &bundle, &self.first, &self.second, &date)
            .await?;
        let rendered = transcript.render();

        info!(cycle, phase = "reflect", "Updating both agents' memory");
        let timestamp = cycle as i64;
        let first_report = self
            .engine
            .reflect(&mut self.first, &rendered, timestamp)
            .await?;
        let second_report = self
            .engine
            .reflect(&mut self.second, &rendered, timestamp)
            .await?;

        self.cycle += 1;

        Ok(CycleOutcome {
            record: ConversationRecord {
                cycle,
                date,
                kind,
                scenario: bundle.scenario.clone(),
                storyline: bundle.storyline.clone(),
                transcript,
            },
            reflections: (first_report, second_report),
        })
    }

    /// The farewell call after the last cycle. Memory is read during the
    /// call's recall steps but no reflection pass follows; there is no next
    /// conversation to condition.
    pub async fn run_finale(&mut self) -> Result<ConversationRecord> {
        let date = SimDate::from_cycle(self.cfg.start_year, self.cycle);
        info!(date = %date.label(), "Final conversation");

        let bundle = ConversationComposer::compose_base(&self.first, &self.second);
        let transcript = self
            .runner
            .run(
                ConversationKind::Farewell,
                &bundle,
                &self.first,
                &self.second,
                &date,
            )
            .await?;

        Ok(ConversationRecord {
            cycle: self.cycle,
            date,
            kind: ConversationKind::Farewell,
            scenario: None,
            storyline: None,
            transcript,
        })
    }

    /// Run every cycle and the finale, handing each outcome to `on_cycle`
    /// for external persistence.
    pub async fn run<F>(&mut self, mut on_cycle: F) -> Result<ConversationRecord>
    where
        F: FnMut(&CycleOutcome),
    {
        while !self.is_done() {
            let outcome = self.run_cycle().await?;
            on_cycle(&outcome);
        }
        self.run_finale().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_date_schedule() {
        let d0 = SimDate::from_cycle(2024, 0);
        assert_eq!(d0.year, 2024);
        assert_eq!(d0.label(), "January 1st 2024");

        let d3 = SimDate::from_cycle(2024, 3);
        assert_eq!(d3.label(), "October 1st 2024");

        let d4 = SimDate::from_cycle(2024, 4);
        assert_eq!(d4.year, 2025);
        assert_eq!(d4.quarter, 0);

        let d42 = SimDate::from_cycle(2024, 42);
        assert_eq!(d42.year, 2034);
        assert_eq!(d42.label(), "July 1st 2034");
    }
}
