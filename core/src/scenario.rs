//! Scenario descriptors supplied by the orchestrator collaborator.
//!
//! The core consumes scenarios; it never invents them. How an orchestrator
//! picks its events (random weights, scripts, replay) is its own business
//! behind the [`ScenarioSource`] trait.

use crate::simulation::SimDate;
use crate::{Result, ReverieError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// High-level shape of the next conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    GoodNews,
    BadNews,
    Fight,
    Regular,
}

impl ScenarioKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "good-news" => Ok(ScenarioKind::GoodNews),
            "bad-news" => Ok(ScenarioKind::BadNews),
            "fight" => Ok(ScenarioKind::Fight),
            "regular" | "regular-convo" => Ok(ScenarioKind::Regular),
            other => Err(ReverieError::MalformedScenario(format!(
                "unrecognized scenario type '{other}'"
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioKind::GoodNews => "good news",
            ScenarioKind::BadNews => "bad news",
            ScenarioKind::Fight => "a fight",
            ScenarioKind::Regular => "a regular catch-up",
        }
    }
}

/// How hard the event lands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Severe,
}

impl Severity {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            other => Err(ReverieError::MalformedScenario(format!(
                "unrecognized severity '{other}'"
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// One cycle's event descriptor.
///
/// Regular catch-ups carry no severity; every other kind requires one.
/// The reason is free text and optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub severity: Option<Severity>,
    pub reason: Option<String>,
}

impl Scenario {
    /// A plain catch-up call with no attached event
    pub fn regular() -> Self {
        Self {
            kind: ScenarioKind::Regular,
            severity: None,
            reason: None,
        }
    }

    pub fn new(
        kind: ScenarioKind,
        severity: Option<Severity>,
        reason: Option<String>,
    ) -> Result<Self> {
        let scenario = Self {
            kind,
            severity,
            reason,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Build from externally supplied strings, e.g. a config or wire payload.
    pub fn from_parts(
        kind: &str,
        severity: Option<&str>,
        reason: Option<String>,
    ) -> Result<Self> {
        let kind = ScenarioKind::parse(kind)?;
        let severity = severity.map(Severity::parse).transpose()?;
        Self::new(kind, severity, reason)
    }

    /// Reject descriptors the orchestrator should never have produced.
    pub fn validate(&self) -> Result<()> {
        if self.kind != ScenarioKind::Regular && self.severity.is_none() {
            return Err(ReverieError::MalformedScenario(format!(
                "scenario '{}' requires a severity",
                self.kind.label()
            )));
        }
        Ok(())
    }

    /// One-line rendering for prompts and logs
    pub fn describe(&self) -> String {
        let mut out = self.kind.label().to_string();
        if let Some(severity) = self.severity {
            out.push_str(&format!(" ({})", severity.label()));
        }
        if let Some(reason) = &self.reason {
            out.push_str(&format!(": {reason}"));
        }
        out
    }
}

/// Supplies the next cycle's scenario. Implemented outside the core.
#[async_trait]
pub trait ScenarioSource: Send + Sync {
    async fn next_scenario(&mut self, date: &SimDate) -> Result<Scenario>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(ScenarioKind::parse("good-news").unwrap(), ScenarioKind::GoodNews);
        assert_eq!(ScenarioKind::parse("good_news").unwrap(), ScenarioKind::GoodNews);
        assert_eq!(ScenarioKind::parse("Regular").unwrap(), ScenarioKind::Regular);
        assert!(ScenarioKind::parse("gossip").is_err());
    }

    #[test]
    fn test_parse_severity() {
        assert_eq!(Severity::parse("severe").unwrap(), Severity::Severe);
        assert!(Severity::parse("catastrophic").is_err());
    }

    #[test]
    fn test_non_regular_requires_severity() {
        let err = Scenario::from_parts("fight", None, Some("plans fell through".to_string()));
        assert!(matches!(
            err,
            Err(crate::ReverieError::MalformedScenario(_))
        ));

        let ok = Scenario::from_parts("fight", Some("moderate"), None).unwrap();
        assert_eq!(ok.kind, ScenarioKind::Fight);

        let regular = Scenario::from_parts("regular", None, None).unwrap();
        assert!(regular.severity.is_none());
    }

    #[test]
    fn test_describe() {
        let s = Scenario::from_parts("bad-news", Some("severe"), Some("job loss".to_string()))
            .unwrap();
        assert_eq!(s.describe(), "bad news (severe): job loss");
        assert_eq!(Scenario::regular().describe(), "a regular catch-up");
    }
}
