use std::fs;
use std::path::Path;

use reverie_core::config::{AgentProfile, RetrievalConfig, SimulationConfig};
use serde::Deserialize;

/// High-level configuration for the companions demo
#[derive(Clone, Debug)]
pub struct CompanionsConfig {
    pub output_dir: String,
    pub simulation: SimulationConfig,
    pub first: AgentProfile,
    pub second: AgentProfile,
    /// Fixed RNG seed for the scenario source; None draws from entropy
    pub scenario_seed: Option<u64>,
}

impl Default for CompanionsConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::var("COMPANIONS_OUTPUT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "output".to_string()),
            simulation: SimulationConfig {
                years: std::env::var("COMPANIONS_YEARS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1),
                ..Default::default()
            },
            first: AgentProfile::new(
                "Margot",
                1994,
                "Margot (Marine biologist in Halifax, NS)\n\
                 Personality: Margot is observant, dry-witted, and happiest when a plan \
                 survives contact with the weather. She cares intensely about her work on \
                 cold-water reefs, overcommits to field seasons, and finds it easier to \
                 talk about sediment cores than about feelings. Theo has been pulling her \
                 out of her shell since university.\n\
                 Background: After a biology degree at Dalhousie she stayed for a PhD, \
                 then joined a coastal research station. She lives in a creaky rented \
                 house with a greyhound named Fathom and is weighing whether to chase a \
                 bigger research post abroad.\n\
                 Hobbies: Sea kayaking, darkroom photography, and losing gracefully at \
                 crib to her neighbours.",
            ),
            second: AgentProfile::new(
                "Theo",
                1993,
                "Theo (Jazz bar owner in Montreal, QC)\n\
                 Personality: Theo is warm, loud, and constitutionally incapable of \
                 letting a silence sit. He jokes when he is nervous, remembers everyone's \
                 drink order, and quietly worries that the bar is the only interesting \
                 thing about him. Margot is the one person he drops the act for.\n\
                 Background: He inherited a struggling venue from his uncle and turned it \
                 into a beloved neighbourhood jazz room. Married to Priya, with a young \
                 daughter, he is learning to balance late sets against school mornings.\n\
                 Hobbies: Upright bass, overambitious cooking projects, and arguing about \
                 hockey with anyone who will engage.",
            ),
            scenario_seed: std::env::var("COMPANIONS_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

impl CompanionsConfig {
    /// Load configuration from a TOML file (path via COMPANIONS_CONFIG or
    /// ./companions.toml), overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path = std::env::var("COMPANIONS_CONFIG").unwrap_or_else(|_| "companions.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target = "companions", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<CompanionsToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target = "companions", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target = "companions", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

/// Optional overlay file; every field may be omitted
#[derive(Debug, Deserialize)]
struct CompanionsToml {
    output_dir: Option<String>,
    start_year: Option<i32>,
    years: Option<u32>,
    turns_per_conversation: Option<usize>,
    top_k: Option<usize>,
    similarity_pool: Option<usize>,
    scenario_seed: Option<u64>,
    first: Option<ProfileToml>,
    second: Option<ProfileToml>,
}

#[derive(Debug, Deserialize)]
struct ProfileToml {
    name: Option<String>,
    birth_year: Option<i32>,
    description: Option<String>,
}

impl ProfileToml {
    fn overlay(self, mut profile: AgentProfile) -> AgentProfile {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(birth_year) = self.birth_year {
            profile.birth_year = birth_year;
        }
        if let Some(description) = self.description {
            profile.description = description;
        }
        profile
    }
}

impl CompanionsToml {
    fn overlay(self, mut cfg: CompanionsConfig) -> CompanionsConfig {
        if let Some(output_dir) = self.output_dir {
            cfg.output_dir = output_dir;
        }
        if let Some(start_year) = self.start_year {
            cfg.simulation.start_year = start_year;
        }
        if let Some(years) = self.years {
            cfg.simulation.years = years;
        }
        if let Some(turns) = self.turns_per_conversation {
            cfg.simulation.turns_per_conversation = turns;
        }
        let retrieval = RetrievalConfig {
            top_k: self.top_k.unwrap_or(cfg.simulation.retrieval.top_k),
            similarity_pool: self
                .similarity_pool
                .unwrap_or(cfg.simulation.retrieval.similarity_pool),
        };
        cfg.simulation.retrieval = retrieval;
        if let Some(seed) = self.scenario_seed {
            cfg.scenario_seed = Some(seed);
        }
        if let Some(first) = self.first {
            cfg.first = first.overlay(cfg.first);
        }
        if let Some(second) = self.second {
            cfg.second = second.overlay(cfg.second);
        }
        cfg
    }
}
