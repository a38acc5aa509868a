//! Reasoning strategies and the complexity-to-strategy catalog.
//!
//! Each strategy carries a descriptor: the ordered competency set it
//! scores, how the provider is called, and its cost profile. The catalog
//! maps every `ComplexityLevel` to exactly one strategy:
//!
//! LOW -> LEAN, MEDIUM -> CHAIN_OF_THOUGHT, HIGH -> STEP_BACK
//!
//! Labels that arrive as strings (caller hints) and match no known level
//! or strategy fail closed to LEAN and are logged as taxonomy gaps.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::competency::Competency;
use super::complexity::ComplexityLevel;
use crate::config::StrategyCosts;

/// A named evaluation approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStrategy {
    #[default]
    Lean,
    ChainOfThought,
    StepBack,
}

impl ReasoningStrategy {
    pub const ALL: [ReasoningStrategy; 3] = [
        ReasoningStrategy::Lean,
        ReasoningStrategy::ChainOfThought,
        ReasoningStrategy::StepBack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningStrategy::Lean => "lean",
            ReasoningStrategy::ChainOfThought => "chain_of_thought",
            ReasoningStrategy::StepBack => "step_back",
        }
    }

    /// Competencies this strategy scores, in order.
    ///
    /// Each set is a strict superset of the previous one.
    pub fn competencies(&self) -> &'static [Competency] {
        match self {
            ReasoningStrategy::Lean => &Competency::ALL[..3],
            ReasoningStrategy::ChainOfThought => &Competency::ALL[..6],
            ReasoningStrategy::StepBack => &Competency::ALL[..9],
        }
    }

    pub fn scoring_mode(&self) -> ScoringMode {
        match self {
            ReasoningStrategy::Lean => ScoringMode::Batch,
            ReasoningStrategy::ChainOfThought | ReasoningStrategy::StepBack => {
                ScoringMode::PerCompetency
            }
        }
    }

    pub fn covers(&self, competency: Competency) -> bool {
        self.competencies().contains(&competency)
    }
}

impl std::fmt::Display for ReasoningStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReasoningStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lean" => Ok(ReasoningStrategy::Lean),
            "chain_of_thought" | "cot" => Ok(ReasoningStrategy::ChainOfThought),
            "step_back" => Ok(ReasoningStrategy::StepBack),
            other => Err(format!("unknown reasoning strategy: {other}")),
        }
    }
}

/// How the evaluator calls the reasoning provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// One call scores the whole competency set.
    Batch,
    /// One call per competency, issued concurrently.
    PerCompetency,
}

/// Everything the evaluator needs to know about a strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDescriptor {
    pub strategy: ReasoningStrategy,
    pub competencies: &'static [Competency],
    pub scoring_mode: ScoringMode,
    /// Approximate tokens per response word.
    pub token_multiplier: u32,
    /// Multiplier applied to the base per-token rate.
    pub cost_multiplier: f64,
}

/// Total mapping from complexity level to strategy descriptor.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    lean: StrategyDescriptor,
    chain_of_thought: StrategyDescriptor,
    step_back: StrategyDescriptor,
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::new(&StrategyCosts::default())
    }
}

impl StrategyCatalog {
    /// Build the catalog from configured token and cost multipliers.
    pub fn new(costs: &StrategyCosts) -> Self {
        let describe = |strategy: ReasoningStrategy| {
            let profile = costs.profile(strategy);
            StrategyDescriptor {
                strategy,
                competencies: strategy.competencies(),
                scoring_mode: strategy.scoring_mode(),
                token_multiplier: profile.token_multiplier,
                cost_multiplier: profile.cost_multiplier,
            }
        };
        Self {
            lean: describe(ReasoningStrategy::Lean),
            chain_of_thought: describe(ReasoningStrategy::ChainOfThought),
            step_back: describe(ReasoningStrategy::StepBack),
        }
    }

    /// Resolve a complexity level to its strategy.
    pub fn resolve(&self, level: ComplexityLevel) -> ReasoningStrategy {
        match level {
            ComplexityLevel::Low => ReasoningStrategy::Lean,
            ComplexityLevel::Medium => ReasoningStrategy::ChainOfThought,
            ComplexityLevel::High => ReasoningStrategy::StepBack,
        }
    }

    /// Parse a complexity label received as text.
    ///
    /// Unknown labels resolve to nothing and are logged as a taxonomy gap.
    pub fn parse_level(&self, label: &str) -> Option<ComplexityLevel> {
        match label.parse::<ComplexityLevel>() {
            Ok(level) => Some(level),
            Err(_) => {
                warn!(taxonomy_gap = true, label, "unmapped complexity label");
                None
            }
        }
    }

    /// Parse a strategy label received as text.
    pub fn parse_strategy(&self, label: &str) -> Option<ReasoningStrategy> {
        match label.parse::<ReasoningStrategy>() {
            Ok(strategy) => Some(strategy),
            Err(_) => {
                warn!(taxonomy_gap = true, label, "unmapped strategy label");
                None
            }
        }
    }

    pub fn descriptor(&self, strategy: ReasoningStrategy) -> &StrategyDescriptor {
        match strategy {
            ReasoningStrategy::Lean => &self.lean,
            ReasoningStrategy::ChainOfThought => &self.chain_of_thought,
            ReasoningStrategy::StepBack => &self.step_back,
        }
    }
}
