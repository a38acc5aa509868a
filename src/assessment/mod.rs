//! Complexity assessment and strategy routing.
//!
//! Every turn is classified by the `ComplexityAssessor` and routed through
//! the `StrategyCatalog` before it is evaluated, including trivial inputs.

mod competency;
mod complexity;
mod strategy;

pub use competency::{Competency, CompetencyScore, RationaleTier, MAX_SCORE, MIN_SCORE};
pub use complexity::{
    ComplexityAssessor, ComplexityLevel, ComplexitySignals, PhaseContext, HIGH_THRESHOLD,
    MEDIUM_THRESHOLD,
};
pub use strategy::{ReasoningStrategy, ScoringMode, StrategyCatalog, StrategyDescriptor};
