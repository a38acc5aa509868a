//! Response complexity assessment.
//!
//! The assessor classifies how much reasoning depth a response needs from
//! a handful of text signals:
//! - **Length**: whitespace word count, bucketed
//! - **Technical depth**: presence of domain indicator terms
//! - **Structure**: sentence count, paragraph breaks, list markers and
//!   transition words
//! - **Momentum**: the complexity assessed for the previous turn
//!
//! Assessment is a pure function. The same text and phase context always
//! yield the same level.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::interview::InterviewPhase;

/// Regex for list items (`1.`, `2)`, `-`, `*`, `•` at line start)
static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:\d+[.)]|[-*•])\s+\S").unwrap());

/// Regex for paragraph breaks (a blank line)
static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Terms that indicate the response engages with technical design.
const TECHNICAL_INDICATORS: &[&str] = &[
    "algorithm",
    "complexity",
    "scalability",
    "architecture",
    "database",
    "optimization",
    "performance",
    "trade-off",
    "bottleneck",
    "latency",
    "throughput",
    "concurrent",
    "distributed",
    "microservice",
    "constraint",
];

/// Words that signal a deliberately structured argument.
const TRANSITION_WORDS: &[&str] = &[
    "first",
    "second",
    "then",
    "next",
    "finally",
    "because",
    "therefore",
    "however",
    "additionally",
    "furthermore",
    "in contrast",
    "for example",
];

const LENGTH_WEIGHT: f64 = 0.3;
const TECHNICAL_WEIGHT: f64 = 0.35;
const STRUCTURE_WEIGHT: f64 = 0.35;

/// Weighted score at or above which a response is HIGH.
pub const HIGH_THRESHOLD: f64 = 0.6;

/// Weighted score at or above which a response is MEDIUM.
pub const MEDIUM_THRESHOLD: f64 = 0.35;

/// Coarse classification of the reasoning depth a response needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub const ALL: [ComplexityLevel; 3] = [
        ComplexityLevel::Low,
        ComplexityLevel::Medium,
        ComplexityLevel::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Low => "low",
            ComplexityLevel::Medium => "medium",
            ComplexityLevel::High => "high",
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ComplexityLevel::Low),
            "medium" => Ok(ComplexityLevel::Medium),
            "high" => Ok(ComplexityLevel::High),
            other => Err(format!("unknown complexity level: {other}")),
        }
    }
}

/// What the assessor knows about the session besides the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseContext {
    pub phase: Option<InterviewPhase>,
    /// Complexity assessed for the previous turn, if any.
    pub prior: Option<ComplexityLevel>,
}

impl PhaseContext {
    pub fn new(phase: InterviewPhase, prior: Option<ComplexityLevel>) -> Self {
        Self {
            phase: Some(phase),
            prior,
        }
    }
}

/// Per-signal breakdown behind an assessment, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplexitySignals {
    pub length: f64,
    pub technical: f64,
    pub structure: f64,
    pub momentum: f64,
}

impl ComplexitySignals {
    /// Weighted sum used for bucketing.
    pub fn weighted(&self) -> f64 {
        self.length * LENGTH_WEIGHT
            + self.technical * TECHNICAL_WEIGHT
            + self.structure * STRUCTURE_WEIGHT
            + self.momentum
    }
}

/// Classifies responses into complexity levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityAssessor;

impl ComplexityAssessor {
    pub fn new() -> Self {
        Self
    }

    /// Classify `response` given the session context.
    ///
    /// Empty or whitespace-only input is LOW.
    pub fn assess(&self, response: &str, ctx: &PhaseContext) -> ComplexityLevel {
        if response.trim().is_empty() {
            return ComplexityLevel::Low;
        }

        let score = self.signals(response, ctx).weighted();
        if score >= HIGH_THRESHOLD {
            ComplexityLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        }
    }

    /// Compute the individual signals for `response`.
    pub fn signals(&self, response: &str, ctx: &PhaseContext) -> ComplexitySignals {
        ComplexitySignals {
            length: length_signal(response),
            technical: technical_signal(response),
            structure: structure_signal(response),
            momentum: momentum_signal(ctx.prior),
        }
    }
}

fn length_signal(response: &str) -> f64 {
    match response.split_whitespace().count() {
        0..=19 => 0.1,
        20..=49 => 0.3,
        50..=149 => 0.6,
        150..=299 => 0.8,
        _ => 1.0,
    }
}

fn technical_signal(response: &str) -> f64 {
    let lower = response.to_lowercase();
    let hits = TECHNICAL_INDICATORS
        .iter()
        .filter(|term| lower.contains(**term))
        .count();
    (hits as f64 / 5.0).min(1.0)
}

fn structure_signal(response: &str) -> f64 {
    let lower = response.to_lowercase();

    let sentences = response
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let blocks = PARAGRAPH_BREAK_RE.find_iter(response).count()
        + LIST_ITEM_RE.find_iter(response).count();
    let transitions = TRANSITION_WORDS
        .iter()
        .filter(|word| lower.contains(**word))
        .count();

    let score = (sentences as f64 / 10.0).min(0.4)
        + (blocks as f64 / 3.0).min(0.3)
        + (transitions as f64 / 5.0).min(0.3);
    score.min(1.0)
}

// A deep previous turn nudges borderline responses upward so routing does
// not oscillate between strategies within one line of reasoning.
fn momentum_signal(prior: Option<ComplexityLevel>) -> f64 {
    match prior {
        Some(ComplexityLevel::High) => 0.1,
        Some(ComplexityLevel::Medium) => 0.05,
        Some(ComplexityLevel::Low) | None => 0.0,
    }
}
