//! Phase gating.
//!
//! A phase may only be left when its latest evaluation meets the phase's
//! bar: every configured competency minimum and, if set, the mean over all
//! scored competencies. A bar on a competency the evaluation did not score
//! fails, so a cheap strategy can never pass a gate it did not measure.

use serde::{Deserialize, Serialize};

use crate::assessment::{Competency, ReasoningStrategy};
use crate::config::{GateConfig, GatingConfig};
use crate::evaluation::EvaluationResult;
use crate::interview::InterviewPhase;

/// One unmet requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    /// `None` for the aggregate mean requirement.
    pub competency: Option<Competency>,
    pub required: f64,
    /// `None` when the competency was not scored.
    pub actual: Option<f64>,
}

/// Outcome of checking a phase's gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateDecision {
    /// The bar is met; the phase may advance.
    Passed,
    /// The evaluation fell short; probe instead of advancing.
    BelowBar { shortfalls: Vec<Shortfall> },
    /// No evaluation was available (failure or timeout). Fails closed.
    Unavailable { reason: String },
    /// The phase has no gate (it does not accept turns).
    NotGated,
}

impl GateDecision {
    pub fn passed(&self) -> bool {
        matches!(self, GateDecision::Passed)
    }

    /// The competency furthest below its bar, if any.
    pub fn weakest(&self) -> Option<Competency> {
        match self {
            GateDecision::BelowBar { shortfalls } => shortfalls
                .iter()
                .filter_map(|s| s.competency.map(|c| (c, s.required - s.actual.unwrap_or(0.0))))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(c, _)| c),
            _ => None,
        }
    }
}

/// Phase gates built from configuration.
#[derive(Debug, Clone, Default)]
pub struct GatePolicy {
    config: GatingConfig,
}

impl GatePolicy {
    pub fn new(config: GatingConfig) -> Self {
        Self { config }
    }

    pub fn gate(&self, phase: InterviewPhase) -> Option<&GateConfig> {
        match phase {
            InterviewPhase::Scoping => Some(&self.config.scoping),
            InterviewPhase::Analysis => Some(&self.config.analysis),
            InterviewPhase::Synthesis => Some(&self.config.synthesis),
            InterviewPhase::Setup | InterviewPhase::Complete | InterviewPhase::Abandoned => None,
        }
    }

    /// Competencies with an explicit bar in `phase`.
    pub fn gated_competencies(&self, phase: InterviewPhase) -> Vec<Competency> {
        self.gate(phase)
            .map(|gate| gate.bars.iter().map(|bar| bar.competency).collect())
            .unwrap_or_default()
    }

    /// Whether `strategy` scores every competency gated in `phase`.
    pub fn strategy_covers(&self, phase: InterviewPhase, strategy: ReasoningStrategy) -> bool {
        self.gated_competencies(phase)
            .into_iter()
            .all(|c| strategy.covers(c))
    }

    /// Check `result` against the gate of `phase`.
    pub fn check(&self, phase: InterviewPhase, result: &EvaluationResult) -> GateDecision {
        let Some(gate) = self.gate(phase) else {
            return GateDecision::NotGated;
        };

        let mut shortfalls: Vec<Shortfall> = gate
            .bars
            .iter()
            .filter_map(|bar| {
                let actual = result.score(bar.competency);
                match actual {
                    Some(score) if score >= bar.min_score => None,
                    _ => Some(Shortfall {
                        competency: Some(bar.competency),
                        required: bar.min_score,
                        actual,
                    }),
                }
            })
            .collect();

        if let Some(required) = gate.min_average {
            let actual = result.average();
            if !actual.is_some_and(|avg| avg >= required) {
                shortfalls.push(Shortfall {
                    competency: None,
                    required,
                    actual,
                });
            }
        }

        if shortfalls.is_empty() {
            GateDecision::Passed
        } else {
            GateDecision::BelowBar { shortfalls }
        }
    }
}
