//! Offline keyword-signal provider.
//!
//! `KeywordProvider` scores competencies from indicator terms in the
//! response. It is deterministic and needs no network, which makes it the
//! default collaborator for the CLI and a realistic stand-in in tests.
//! It is not a substitute for a model.

use async_trait::async_trait;

use super::{ProviderError, ProviderScore, ReasoningProvider, StrategyContext};
use crate::assessment::{Competency, MAX_SCORE};

/// One scoring signal for a competency.
#[derive(Debug, Clone, Copy)]
enum Signal {
    /// Add `bonus` once if any term appears.
    AnyOf(&'static [&'static str], f64),
    /// Add `bonus` for every term that appears.
    Each(&'static [&'static str], f64),
    /// Add `bonus` if the word count is strictly between the bounds.
    WordRange(usize, usize, f64),
}

struct Rubric {
    base: f64,
    signals: &'static [Signal],
}

fn rubric(competency: Competency) -> Rubric {
    use Signal::*;
    match competency {
        Competency::ProblemDefinition => Rubric {
            base: 2.0,
            signals: &[
                AnyOf(&["problem", "requirement"], 1.0),
                AnyOf(&["user", "customer"], 0.5),
                AnyOf(&["constraint", "limitation"], 0.5),
            ],
        },
        Competency::TechnicalDepth => Rubric {
            base: 2.0,
            signals: &[Each(
                &[
                    "algorithm",
                    "architecture",
                    "database",
                    "api",
                    "service",
                    "microservice",
                    "system",
                ],
                0.3,
            )],
        },
        Competency::Communication => Rubric {
            base: 2.0,
            signals: &[
                WordRange(50, 500, 1.0),
                AnyOf(&["first", "second", "then"], 0.5),
            ],
        },
        Competency::SolutionDesign => Rubric {
            base: 2.0,
            signals: &[
                AnyOf(&["design", "solution"], 1.0),
                AnyOf(&["component", "module"], 0.5),
                AnyOf(&["flow", "process"], 0.5),
            ],
        },
        Competency::ScalabilityConsiderations => Rubric {
            base: 1.0,
            signals: &[Each(
                &[
                    "scale",
                    "scalability",
                    "performance",
                    "load",
                    "throughput",
                    "capacity",
                ],
                0.5,
            )],
        },
        Competency::TradeoffAnalysis => Rubric {
            base: 1.0,
            signals: &[Each(
                &[
                    "trade-off",
                    "tradeoff",
                    "pros and cons",
                    "advantage",
                    "disadvantage",
                    "benefit",
                    "cost",
                ],
                0.5,
            )],
        },
        Competency::ImplementationDetails => Rubric {
            base: 1.0,
            signals: &[Each(
                &[
                    "implement",
                    "code",
                    "function",
                    "class",
                    "method",
                    "library",
                    "framework",
                ],
                0.3,
            )],
        },
        Competency::EdgeCaseHandling => Rubric {
            base: 1.0,
            signals: &[Each(
                &[
                    "edge case",
                    "corner case",
                    "exception",
                    "error",
                    "failure",
                    "fallback",
                ],
                0.5,
            )],
        },
        Competency::SystemIntegration => Rubric {
            base: 1.0,
            signals: &[Each(
                &[
                    "integration",
                    "interface",
                    "communication",
                    "protocol",
                    "messaging",
                ],
                0.4,
            )],
        },
    }
}

/// Deterministic keyword scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordProvider;

impl KeywordProvider {
    pub fn new() -> Self {
        Self
    }

    /// Score one competency synchronously.
    pub fn evaluate(&self, competency: Competency, response: &str) -> ProviderScore {
        let lower = response.to_lowercase();
        let word_count = response.split_whitespace().count();
        let rubric = rubric(competency);

        let mut score = rubric.base;
        let mut matched: Vec<&str> = Vec::new();
        for signal in rubric.signals {
            match *signal {
                Signal::AnyOf(terms, bonus) => {
                    if let Some(term) = terms.iter().find(|t| lower.contains(**t)) {
                        score += bonus;
                        matched.push(*term);
                    }
                }
                Signal::Each(terms, bonus) => {
                    for term in terms.iter().filter(|t| lower.contains(**t)) {
                        score += bonus;
                        matched.push(*term);
                    }
                }
                Signal::WordRange(min, max, bonus) => {
                    if word_count > min && word_count < max {
                        score += bonus;
                    }
                }
            }
        }
        let score = score.min(MAX_SCORE);

        let evidence = if matched.is_empty() {
            format!("No {} indicators found in {} words", competency, word_count)
        } else {
            format!(
                "Response contains {} {} indicator(s): {}",
                matched.len(),
                competency,
                matched.join(", ")
            )
        };
        let rationale = format!(
            "{} scored {:.1}/5.0 from {} matched signal(s) over a base of {:.1}",
            competency,
            score,
            matched.len(),
            rubric.base
        );

        ProviderScore {
            competency,
            score,
            evidence,
            rationale,
        }
    }
}

#[async_trait]
impl ReasoningProvider for KeywordProvider {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn score(
        &self,
        competency: Competency,
        response: &str,
        _ctx: &StrategyContext,
    ) -> Result<ProviderScore, ProviderError> {
        Ok(self.evaluate(competency, response))
    }
}
