//! Strategy execution against the reasoning provider.

use chrono::Utc;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::accounting::{approximate_tokens, evaluation_cost};
use super::result::{EvaluationResult, PerformanceMetrics};
use crate::assessment::{
    Competency, CompetencyScore, ComplexityLevel, ReasoningStrategy, ScoringMode, StrategyCatalog,
    StrategyDescriptor, MAX_SCORE, MIN_SCORE,
};
use crate::error::{Error, Result};
use crate::interview::Turn;
use crate::provider::{ProviderError, ProviderScore, ReasoningProvider, StrategyContext};

/// Runs a reasoning strategy over one turn.
///
/// Cheap to clone; the provider and catalog are shared.
#[derive(Clone)]
pub struct Evaluator {
    provider: Arc<dyn ReasoningProvider>,
    catalog: Arc<StrategyCatalog>,
    base_rate: f64,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("provider", &self.provider.name())
            .field("base_rate", &self.base_rate)
            .finish()
    }
}

impl Evaluator {
    pub fn new(
        provider: Arc<dyn ReasoningProvider>,
        catalog: Arc<StrategyCatalog>,
        base_rate: f64,
    ) -> Self {
        Self {
            provider,
            catalog,
            base_rate,
        }
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Score every competency `strategy` declares for `turn`.
    ///
    /// Any provider failure fails the whole evaluation; partial competency
    /// sets are never returned.
    pub async fn evaluate(
        &self,
        turn: &Turn,
        complexity: ComplexityLevel,
        strategy: ReasoningStrategy,
    ) -> Result<EvaluationResult> {
        let descriptor = self.catalog.descriptor(strategy);
        let ctx = StrategyContext {
            session_id: turn.session_id.clone(),
            phase: turn.phase,
            complexity,
            strategy,
        };

        debug!(
            session = %turn.session_id,
            phase = %turn.phase,
            strategy = %strategy,
            provider = self.provider.name(),
            competencies = descriptor.competencies.len(),
            "Evaluator::evaluate"
        );

        let start = Instant::now();
        let raw = match descriptor.scoring_mode {
            ScoringMode::Batch => self
                .provider
                .score_batch(descriptor.competencies, &turn.response, &ctx)
                .await
                .map_err(|source| Error::Provider {
                    competency: batch_label(descriptor),
                    source,
                })?,
            ScoringMode::PerCompetency => {
                try_join_all(descriptor.competencies.iter().map(|competency| {
                    let ctx = &ctx;
                    async move {
                        self.provider
                            .score(*competency, &turn.response, ctx)
                            .await
                            .map_err(|source| Error::Provider {
                                competency: competency.name().to_string(),
                                source,
                            })
                    }
                }))
                .await?
            }
        };
        let latency = start.elapsed();

        let competencies = collect_scores(descriptor, raw)?;
        for scored in competencies.values() {
            trace!(
                competency = %scored.competency,
                score = scored.score,
                tier = scored.tier.label(),
                "competency scored"
            );
        }
        let tokens_used = approximate_tokens(turn.word_count(), descriptor.token_multiplier);
        let cost = evaluation_cost(tokens_used, self.base_rate, descriptor.cost_multiplier);

        debug!(
            session = %turn.session_id,
            strategy = %strategy,
            latency_ms = latency.as_millis() as u64,
            tokens_used,
            cost,
            "evaluation complete"
        );

        Ok(EvaluationResult {
            session_id: turn.session_id.clone(),
            phase: turn.phase,
            complexity,
            strategy,
            competencies,
            performance: PerformanceMetrics {
                latency_ms: latency.as_millis() as u64,
                tokens_used,
                cost,
                cache_hit: false,
                strategy_used: strategy,
            },
            evaluated_at: Utc::now(),
        })
    }
}

fn batch_label(descriptor: &StrategyDescriptor) -> String {
    descriptor
        .competencies
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check the provider returned exactly the declared competency set, and
/// normalize each score.
fn collect_scores(
    descriptor: &StrategyDescriptor,
    raw: Vec<ProviderScore>,
) -> Result<BTreeMap<Competency, CompetencyScore>> {
    let mut scores = BTreeMap::new();
    for item in raw {
        let invalid = |reason: String| Error::Provider {
            competency: item.competency.name().to_string(),
            source: ProviderError::InvalidResponse(reason),
        };
        if !descriptor.competencies.contains(&item.competency) {
            return Err(invalid(format!(
                "not part of the {} competency set",
                descriptor.strategy
            )));
        }
        if scores.contains_key(&item.competency) {
            return Err(invalid("scored more than once".to_string()));
        }
        if !item.score.is_finite() {
            return Err(invalid(format!("non-finite score {}", item.score)));
        }

        let score = item.score.clamp(MIN_SCORE, MAX_SCORE);
        if score != item.score {
            warn!(
                competency = %item.competency,
                raw = item.score,
                clamped = score,
                "provider score out of range"
            );
        }
        scores.insert(
            item.competency,
            CompetencyScore::new(item.competency, score, item.evidence, item.rationale),
        );
    }

    if let Some(missing) = descriptor
        .competencies
        .iter()
        .find(|c| !scores.contains_key(*c))
    {
        return Err(Error::Provider {
            competency: missing.name().to_string(),
            source: ProviderError::InvalidResponse("competency missing from response".to_string()),
        });
    }
    Ok(scores)
}
