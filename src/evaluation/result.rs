//! Evaluation result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::assessment::{Competency, CompetencyScore, ComplexityLevel, ReasoningStrategy};
use crate::interview::{InterviewPhase, SessionId};

/// Cost and latency bookkeeping attached to every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Wall-clock time from the first provider call to the last result.
    pub latency_ms: u64,
    pub tokens_used: u64,
    /// Monetary cost in the pricing currency.
    pub cost: f64,
    /// True only on copies served from the cache.
    pub cache_hit: bool,
    pub strategy_used: ReasoningStrategy,
}

/// Outcome of evaluating one turn. Immutable once created; cache hits hand
/// out copies with `performance.cache_hit` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub session_id: SessionId,
    pub phase: InterviewPhase,
    pub complexity: ComplexityLevel,
    pub strategy: ReasoningStrategy,
    pub competencies: BTreeMap<Competency, CompetencyScore>,
    pub performance: PerformanceMetrics,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn score(&self, competency: Competency) -> Option<f64> {
        self.competencies.get(&competency).map(|c| c.score)
    }

    /// Mean over every scored competency.
    pub fn average(&self) -> Option<f64> {
        if self.competencies.is_empty() {
            return None;
        }
        let total: f64 = self.competencies.values().map(|c| c.score).sum();
        Some(total / self.competencies.len() as f64)
    }

    /// The lowest-scoring competency, if any were scored.
    pub fn weakest(&self) -> Option<&CompetencyScore> {
        self.competencies
            .values()
            .min_by(|a, b| a.score.total_cmp(&b.score))
    }

    pub fn is_cache_hit(&self) -> bool {
        self.performance.cache_hit
    }

    /// Copy of this result marked as served from the cache.
    pub fn as_cache_hit(&self) -> Self {
        let mut copy = self.clone();
        copy.performance.cache_hit = true;
        copy
    }
}
