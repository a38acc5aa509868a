//! Reasoning provider boundary.
//!
//! The model that actually judges a response is an external collaborator.
//! The evaluator only sees it through `ReasoningProvider`: given a
//! competency, the response text, and the strategy context, return a score
//! with supporting evidence and a rationale. Calls are fallible and may
//! block for the duration of a remote round trip.

mod heuristic;

pub use heuristic::KeywordProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::{Competency, ComplexityLevel, ReasoningStrategy};
use crate::interview::{InterviewPhase, SessionId};

/// Failures reported by a reasoning provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider rate limited")]
    RateLimited,

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Context handed to the provider alongside each scoring request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyContext {
    pub session_id: SessionId,
    pub phase: InterviewPhase,
    pub complexity: ComplexityLevel,
    pub strategy: ReasoningStrategy,
}

/// Raw provider output for one competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderScore {
    pub competency: Competency,
    pub score: f64,
    pub evidence: String,
    pub rationale: String,
}

/// Capability interface to the model that scores responses.
///
/// # Example
///
/// ```ignore
/// use catalyst::provider::{KeywordProvider, ReasoningProvider};
///
/// let provider = KeywordProvider::new();
/// let score = provider.score(Competency::Communication, "First, ...", &ctx).await?;
/// ```
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Score a single competency.
    async fn score(
        &self,
        competency: Competency,
        response: &str,
        ctx: &StrategyContext,
    ) -> Result<ProviderScore, ProviderError>;

    /// Score a whole competency set in one round trip.
    ///
    /// The default falls back to one `score` call per competency. Providers
    /// with a native batch endpoint should override it.
    async fn score_batch(
        &self,
        competencies: &[Competency],
        response: &str,
        ctx: &StrategyContext,
    ) -> Result<Vec<ProviderScore>, ProviderError> {
        let mut scores = Vec::with_capacity(competencies.len());
        for competency in competencies {
            scores.push(self.score(*competency, response, ctx).await?);
        }
        Ok(scores)
    }
}
