//! Cached, accounted evaluation.
//!
//! `EvaluationPipeline` is the one object the orchestrators share: it
//! fingerprints a turn, serves it from the cache or runs the evaluator,
//! books the outcome in the ledger and hands computed results to the store.

use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::debug;

use super::accounting::{Ledger, TelemetrySnapshot};
use super::cache::{EvaluationCache, Fingerprint};
use super::evaluator::Evaluator;
use super::result::EvaluationResult;
use crate::assessment::{ComplexityLevel, ReasoningStrategy, StrategyCatalog};
use crate::config::Config;
use crate::error::Result;
use crate::interview::Turn;
use crate::orchestration::{spawn_store, EvaluationStore, NullStore};
use crate::provider::ReasoningProvider;

pub struct EvaluationPipeline {
    evaluator: Evaluator,
    cache: Arc<EvaluationCache>,
    ledger: Arc<Ledger>,
    store: Arc<dyn EvaluationStore>,
    // Pending store writes, awaited by `flush`.
    writes: TaskTracker,
    content_addressed: bool,
}

impl std::fmt::Debug for EvaluationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationPipeline")
            .field("evaluator", &self.evaluator)
            .field("cache_entries", &self.cache.len())
            .field("pending_writes", &self.writes.len())
            .field("content_addressed", &self.content_addressed)
            .finish()
    }
}

impl EvaluationPipeline {
    pub fn new(evaluator: Evaluator, cache: Arc<EvaluationCache>, content_addressed: bool) -> Self {
        Self {
            evaluator,
            cache,
            ledger: Arc::new(Ledger::new()),
            store: Arc::new(NullStore),
            writes: TaskTracker::new(),
            content_addressed,
        }
    }

    /// Persist every computed result to `store`.
    pub fn with_store(mut self, store: Arc<dyn EvaluationStore>) -> Self {
        self.store = store;
        self
    }

    /// Build a pipeline with a fresh cache from configuration.
    pub fn from_config(config: &Config, provider: Arc<dyn ReasoningProvider>) -> Self {
        let catalog = Arc::new(StrategyCatalog::new(&config.strategies));
        let evaluator = Evaluator::new(provider, catalog, config.pricing.base_rate);
        Self::new(
            evaluator,
            Arc::new(EvaluationCache::new()),
            config.cache.content_addressed,
        )
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        self.evaluator.catalog()
    }

    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn fingerprint(
        &self,
        turn: &Turn,
        complexity: ComplexityLevel,
        strategy: ReasoningStrategy,
    ) -> Fingerprint {
        Fingerprint::new(turn, complexity, strategy, self.content_addressed)
    }

    /// Evaluate `turn` under `strategy`, computing at most once per fingerprint.
    ///
    /// Computed results are booked and persisted by the computation itself,
    /// so they are accounted even when this caller stops waiting.
    pub async fn run(
        &self,
        turn: &Turn,
        complexity: ComplexityLevel,
        strategy: ReasoningStrategy,
    ) -> Result<EvaluationResult> {
        let fingerprint = self.fingerprint(turn, complexity, strategy);
        let evaluator = self.evaluator.clone();
        let ledger = Arc::clone(&self.ledger);
        let store = Arc::clone(&self.store);
        let writes = self.writes.clone();
        let owned_turn = turn.clone();

        let outcome = self
            .cache
            .get_or_compute(&fingerprint, move || async move {
                let result = evaluator.evaluate(&owned_turn, complexity, strategy).await?;
                ledger.record_computed(&result);
                spawn_store(&writes, &store, &result);
                Ok(result)
            })
            .await;

        match outcome {
            Ok((result, hit)) => {
                if hit {
                    self.ledger.record_hit();
                }
                debug!(
                    fingerprint = %fingerprint,
                    cache_hit = hit,
                    cost = result.performance.cost,
                    "EvaluationPipeline::run"
                );
                Ok(result)
            }
            Err(e) => {
                self.ledger.record_failure();
                Err(e)
            }
        }
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.ledger.snapshot(self.cache.len())
    }

    /// Wait for every store write spawned so far.
    ///
    /// Computations still running when this is called are not waited for.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }
}
