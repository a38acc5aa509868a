//! Token, cost and latency accounting.
//!
//! The `Ledger` is a side channel: it observes evaluations and never
//! changes their outcome. Computed evaluations add to the cost totals;
//! cache hits are counted but cost nothing.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::result::EvaluationResult;
use crate::assessment::ReasoningStrategy;

/// Number of most recent computed evaluations in the rolling cost window.
pub const ROLLING_WINDOW: usize = 100;

/// Approximate tokens consumed by a strategy for a response of
/// `word_count` words.
pub fn approximate_tokens(word_count: usize, token_multiplier: u32) -> u64 {
    word_count as u64 * u64::from(token_multiplier)
}

/// `tokens * base_rate * cost_multiplier / 1000`, with `base_rate` priced
/// per 1K tokens.
pub fn evaluation_cost(tokens: u64, base_rate: f64, cost_multiplier: f64) -> f64 {
    tokens as f64 * base_rate * cost_multiplier / 1000.0
}

/// Per-strategy totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyTally {
    pub evaluations: u64,
    pub tokens: u64,
    pub cost: f64,
}

/// Point-in-time view of the ledger plus cache occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub cache_entries: usize,
    pub computed: u64,
    pub cache_hits: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Cost of the last `ROLLING_WINDOW` computed evaluations.
    pub rolling_cost: f64,
    pub by_strategy: BTreeMap<ReasoningStrategy, StrategyTally>,
}

impl TelemetrySnapshot {
    /// Fraction of served evaluations that came from the cache.
    pub fn hit_rate(&self) -> f64 {
        let served = self.computed + self.cache_hits;
        if served == 0 {
            0.0
        } else {
            self.cache_hits as f64 / served as f64
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    computed: u64,
    cache_hits: u64,
    failures: u64,
    timeouts: u64,
    total_tokens: u64,
    total_cost: f64,
    recent: VecDeque<f64>,
    by_strategy: BTreeMap<ReasoningStrategy, StrategyTally>,
}

/// Process-wide evaluation bookkeeping.
///
/// The lock is only held for counter updates, never across an await.
#[derive(Debug, Default)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // Counters stay meaningful after a panic elsewhere, so recover the guard.
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an evaluation that actually ran the provider.
    pub fn record_computed(&self, result: &EvaluationResult) {
        let metrics = &result.performance;
        let mut state = self.state();
        state.computed += 1;
        state.total_tokens += metrics.tokens_used;
        state.total_cost += metrics.cost;
        state.recent.push_back(metrics.cost);
        if state.recent.len() > ROLLING_WINDOW {
            state.recent.pop_front();
        }
        let tally = state.by_strategy.entry(metrics.strategy_used).or_default();
        tally.evaluations += 1;
        tally.tokens += metrics.tokens_used;
        tally.cost += metrics.cost;
    }

    pub fn record_hit(&self) {
        self.state().cache_hits += 1;
    }

    pub fn record_failure(&self) {
        self.state().failures += 1;
    }

    pub fn record_timeout(&self) {
        self.state().timeouts += 1;
    }

    pub fn snapshot(&self, cache_entries: usize) -> TelemetrySnapshot {
        let state = self.state();
        TelemetrySnapshot {
            cache_entries,
            computed: state.computed,
            cache_hits: state.cache_hits,
            failures: state.failures,
            timeouts: state.timeouts,
            total_tokens: state.total_tokens,
            total_cost: state.total_cost,
            rolling_cost: state.recent.iter().sum(),
            by_strategy: state.by_strategy.clone(),
        }
    }
}
