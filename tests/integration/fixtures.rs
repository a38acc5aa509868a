//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A scripted reasoning provider with configurable scores, latency and failures
//! - Building services and draining their directive channel
//! - Canned candidate responses

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

use catalyst::assessment::Competency;
use catalyst::config::Config;
use catalyst::orchestration::{
    DirectiveCommand, EvaluationStore, InterviewService, NullStore, PhaseDirective,
};
use catalyst::provider::{ProviderError, ProviderScore, ReasoningProvider, StrategyContext};
use catalyst::SessionId;

/// Short scoping answer; assesses as LOW and routes to LEAN.
pub const SHORT_ANSWER: &str = "I would start by clarifying who the users are.";

/// A second short answer with a different digest.
pub const OTHER_SHORT_ANSWER: &str = "Let me confirm the main requirement before designing.";

/// Provider whose behaviour is fixed by the test.
///
/// Scores default to `default_score` and can be overridden per competency
/// at any time. The first `fail_first` calls fail with `Unavailable`.
pub struct ScriptedProvider {
    default_score: f64,
    overrides: Mutex<HashMap<Competency, f64>>,
    delay: Duration,
    fail_remaining: AtomicUsize,
    panics: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn uniform(score: f64) -> Self {
        Self {
            default_score: score,
            overrides: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            fail_remaining: AtomicUsize::new(0),
            panics: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_score(self, competency: Competency, score: f64) -> Self {
        self.set_score(competency, score);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, calls: usize) -> Self {
        self.fail_remaining.store(calls, Ordering::SeqCst);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn set_score(&self, competency: Competency, score: f64) {
        self.overrides.lock().unwrap().insert(competency, score);
    }

    /// Number of `score` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn score(
        &self,
        competency: Competency,
        _response: &str,
        _ctx: &StrategyContext,
    ) -> Result<ProviderScore, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("scripted provider panic");
        }
        let failed = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ProviderError::Unavailable("scripted outage".to_string()));
        }

        let score = self
            .overrides
            .lock()
            .unwrap()
            .get(&competency)
            .copied()
            .unwrap_or(self.default_score);
        Ok(ProviderScore {
            competency,
            score,
            evidence: format!("scripted evidence for {competency}"),
            rationale: format!("scripted {score:.1}"),
        })
    }
}

/// A service wired to `provider` with default configuration.
pub fn service_with(
    provider: Arc<ScriptedProvider>,
) -> (InterviewService, UnboundedReceiver<PhaseDirective>) {
    service_with_config(&Config::default(), provider, Arc::new(NullStore))
}

pub fn service_with_config(
    config: &Config,
    provider: Arc<ScriptedProvider>,
    store: Arc<dyn EvaluationStore>,
) -> (InterviewService, UnboundedReceiver<PhaseDirective>) {
    InterviewService::new(config, provider, store)
}

/// Start a session with a fixed id and discard its opening directive.
pub fn start(
    service: &InterviewService,
    rx: &mut UnboundedReceiver<PhaseDirective>,
    id: &str,
) -> SessionId {
    let id = service
        .start_session(Some(SessionId::from(id)))
        .expect("Failed to start session");
    drain(rx);
    id
}

/// Collect every directive issued so far.
pub fn drain(rx: &mut UnboundedReceiver<PhaseDirective>) -> Vec<PhaseDirective> {
    let mut directives = Vec::new();
    while let Ok(directive) = rx.try_recv() {
        directives.push(directive);
    }
    directives
}

pub fn commands(directives: &[PhaseDirective]) -> Vec<DirectiveCommand> {
    directives.iter().map(|d| d.command).collect()
}

/// Config with a short evaluation timeout and the given retry budget.
pub fn fast_fail_config(timeout_ms: u64, max_attempts: u32, abandon_after: u32) -> Config {
    let mut config = Config::default();
    config.orchestrator.evaluation_timeout_ms = timeout_ms;
    config.orchestrator.max_attempts = max_attempts;
    config.orchestrator.abandon_after_failed_turns = abandon_after;
    config
}
