//! Per-session interview orchestration.
//!
//! On every turn the orchestrator runs the full pipeline:
//!
//! 1. Assess complexity (always, even for trivial input)
//! 2. Resolve a strategy, applying caller hints only where they are safe
//! 3. Evaluate through the shared cache, bounded by a timeout
//! 4. Check the phase gate and either advance or ask for a probe
//!
//! Evaluation failures and timeouts fail the gate closed. After a
//! configured number of consecutive failed turns the session is abandoned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::directive::{DirectiveSender, Intervention, PhaseDirective};
use super::gating::{GateDecision, GatePolicy};
use super::request::{EvaluationRequest, NextAction, TurnReport};
use crate::assessment::{
    Competency, ComplexityAssessor, ComplexityLevel, PhaseContext, ReasoningStrategy,
};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::evaluation::{EvaluationPipeline, EvaluationResult, Fingerprint};
use crate::interview::{
    InterviewPhase, InterviewSession, RoutingRecord, SessionId, TransitionTrigger, Turn,
};

/// Explicit external commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCommand {
    /// Leave Setup and ask the first scoping question.
    Start,
    /// End the interview and request the report.
    End,
    Abandon,
}

impl std::fmt::Display for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCommand::Start => write!(f, "start"),
            SessionCommand::End => write!(f, "end"),
            SessionCommand::Abandon => write!(f, "abandon"),
        }
    }
}

impl std::str::FromStr for SessionCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(SessionCommand::Start),
            "end" | "end_interview" => Ok(SessionCommand::End),
            "abandon" => Ok(SessionCommand::Abandon),
            other => Err(format!("unknown session command: {other}")),
        }
    }
}

/// Snapshot of one session for observability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetrics {
    pub session_id: SessionId,
    pub phase: InterviewPhase,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub transitions: usize,
    pub interventions: u32,
    pub turns: usize,
    pub consecutive_failures: u32,
    /// Latest score seen for each competency.
    pub scores: BTreeMap<Competency, f64>,
    pub complexity: Option<ComplexityLevel>,
    pub strategy: Option<ReasoningStrategy>,
    /// Cost of the distinct evaluations this session received.
    pub cost: f64,
}

/// Everything an orchestrator shares with its siblings.
#[derive(Clone)]
pub struct OrchestratorContext {
    pub pipeline: Arc<EvaluationPipeline>,
    pub gates: Arc<GatePolicy>,
    pub settings: OrchestratorConfig,
    pub directives: DirectiveSender,
}

/// Routing chosen for one turn.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Routing {
    complexity: ComplexityLevel,
    strategy: ReasoningStrategy,
    overridden: bool,
}

/// Drives one interview session.
pub struct Orchestrator {
    session: InterviewSession,
    ctx: OrchestratorContext,
    assessor: ComplexityAssessor,
    scores: BTreeMap<Competency, f64>,
    interventions: u32,
    consecutive_failures: u32,
    cost: f64,
    // Evaluations already charged to `cost`.
    charged: HashSet<Fingerprint>,
}

impl Orchestrator {
    pub fn new(session_id: SessionId, ctx: OrchestratorContext) -> Self {
        Self {
            session: InterviewSession::new(session_id),
            ctx,
            assessor: ComplexityAssessor::new(),
            scores: BTreeMap::new(),
            interventions: 0,
            consecutive_failures: 0,
            cost: 0.0,
            charged: HashSet::new(),
        }
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn phase(&self) -> InterviewPhase {
        self.session.phase()
    }

    /// Apply an explicit command and return the resulting phase.
    pub fn command(&mut self, command: SessionCommand) -> Result<InterviewPhase> {
        let target = match command {
            SessionCommand::Start => InterviewPhase::Scoping,
            SessionCommand::End => InterviewPhase::Complete,
            SessionCommand::Abandon => InterviewPhase::Abandoned,
        };
        if command == SessionCommand::Start && self.phase() != InterviewPhase::Setup {
            return Err(Error::InvalidPhaseTransition {
                from: self.phase().to_string(),
                to: target.to_string(),
            });
        }
        self.enter(target, TransitionTrigger::Command)?;
        Ok(target)
    }

    /// Evaluate one candidate response and apply the phase gate.
    pub async fn handle_turn(&mut self, request: &EvaluationRequest) -> Result<TurnReport> {
        request.validate()?;
        let phase = self.phase();
        if phase.is_terminal() {
            return Err(Error::SessionClosed {
                id: self.session.id().to_string(),
                phase: phase.to_string(),
            });
        }
        if !phase.accepts_turns() {
            return Err(Error::SessionNotStarted(self.session.id().to_string()));
        }
        self.check_claimed_phase(request, phase);

        let mut turn = Turn::new(self.session.id().clone(), phase, request.response.as_str());
        if let Some(ms) = request.response_time_ms {
            turn = turn.with_response_time(ms);
        }

        let assessed = self.assessor.assess(
            &turn.response,
            &PhaseContext::new(phase, self.session.last_assessed()),
        );
        let routing = self.route(phase, assessed, request);

        let turn_index = self.session.record_turn(turn.clone());
        self.session.record_routing(RoutingRecord {
            turn_index,
            assessed,
            complexity: routing.complexity,
            strategy: routing.strategy,
            overridden: routing.overridden,
        });

        debug!(
            session = %self.session.id(),
            phase = %phase,
            turn_index,
            assessed = %assessed,
            complexity = %routing.complexity,
            strategy = %routing.strategy,
            overridden = routing.overridden,
            "Orchestrator::handle_turn"
        );

        let (evaluation, gate, next_action, error) =
            match self.evaluate_with_retry(&turn, routing).await {
                Ok(result) => {
                    let (gate, next_action) = self.apply_gate(phase, &turn, &result)?;
                    (Some(result), gate, next_action, None)
                }
                Err(e) => {
                    let next_action = self.record_failure(&e)?;
                    let gate = GateDecision::Unavailable {
                        reason: e.to_string(),
                    };
                    (None, gate, next_action, Some(e.to_string()))
                }
            };

        Ok(TurnReport {
            session_id: self.session.id().clone(),
            turn_index,
            evaluated_phase: phase,
            phase: self.phase(),
            complexity: routing.complexity,
            strategy: routing.strategy,
            routing_overridden: routing.overridden,
            evaluation,
            gate,
            next_action,
            error,
        })
    }

    pub fn metrics(&self) -> SessionMetrics {
        let last = self.session.routing_history().last();
        let started_at = self.session.started_at();
        SessionMetrics {
            session_id: self.session.id().clone(),
            phase: self.phase(),
            started_at,
            duration_ms: (Utc::now() - started_at).num_milliseconds().max(0) as u64,
            transitions: self.session.transition_count(),
            interventions: self.interventions,
            turns: self.session.turns().len(),
            consecutive_failures: self.consecutive_failures,
            scores: self.scores.clone(),
            complexity: last.map(|r| r.complexity),
            strategy: last.map(|r| r.strategy),
            cost: self.cost,
        }
    }

    // The session's own phase is authoritative; a differing claim is only logged.
    fn check_claimed_phase(&self, request: &EvaluationRequest, phase: InterviewPhase) {
        let Some(claimed) = request.current_phase.as_deref() else {
            return;
        };
        match claimed.parse::<InterviewPhase>() {
            Ok(claimed) if claimed == phase => {}
            Ok(claimed) => warn!(
                session = %self.session.id(),
                claimed = %claimed,
                actual = %phase,
                "caller phase does not match session phase"
            ),
            Err(_) => warn!(
                session = %self.session.id(),
                taxonomy_gap = true,
                label = claimed,
                "unrecognized phase label"
            ),
        }
    }

    fn route(
        &self,
        phase: InterviewPhase,
        assessed: ComplexityLevel,
        request: &EvaluationRequest,
    ) -> Routing {
        let catalog = self.ctx.pipeline.catalog();
        let mut complexity = assessed;
        let mut overridden = false;

        // Unknown labels are logged by the catalog and leave the routing alone.
        if let Some(hinted) = request
            .complexity
            .as_deref()
            .and_then(|label| catalog.parse_level(label))
        {
            overridden |= hinted != assessed;
            complexity = hinted;
        }

        let mut strategy = catalog.resolve(complexity);
        if let Some(hinted) = request
            .reasoning_strategy
            .as_deref()
            .and_then(|label| catalog.parse_strategy(label))
        {
            if self.ctx.gates.strategy_covers(phase, hinted) {
                overridden |= hinted != strategy;
                strategy = hinted;
            } else {
                warn!(
                    session = %self.session.id(),
                    hinted = %hinted,
                    phase = %phase,
                    "strategy hint does not score the gated competencies, ignored"
                );
            }
        }

        Routing {
            complexity,
            strategy,
            overridden,
        }
    }

    async fn evaluate_with_retry(&self, turn: &Turn, routing: Routing) -> Result<EvaluationResult> {
        let timeout = self.ctx.settings.evaluation_timeout();
        let max_attempts = self.ctx.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = tokio::time::timeout(
                timeout,
                self.ctx
                    .pipeline
                    .run(turn, routing.complexity, routing.strategy),
            )
            .await;
            let err = match outcome {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => e,
                Err(_) => {
                    self.ctx.pipeline.ledger().record_timeout();
                    Error::Timeout(timeout)
                }
            };
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }
            warn!(
                session = %self.session.id(),
                attempt,
                max_attempts,
                error = %err,
                "evaluation failed, retrying"
            );
            attempt += 1;
        }
    }

    fn apply_gate(
        &mut self,
        phase: InterviewPhase,
        turn: &Turn,
        result: &EvaluationResult,
    ) -> Result<(GateDecision, NextAction)> {
        self.consecutive_failures = 0;
        for (competency, score) in &result.competencies {
            self.scores.insert(*competency, score.score);
        }
        // Charged once per fingerprint, whether this turn computed it or a
        // timed-out attempt left it in the cache.
        let fingerprint = self
            .ctx
            .pipeline
            .fingerprint(turn, result.complexity, result.strategy);
        if self.charged.insert(fingerprint) {
            self.cost += result.performance.cost;
        }

        let gate = self.ctx.gates.check(phase, result);
        if gate.passed() {
            if let Some(next) = phase.next() {
                self.enter(next, TransitionTrigger::Gate)?;
                return Ok((gate, NextAction::Advance { to: next }));
            }
        }

        let intervention = Intervention::for_turn(phase, turn.word_count());
        self.interventions += 1;
        self.ctx.directives.send(PhaseDirective::probe(
            self.session.id().clone(),
            phase,
            intervention,
            gate.weakest(),
        ));
        info!(
            session = %self.session.id(),
            phase = %phase,
            intervention = %intervention,
            "gate not met, probing"
        );
        Ok((gate, NextAction::Probe { intervention }))
    }

    fn record_failure(&mut self, error: &Error) -> Result<NextAction> {
        self.consecutive_failures += 1;
        let limit = self.ctx.settings.abandon_after_failed_turns;
        warn!(
            session = %self.session.id(),
            consecutive_failures = self.consecutive_failures,
            limit,
            error = %error,
            "turn evaluation failed"
        );
        if limit > 0 && self.consecutive_failures >= limit {
            error!(
                session = %self.session.id(),
                failed_turns = self.consecutive_failures,
                "abandoning session after repeated evaluation failures"
            );
            self.enter(InterviewPhase::Abandoned, TransitionTrigger::Failure)?;
            return Ok(NextAction::Abandon);
        }
        Ok(NextAction::Retry)
    }

    fn enter(&mut self, target: InterviewPhase, trigger: TransitionTrigger) -> Result<()> {
        let from = self.phase();
        self.session.transition(target, trigger)?;
        info!(
            session = %self.session.id(),
            from = %from,
            to = %target,
            trigger = %trigger,
            "phase transition"
        );
        for directive in PhaseDirective::on_entry(self.session.id(), target) {
            self.ctx.directives.send(directive);
        }
        Ok(())
    }
}
