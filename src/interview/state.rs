//! Interview session state with phase transition validation.
//!
//! `InterviewSession` owns the phase, the ordered turn history and the
//! routing history of one interview, and enforces the phase ordering:
//!
//! Setup -> Scoping -> Analysis -> Synthesis -> Complete
//!
//! An explicit end command may close the interview from any phase that
//! accepts turns, and Abandoned is reachable from every non-terminal phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::ComplexityLevel;
use crate::error::{Error, Result};

use super::{InterviewPhase, RoutingRecord, SessionId, Turn};

/// What caused a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// An explicit external command (start, end, abandon).
    Command,
    /// An evaluation met the phase's minimum bar.
    Gate,
    /// Repeated evaluation failures.
    Failure,
}

impl std::fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionTrigger::Command => write!(f, "command"),
            TransitionTrigger::Gate => write!(f, "gate"),
            TransitionTrigger::Failure => write!(f, "failure"),
        }
    }
}

/// A record of a phase transition with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseHistoryEntry {
    /// The phase that was entered.
    pub phase: InterviewPhase,
    /// When this phase was entered.
    pub entered_at: DateTime<Utc>,
    /// `None` for the initial phase.
    pub trigger: Option<TransitionTrigger>,
}

/// State of one interview, owned by a single orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    id: SessionId,
    phase: InterviewPhase,
    started_at: DateTime<Utc>,
    phase_history: Vec<PhaseHistoryEntry>,
    turns: Vec<Turn>,
    routing: Vec<RoutingRecord>,
}

impl InterviewSession {
    /// Create a session in Setup.
    pub fn new(id: SessionId) -> Self {
        let started_at = Utc::now();
        Self {
            id,
            phase: InterviewPhase::Setup,
            started_at,
            phase_history: vec![PhaseHistoryEntry {
                phase: InterviewPhase::Setup,
                entered_at: started_at,
                trigger: None,
            }],
            turns: Vec::new(),
            routing: Vec::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> InterviewPhase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Check if a transition to the target phase is valid from the current phase.
    ///
    /// Valid transitions:
    /// - one step forward along the phase ordering
    /// - Scoping, Analysis or Synthesis -> Complete (end command)
    /// - any non-terminal phase -> Abandoned
    pub fn can_transition(&self, target: InterviewPhase) -> bool {
        let current = self.phase;
        if current.is_terminal() {
            return false;
        }
        current.next() == Some(target)
            || (target == InterviewPhase::Complete && current.accepts_turns())
            || target == InterviewPhase::Abandoned
    }

    /// Attempt to move the session to a new phase.
    pub fn transition(&mut self, target: InterviewPhase, trigger: TransitionTrigger) -> Result<()> {
        if !self.can_transition(target) {
            return Err(Error::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: target.to_string(),
            });
        }

        self.phase = target;
        self.phase_history.push(PhaseHistoryEntry {
            phase: target,
            entered_at: Utc::now(),
            trigger: Some(trigger),
        });

        Ok(())
    }

    /// Get the history of all phases visited, in order.
    pub fn phase_history(&self) -> &[PhaseHistoryEntry] {
        &self.phase_history
    }

    /// Number of transitions made since creation.
    pub fn transition_count(&self) -> usize {
        self.phase_history.len() - 1
    }

    /// Append a turn and return its index.
    pub fn record_turn(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn record_routing(&mut self, record: RoutingRecord) {
        self.routing.push(record);
    }

    pub fn routing_history(&self) -> &[RoutingRecord] {
        &self.routing
    }

    /// Assessed complexity of the most recent turn, ignoring caller hints.
    pub fn last_assessed(&self) -> Option<ComplexityLevel> {
        self.routing.last().map(|r| r.assessed)
    }
}
