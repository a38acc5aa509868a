//! Inbound request and outbound report shapes.

use serde::{Deserialize, Serialize};

use super::directive::Intervention;
use super::gating::GateDecision;
use crate::assessment::{ComplexityLevel, ReasoningStrategy};
use crate::error::{Error, Result};
use crate::evaluation::EvaluationResult;
use crate::interview::{InterviewPhase, SessionId};

/// One candidate response as received from the caller.
///
/// `current_phase`, `complexity` and `reasoning_strategy` are caller
/// claims. They are treated as hints and never bypass assessment or gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub session_id: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl EvaluationRequest {
    pub fn new(session_id: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            response: response.into(),
            current_phase: None,
            complexity: None,
            reasoning_strategy: None,
            response_time_ms: None,
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.current_phase = Some(phase.into());
        self
    }

    pub fn with_complexity_hint(mut self, complexity: impl Into<String>) -> Self {
        self.complexity = Some(complexity.into());
        self
    }

    pub fn with_strategy_hint(mut self, strategy: impl Into<String>) -> Self {
        self.reasoning_strategy = Some(strategy.into());
        self
    }

    pub fn with_response_time(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = Some(response_time_ms);
        self
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::from(self.session_id.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(Error::Validation("session_id must not be empty".to_string()));
        }
        Ok(())
    }
}

/// What the caller should expect next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NextAction {
    /// The gate passed and the session moved on.
    Advance { to: InterviewPhase },
    /// The gate did not pass; the Interviewer was asked to probe.
    Probe { intervention: Intervention },
    /// Evaluation failed; the same turn may be resubmitted.
    Retry,
    /// Too many consecutive failures; the session was abandoned.
    Abandon,
}

/// Outcome of handling one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    pub session_id: SessionId,
    pub turn_index: usize,
    /// Phase the turn was evaluated in.
    pub evaluated_phase: InterviewPhase,
    /// Phase after gating.
    pub phase: InterviewPhase,
    pub complexity: ComplexityLevel,
    pub strategy: ReasoningStrategy,
    /// True when a caller hint replaced the assessed routing.
    pub routing_overridden: bool,
    pub evaluation: Option<EvaluationResult>,
    pub gate: GateDecision,
    pub next_action: NextAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnReport {
    pub fn advanced(&self) -> bool {
        matches!(self.next_action, NextAction::Advance { .. })
    }
}
