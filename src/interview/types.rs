//! Core interview type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::{ComplexityLevel, ReasoningStrategy};

/// Identifier of an interview session.
///
/// Session ids arrive from callers as opaque strings, so this wraps a
/// `String` rather than a UUID. `SessionId::new()` mints a UUID v4 for
/// sessions created locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new unique session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phases of an interview.
///
/// 1. Setup - Session created, no question asked yet
/// 2. Scoping - Candidate frames the problem
/// 3. Analysis - Candidate works through users, constraints and design
/// 4. Synthesis - Candidate summarizes and prioritizes
/// 5. Complete - Report requested
///
/// Abandoned is reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    Setup,
    Scoping,
    Analysis,
    Synthesis,
    Complete,
    Abandoned,
}

impl InterviewPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewPhase::Complete | InterviewPhase::Abandoned)
    }

    /// Whether turns received in this phase are evaluated.
    pub fn accepts_turns(&self) -> bool {
        matches!(
            self,
            InterviewPhase::Scoping | InterviewPhase::Analysis | InterviewPhase::Synthesis
        )
    }

    /// The phase a passing gate advances to.
    pub fn next(&self) -> Option<InterviewPhase> {
        match self {
            InterviewPhase::Setup => Some(InterviewPhase::Scoping),
            InterviewPhase::Scoping => Some(InterviewPhase::Analysis),
            InterviewPhase::Analysis => Some(InterviewPhase::Synthesis),
            InterviewPhase::Synthesis => Some(InterviewPhase::Complete),
            InterviewPhase::Complete | InterviewPhase::Abandoned => None,
        }
    }
}

impl std::fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterviewPhase::Setup => write!(f, "setup"),
            InterviewPhase::Scoping => write!(f, "scoping"),
            InterviewPhase::Analysis => write!(f, "analysis"),
            InterviewPhase::Synthesis => write!(f, "synthesis"),
            InterviewPhase::Complete => write!(f, "complete"),
            InterviewPhase::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl std::str::FromStr for InterviewPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "setup" | "configuring" => Ok(InterviewPhase::Setup),
            "scoping" => Ok(InterviewPhase::Scoping),
            "analysis" => Ok(InterviewPhase::Analysis),
            "synthesis" => Ok(InterviewPhase::Synthesis),
            "complete" | "end" => Ok(InterviewPhase::Complete),
            "abandoned" => Ok(InterviewPhase::Abandoned),
            other => Err(format!("unknown interview phase: {other}")),
        }
    }
}

/// One candidate response. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: SessionId,
    /// Phase the session was in when the response arrived.
    pub phase: InterviewPhase,
    pub response: String,
    pub received_at: DateTime<Utc>,
    /// How long the candidate took to answer, if the caller measured it.
    pub response_time_ms: Option<u64>,
}

impl Turn {
    pub fn new(session_id: SessionId, phase: InterviewPhase, response: impl Into<String>) -> Self {
        Self {
            session_id,
            phase,
            response: response.into(),
            received_at: Utc::now(),
            response_time_ms: None,
        }
    }

    pub fn with_response_time(mut self, response_time_ms: u64) -> Self {
        self.response_time_ms = Some(response_time_ms);
        self
    }

    /// Whitespace-delimited word count of the response.
    pub fn word_count(&self) -> usize {
        self.response.split_whitespace().count()
    }
}

/// Complexity and strategy chosen for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingRecord {
    /// Index of the turn in the session history.
    pub turn_index: usize,
    /// Level the assessor produced, before any caller hint.
    pub assessed: ComplexityLevel,
    /// Level the turn was routed with.
    pub complexity: ComplexityLevel,
    pub strategy: ReasoningStrategy,
    /// True when a caller hint replaced the assessed routing.
    pub overridden: bool,
}
