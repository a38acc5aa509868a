//! Directives issued to downstream collaborators.
//!
//! Directives are one-way commands. The orchestrator emits them on a
//! channel and never waits for an answer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::assessment::Competency;
use crate::interview::{InterviewPhase, SessionId};

/// Responses shorter than this many words are treated as silence.
pub const SILENCE_WORD_THRESHOLD: usize = 5;

/// The collaborator a directive is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Interviewer,
    Synthesis,
    Coaching,
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collaborator::Interviewer => write!(f, "interviewer"),
            Collaborator::Synthesis => write!(f, "synthesis"),
            Collaborator::Coaching => write!(f, "coaching"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveCommand {
    /// Open the interview with a scoping question.
    AskScopingQuestion,
    /// Announce the phase that was just entered.
    PhaseTransition,
    /// Ask a probing follow-up instead of advancing.
    ProbeFollowUp,
    GenerateReport,
    GenerateCoachingPlan,
    SessionAbandoned,
}

impl DirectiveCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveCommand::AskScopingQuestion => "ask_scoping_question",
            DirectiveCommand::PhaseTransition => "phase_transition",
            DirectiveCommand::ProbeFollowUp => "probe_follow_up",
            DirectiveCommand::GenerateReport => "generate_report",
            DirectiveCommand::GenerateCoachingPlan => "generate_coaching_plan",
            DirectiveCommand::SessionAbandoned => "session_abandoned",
        }
    }
}

impl std::fmt::Display for DirectiveCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of probing follow-up requested from the Interviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    PreventPrematureSolutioning,
    EnsureUserFocus,
    DemandPrioritizationRationale,
    HandleSilenceOrConfusion,
}

impl Intervention {
    /// Pick the intervention for a response that did not clear the gate.
    pub fn for_turn(phase: InterviewPhase, word_count: usize) -> Self {
        if word_count < SILENCE_WORD_THRESHOLD {
            return Intervention::HandleSilenceOrConfusion;
        }
        match phase {
            InterviewPhase::Analysis => Intervention::EnsureUserFocus,
            InterviewPhase::Synthesis => Intervention::DemandPrioritizationRationale,
            _ => Intervention::PreventPrematureSolutioning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intervention::PreventPrematureSolutioning => "prevent_premature_solutioning",
            Intervention::EnsureUserFocus => "ensure_user_focus",
            Intervention::DemandPrioritizationRationale => "demand_prioritization_rationale",
            Intervention::HandleSilenceOrConfusion => "handle_silence_or_confusion",
        }
    }

    /// Prompt the Interviewer asks the candidate.
    pub fn message(&self) -> &'static str {
        match self {
            Intervention::PreventPrematureSolutioning => {
                "That's an interesting idea. Before we dive into solutions, could you first \
                 walk me through how you're structuring your overall approach to this problem?"
            }
            Intervention::EnsureUserFocus => {
                "This is a good start. Could you tell me more about the specific users or \
                 customers you are designing this for?"
            }
            Intervention::DemandPrioritizationRationale => {
                "That sounds like a viable solution. Can you walk me through why you chose this \
                 particular solution over other alternatives you may have considered?"
            }
            Intervention::HandleSilenceOrConfusion => {
                "Take your time. Sometimes it helps to start with what you know for certain and \
                 build from there. What aspect of this problem feels most clear to you right now?"
            }
        }
    }
}

impl std::fmt::Display for Intervention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A command for one collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDirective {
    pub session_id: SessionId,
    pub target: Collaborator,
    pub command: DirectiveCommand,
    pub params: BTreeMap<String, String>,
}

impl PhaseDirective {
    pub fn new(session_id: SessionId, target: Collaborator, command: DirectiveCommand) -> Self {
        Self {
            session_id,
            target,
            command,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Probing follow-up for a turn that did not clear the gate.
    pub fn probe(
        session_id: SessionId,
        phase: InterviewPhase,
        intervention: Intervention,
        focus: Option<Competency>,
    ) -> Self {
        let directive = Self::new(session_id, Collaborator::Interviewer, DirectiveCommand::ProbeFollowUp)
            .with_param("phase", phase)
            .with_param("intervention", intervention)
            .with_param("message", intervention.message());
        match focus {
            Some(competency) => directive.with_param("focus", competency.name()),
            None => directive,
        }
    }

    /// Directives issued when a session enters `phase`.
    pub fn on_entry(session_id: &SessionId, phase: InterviewPhase) -> Vec<Self> {
        let to = |target, command| Self::new(session_id.clone(), target, command);
        match phase {
            InterviewPhase::Setup => Vec::new(),
            InterviewPhase::Scoping => vec![to(
                Collaborator::Interviewer,
                DirectiveCommand::AskScopingQuestion,
            )],
            InterviewPhase::Analysis | InterviewPhase::Synthesis => vec![to(
                Collaborator::Interviewer,
                DirectiveCommand::PhaseTransition,
            )
            .with_param("new_phase", phase)],
            InterviewPhase::Complete => vec![
                to(Collaborator::Synthesis, DirectiveCommand::GenerateReport),
                to(Collaborator::Coaching, DirectiveCommand::GenerateCoachingPlan),
            ],
            InterviewPhase::Abandoned => vec![to(
                Collaborator::Interviewer,
                DirectiveCommand::SessionAbandoned,
            )],
        }
    }
}

/// Sending half of the directive channel.
///
/// A closed channel is not an error: collaborators are optional listeners.
#[derive(Debug, Clone)]
pub struct DirectiveSender {
    tx: mpsc::UnboundedSender<PhaseDirective>,
}

impl DirectiveSender {
    pub fn new(tx: mpsc::UnboundedSender<PhaseDirective>) -> Self {
        Self { tx }
    }

    /// Create a sender and the receiver collaborators listen on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PhaseDirective>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, directive: PhaseDirective) {
        debug!(
            session = %directive.session_id,
            target = %directive.target,
            command = %directive.command,
            "directive"
        );
        if self.tx.send(directive).is_err() {
            debug!("directive receiver dropped");
        }
    }
}
