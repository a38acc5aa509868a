//! Orchestration layer for adaptive interview evaluation.
//!
//! This module drives interview sessions: it routes every turn through
//! complexity assessment, strategy selection and cached evaluation, gates
//! phase transitions on the result, and issues directives to the
//! Interviewer, Synthesis and Coaching collaborators.

mod directive;
mod gating;
mod orchestrator;
mod persistence;
mod request;
mod service;

pub use directive::{
    Collaborator, DirectiveCommand, DirectiveSender, Intervention, PhaseDirective,
    SILENCE_WORD_THRESHOLD,
};
pub use gating::{GateDecision, GatePolicy, Shortfall};
pub use orchestrator::{Orchestrator, OrchestratorContext, SessionCommand, SessionMetrics};
pub use persistence::{spawn_store, EvaluationStore, JsonlStore, MemoryStore, NullStore};
pub use request::{EvaluationRequest, NextAction, TurnReport};
pub use service::InterviewService;
