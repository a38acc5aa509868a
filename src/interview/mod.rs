//! Interview sessions, phases and turns.

mod state;
mod types;

pub use state::{InterviewSession, PhaseHistoryEntry, TransitionTrigger};
pub use types::{InterviewPhase, RoutingRecord, SessionId, Turn};
