pub mod assessment;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod interview;
pub mod log;
pub mod orchestration;
pub mod provider;

pub use error::{Error, Result};
pub use interview::{InterviewPhase, SessionId};
