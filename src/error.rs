use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Reasoning provider failed scoring {competency}: {source}")]
    Provider {
        competency: String,
        #[source]
        source: ProviderError,
    },

    #[error("Evaluation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Evaluation computation panicked for fingerprint {0}")]
    ComputationPanicked(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already exists: {0}")]
    SessionExists(String),

    #[error("Session {0} has not been started")]
    SessionNotStarted(String),

    #[error("Session {id} is closed ({phase})")]
    SessionClosed { id: String, phase: String },

    #[error("Interview service is shutting down")]
    ShuttingDown,
}

impl Error {
    /// Whether a later attempt at the same turn may succeed.
    ///
    /// Provider failures, timeouts, and panicked computations leave the
    /// cache entry empty, so the fingerprint can be computed again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Provider { .. }
                | Error::Timeout(_)
                | Error::ComputationPanicked(_)
                | Error::TaskJoin(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
