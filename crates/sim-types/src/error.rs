use thiserror::Error;

/// Error taxonomy shared by every crate in the orchestrator.
///
/// Store-level failures (a bad SQLite connection, a malformed JSON payload)
/// are folded into [`SimError::Internal`] at the crate boundary that owns
/// them; callers above the store never need to know it was SQLite.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SimError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        SimError::NotFound { kind, id: id.into() }
    }
}

pub type SimResult<T> = Result<T, SimError>;
