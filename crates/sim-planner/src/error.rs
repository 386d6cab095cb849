use sim_types::SimError;
use thiserror::Error;

/// Failures internal to experiment memory, before they are folded into the
/// crate-wide [`SimError`] at the planner boundary.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("memory I/O error: {0}")]
    Io(String),

    #[error("malformed run-result record: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for PlannerError {
    fn from(e: std::io::Error) -> Self {
        PlannerError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(e: serde_json::Error) -> Self {
        PlannerError::Malformed(e.to_string())
    }
}

impl From<PlannerError> for SimError {
    fn from(e: PlannerError) -> Self {
        SimError::Internal(e.to_string())
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
