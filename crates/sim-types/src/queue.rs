use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Lifecycle state of a job's queue record.
///
/// Transitions are driven entirely by the store (`sim-store`) and the
/// worker loop (`sim-worker`); this enum only names the states and answers
/// the cheap "is it done" questions callers need without re-deriving them
/// from a string everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Queued,
    Running,
    Completed,
    Failed,
    Dead,
    Cancelled,
}

impl QueueState {
    pub fn name(&self) -> &'static str {
        match self {
            QueueState::Queued => "queued",
            QueueState::Running => "running",
            QueueState::Completed => "completed",
            QueueState::Failed => "failed",
            QueueState::Dead => "dead",
            QueueState::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "queued" => QueueState::Queued,
            "running" => QueueState::Running,
            "completed" => QueueState::Completed,
            "failed" => QueueState::Failed,
            "dead" => QueueState::Dead,
            "cancelled" => QueueState::Cancelled,
            _ => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueState::Completed | QueueState::Failed | QueueState::Dead | QueueState::Cancelled
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, QueueState::Running)
    }
}

impl std::str::FromStr for QueueState {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueState::parse(s).ok_or_else(|| SimError::Validation(format!("unknown queue state: {s}")))
    }
}

/// Snapshot of a job's position in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub job_id: String,
    pub state: QueueState,
    pub error: Option<String>,
    pub attempt_count: i64,
    pub max_attempts: i64,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl QueueRecord {
    pub fn should_retry(&self) -> bool {
        self.attempt_count < self.max_attempts
    }
}

/// A row from the job listing join (job + latest result status), matching
/// the distilled spec's `list_jobs` projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub backend: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub updated_at: Option<DateTime<Utc>>,
}
