use sim_types::JobResult;

/// Outcome of one `run_next_queued` step, mirroring the distilled spec's
/// `{status: ...}` worker-step payload.
#[derive(Debug, Clone)]
pub enum QueueStepOutcome {
    /// No queued job was available to claim.
    Idle,
    /// A job ran to completion.
    Processed { job_id: String, result: JobResult },
    /// A job failed but had attempt budget left, so it went back to `queued`.
    Requeued { job_id: String, error: String },
    /// A job failed and exhausted its attempt budget, so it was dead-lettered.
    Dead { job_id: String, error: String },
}

impl QueueStepOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            QueueStepOutcome::Idle => "idle",
            QueueStepOutcome::Processed { .. } => "processed",
            QueueStepOutcome::Requeued { .. } => "requeued",
            QueueStepOutcome::Dead { .. } => "dead",
        }
    }
}
