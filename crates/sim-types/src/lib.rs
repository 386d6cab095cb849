//! Shared data model and error taxonomy for the cognitive simulation
//! orchestrator.
//!
//! Every other crate in the workspace (`sim-store`, `sim-hal`,
//! `sim-planner`, `sim-worker`, `sim-service`, and the backend adapter
//! crates) depends on this one for its domain types, so it has no
//! dependency on any of them.

mod error;
mod experiment;
mod job;
mod queue;

pub use error::{SimError, SimResult};
pub use experiment::{
    ConstraintKind, ConstraintSpec, DesignSpace, ExperimentSpec, GoalDirection, ObjectiveSpec,
    RunResult, RunStatus,
};
pub use job::{new_job_id, Job, JobResult, JobStatus};
pub use queue::{JobSummary, QueueRecord, QueueState};
