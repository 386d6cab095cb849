use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }
}

/// A simulation job handed to a backend adapter.
///
/// `workdir` is the adapter-owned job directory (`<base>/<job_id>`), not the
/// orchestrator's base working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub backend: String,
    pub workdir: String,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Job {
    pub fn new(job_id: impl Into<String>, backend: impl Into<String>, workdir: impl Into<String>) -> Self {
        Job {
            job_id: job_id.into(),
            backend: backend.into(),
            workdir: workdir.into(),
            inputs: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of running a [`Job`] through its adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
    #[serde(default)]
    pub artifacts: HashMap<String, String>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobResult {
    pub fn completed(job_id: impl Into<String>, metrics: HashMap<String, f64>) -> Self {
        JobResult {
            job_id: job_id.into(),
            status: JobStatus::Completed,
            metrics,
            artifacts: HashMap::new(),
            logs: Vec::new(),
            error: None,
        }
    }

    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        JobResult {
            job_id: job_id.into(),
            status: JobStatus::Failed,
            metrics: HashMap::new(),
            artifacts: HashMap::new(),
            logs: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_artifacts(mut self, artifacts: HashMap<String, String>) -> Self {
        self.artifacts = artifacts;
        self
    }
}

/// Generates an 8-hex-char job id with a `job-` prefix, mirroring the
/// `uuid4().hex[:8]` scheme the orchestrator was distilled from.
pub fn new_job_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("job-{}", &raw[..8])
}
