use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sim_types::{Job, JobResult, SimResult};

/// Unified contract every backend adapter implements.
///
/// Adapters own the on-disk job directory (`create_job`) and the
/// subprocess/log-parsing lifecycle (`run`/`parse_results`); the worker
/// loop and service facade only ever see [`Job`]/[`JobResult`] and never
/// the executable name, skeleton file layout, or log format a backend uses.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Materializes the job directory under `base_workdir/<job_id>` and
    /// writes whatever skeleton input files the backend expects.
    fn create_job(&self, job_id: &str, base_workdir: &Path, inputs: HashMap<String, Value>) -> SimResult<Job>;

    /// Runs the job to completion (or failure), auto-extracting metrics
    /// from captured logs when the backend doesn't produce `metrics.json`
    /// on its own.
    async fn run(&self, job: &Job) -> SimResult<JobResult>;

    /// Re-reads `metrics.json` from the job directory without re-running
    /// anything; used both as the `run` fast path and by callers that only
    /// want to observe a prior run's result.
    fn parse_results(&self, job: &Job) -> SimResult<JobResult>;
}
