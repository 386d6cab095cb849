//! Adapter for thermal-hydraulics solvers that take no generated input
//! skeleton — the job directory only ever carries `job_inputs.json` and
//! whatever files the caller seeds it with before enqueueing.
//!
//! Runtime executable is overridable via the `THERMAL_CMD` environment
//! variable (default: `thermal-driver`).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sim_hal::{run_backend, Adapter, WSL_DISTRO_ENV};
use sim_types::{Job, JobResult, SimError, SimResult};

const BACKEND_NAME: &str = "thermal-driver";
const ENV_CMD: &str = "THERMAL_CMD";
const DEFAULT_CMD: &str = "thermal-driver";
const TIMEOUT_SECS: u64 = 3600;

#[derive(Default)]
pub struct ThermalAdapter;

impl ThermalAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Adapter for ThermalAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn create_job(&self, job_id: &str, base_workdir: &Path, inputs: HashMap<String, Value>) -> SimResult<Job> {
        let job_dir = base_workdir.join(job_id);
        std::fs::create_dir_all(&job_dir).map_err(|e| SimError::Execution(format!("failed to create job dir: {e}")))?;

        let text = serde_json::to_string_pretty(&inputs)
            .map_err(|e| SimError::Execution(format!("failed to serialize inputs: {e}")))?;
        std::fs::write(job_dir.join("job_inputs.json"), text)
            .map_err(|e| SimError::Execution(format!("failed to write job inputs: {e}")))?;

        Ok(Job::new(job_id, BACKEND_NAME, job_dir.to_string_lossy().to_string()).with_inputs(inputs))
    }

    async fn run(&self, job: &Job) -> SimResult<JobResult> {
        let job_dir = Path::new(&job.workdir);
        let metrics_file = job_dir.join("metrics.json");
        if metrics_file.exists() {
            return self.parse_results(job);
        }

        let outcome = run_backend(ENV_CMD, DEFAULT_CMD, &["run".to_string()], job_dir, WSL_DISTRO_ENV, TIMEOUT_SECS).await?;

        if !outcome.success {
            return Ok(JobResult::failed(
                &job.job_id,
                format!("{BACKEND_NAME} failed with code {:?}", outcome.exit_code),
            )
            .with_logs(outcome.logs));
        }

        if metrics_file.exists() {
            let parsed = self.parse_results(job)?;
            return Ok(parsed.with_logs(outcome.logs));
        }

        Ok(JobResult::failed(&job.job_id, "completed but metrics.json not found").with_logs(outcome.logs))
    }

    fn parse_results(&self, job: &Job) -> SimResult<JobResult> {
        read_metrics_result(job)
    }
}

fn read_metrics_result(job: &Job) -> SimResult<JobResult> {
    let metrics_file = Path::new(&job.workdir).join("metrics.json");
    if !metrics_file.exists() {
        return Ok(JobResult::failed(&job.job_id, "metrics.json not found"));
    }
    let text = std::fs::read_to_string(&metrics_file)
        .map_err(|e| SimError::Execution(format!("failed to read metrics.json: {e}")))?;
    let data: Value =
        serde_json::from_str(&text).map_err(|e| SimError::Execution(format!("failed to parse metrics.json: {e}")))?;

    let mut metrics = HashMap::new();
    if let Some(obj) = data.get("metrics").and_then(Value::as_object) {
        for (k, v) in obj {
            if let Some(f) = v.as_f64() {
                metrics.insert(k.clone(), f);
            }
        }
    }

    let mut artifacts = HashMap::new();
    artifacts.insert("workdir".to_string(), job.workdir.clone());

    Ok(JobResult::completed(&job.job_id, metrics)
        .with_artifacts(artifacts)
        .with_logs(vec!["Parsed solver metrics.json".to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_job_writes_no_skeleton_file() {
        let dir = tempdir().unwrap();
        let adapter = ThermalAdapter::new();
        let job = adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        let entries: Vec<_> = std::fs::read_dir(&job.workdir).unwrap().collect();
        assert_eq!(entries.len(), 1, "only job_inputs.json should exist");
    }

    #[tokio::test]
    async fn run_parses_existing_metrics_without_invoking_solver() {
        let dir = tempdir().unwrap();
        let adapter = ThermalAdapter::new();
        let job = adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        let wrapped = serde_json::json!({ "metrics": { "outlet_temp": 350.2 } });
        std::fs::write(
            Path::new(&job.workdir).join("metrics.json"),
            serde_json::to_string(&wrapped).unwrap(),
        )
        .unwrap();

        let result = adapter.run(&job).await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metrics["outlet_temp"], 350.2);
    }

    #[test]
    fn parse_results_fails_without_metrics_file() {
        let dir = tempdir().unwrap();
        let adapter = ThermalAdapter::new();
        let job = adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        let result = adapter.parse_results(&job).unwrap();
        assert!(!result.status.is_success());
    }
}
