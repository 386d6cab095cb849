//! Adapter for compressible-flow aerodynamics solvers driven through a
//! generated configuration file (`config.cfg`).
//!
//! Runtime executable is overridable via the `AERO_CMD` environment
//! variable (default: `aero-driver`). This is a thin variant: unlike the
//! CFD/MD adapters it has no bespoke log parser, so a successful run that
//! doesn't produce `metrics.json` itself is reported as failed.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sim_hal::{run_backend, Adapter, WSL_DISTRO_ENV};
use sim_types::{Job, JobResult, SimError, SimResult};

const BACKEND_NAME: &str = "aero-driver";
const ENV_CMD: &str = "AERO_CMD";
const DEFAULT_CMD: &str = "aero-driver";
const CONFIG_FILE: &str = "config.cfg";
const TIMEOUT_SECS: u64 = 3600;

#[derive(Default)]
pub struct AeroAdapter;

impl AeroAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Adapter for AeroAdapter {
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

        let cfg = job_dir.join(CONFIG_FILE);
        if !cfg.exists() {
            std::fs::write(&cfg, "% generated config\nSOLVER= RANS\n")
                .map_err(|e| SimError::Execution(format!("failed to write {CONFIG_FILE}: {e}")))?;
        }

        Ok(Job::new(job_id, BACKEND_NAME, job_dir.to_string_lossy().to_string()).with_inputs(inputs))
    }

    async fn run(&self, job: &Job) -> SimResult<JobResult> {
        let job_dir = Path::new(&job.workdir);
        let metrics_file = job_dir.join("metrics.json");
        if metrics_file.exists() {
            return self.parse_results(job);
        }

        let config = job_dir.join(CONFIG_FILE);
        if !config.exists() {
            return Ok(JobResult::failed(&job.job_id, format!("{CONFIG_FILE} not found")));
        }

        let outcome = run_backend(
            ENV_CMD,
            DEFAULT_CMD,
            &[CONFIG_FILE.to_string()],
            job_dir,
            WSL_DISTRO_ENV,
            TIMEOUT_SECS,
        )
        .await?;

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
    fn create_job_writes_skeleton_config() {
        let dir = tempdir().unwrap();
        let adapter = AeroAdapter::new();
        let job = adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        assert!(Path::new(&job.workdir).join(CONFIG_FILE).exists());
    }

    #[test]
    fn create_job_is_idempotent() {
        let dir = tempdir().unwrap();
        let adapter = AeroAdapter::new();
        adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        let cfg_path = dir.path().join("job-1").join(CONFIG_FILE);
        std::fs::write(&cfg_path, "custom").unwrap();
        adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&cfg_path).unwrap(), "custom");
    }

    #[tokio::test]
    async fn run_parses_existing_metrics_without_invoking_solver() {
        let dir = tempdir().unwrap();
        let adapter = AeroAdapter::new();
        let job = adapter.create_job("job-1", dir.path(), HashMap::new()).unwrap();
        let wrapped = serde_json::json!({ "metrics": { "Cl_last": 0.3 } });
        std::fs::write(
            Path::new(&job.workdir).join("metrics.json"),
            serde_json::to_string(&wrapped).unwrap(),
        )
        .unwrap();

        let result = adapter.run(&job).await.unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.metrics["Cl_last"], 0.3);
    }
}
