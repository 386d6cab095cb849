//! Adapter for finite-volume CFD solvers driven through a generated case
//! script (`run.sh`), with automatic residual/coefficient extraction when
//! the solver doesn't emit `metrics.json` on its own.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sim_hal::{parse_cfd_metrics, run_backend, Adapter, WSL_DISTRO_ENV};
use sim_types::{Job, JobResult, SimResult};

const BACKEND_NAME: &str = "cfd-driver";
const ENV_CMD: &str = "CFD_CMD";
const DEFAULT_CMD: &str = "bash";
const RUN_SCRIPT: &str = "run.sh";
const TIMEOUT_SECS: u64 = 3600;

#[derive(Default)]
pub struct CfdAdapter;

impl CfdAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Adapter for CfdAdapter {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn create_job(&self, job_id: &str, base_workdir: &Path, inputs: HashMap<String, Value>) -> SimResult<Job> {
        let job_dir = base_workdir.join(job_id);
        std::fs::create_dir_all(&job_dir)
            .map_err(|e| sim_types::SimError::Execution(format!("failed to create job dir: {e}")))?;

        write_json(&job_dir.join("job_inputs.json"), &inputs)?;

        let script = job_dir.join(RUN_SCRIPT);
        if !script.exists() {
            std::fs::write(
                &script,
                "#!/bin/bash\nset -e\n# generated case pipeline\n# mesh-gen\n# solve\n# post-process\n",
            )
            .map_err(|e| sim_types::SimError::Execution(format!("failed to write {RUN_SCRIPT}: {e}")))?;
        }

        Ok(Job::new(job_id, BACKEND_NAME, job_dir.to_string_lossy().to_string()).with_inputs(inputs))
    }

    async fn run(&self, job: &Job) -> SimResult<JobResult> {
        let job_dir = Path::new(&job.workdir);
        let metrics_file = job_dir.join("metrics.json");
        if metrics_file.exists() {
            return self.parse_results(job);
        }

        let script = job_dir.join(RUN_SCRIPT);
        if !script.exists() {
            return Ok(JobResult::failed(&job.job_id, format!("{RUN_SCRIPT} not found")));
        }

        let outcome = run_backend(
            ENV_CMD,
            DEFAULT_CMD,
            &[RUN_SCRIPT.to_string()],
            job_dir,
            WSL_DISTRO_ENV,
            TIMEOUT_SECS,
        )
        .await?;

        if !outcome.success {
            return Ok(JobResult::failed(
                &job.job_id,
                format!("{RUN_SCRIPT} failed (exit code {:?})", outcome.exit_code),
            )
            .with_logs(outcome.logs));
        }

        if metrics_file.exists() {
            let parsed = self.parse_results(job)?;
            return Ok(parsed.with_logs(outcome.logs));
        }

        let merged = outcome.logs.join("\n");
        let extracted = parse_cfd_metrics(&merged);
        if !extracted.is_empty() {
            write_metrics(&metrics_file, &extracted)?;
            let mut parsed = self.parse_results(job)?;
            let mut logs = outcome.logs;
            logs.push("Auto-extracted metrics from solver logs".to_string());
            parsed.logs.extend(logs);
            return Ok(parsed);
        }

        Ok(JobResult::failed(&job.job_id, format!("{RUN_SCRIPT} completed but metrics.json not found")).with_logs(outcome.logs))
    }

    fn parse_results(&self, job: &Job) -> SimResult<JobResult> {
        read_metrics_result(job)
    }
}

fn write_json(path: &Path, inputs: &HashMap<String, Value>) -> SimResult<()> {
    let text = serde_json::to_string_pretty(inputs)
        .map_err(|e| sim_types::SimError::Execution(format!("failed to serialize inputs: {e}")))?;
    std::fs::write(path, text).map_err(|e| sim_types::SimError::Execution(format!("failed to write job inputs: {e}")))
}

fn write_metrics(path: &Path, metrics: &HashMap<String, f64>) -> SimResult<()> {
    let wrapped = serde_json::json!({ "metrics": metrics });
    let text = serde_json::to_string_pretty(&wrapped)
        .map_err(|e| sim_types::SimError::Execution(format!("failed to serialize metrics: {e}")))?;
    std::fs::write(path, text).map_err(|e| sim_types::SimError::Execution(format!("failed to write metrics.json: {e}")))
}

fn read_metrics_result(job: &Job) -> SimResult<JobResult> {
    let metrics_file = Path::new(&job.workdir).join("metrics.json");
    if !metrics_file.exists() {
        return Ok(JobResult::failed(&job.job_id, "metrics.json not found"));
    }
    let text = std::fs::read_to_string(&metrics_file)
        .map_err(|e| sim_types::SimError::Execution(format!("failed to read metrics.json: {e}")))?;
    let data: Value = serde_json::from_str(&text)
        .map_err(|e| sim_types::SimError::Execution(format!("failed to parse metrics.json: {e}")))?;

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
