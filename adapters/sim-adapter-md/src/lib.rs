//! Adapter for molecular dynamics backends driven through a generated
//! input deck (`in.simulation`), with automatic thermo extraction when the
//! backend doesn't emit `metrics.json` on its own.
//!
//! Runtime executable is overridable via the `MD_CMD` environment
//! variable (default: `md-driver`).

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sim_hal::{parse_md_metrics, run_backend, Adapter, WSL_DISTRO_ENV};
use sim_types::{Job, JobResult, SimError, SimResult};

const BACKEND_NAME: &str = "md-driver";
const ENV_CMD: &str = "MD_CMD";
const DEFAULT_CMD: &str = "md-driver";
const INPUT_DECK: &str = "in.simulation";
const TIMEOUT_SECS: u64 = 3600;

#[derive(Default)]
pub struct MdAdapter;

impl MdAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Adapter for MdAdapter {
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

        let infile = job_dir.join(INPUT_DECK);
        if !infile.exists() {
            std::fs::write(
                &infile,
                "# generated input deck\nunits metal\natom_style atomic\n# system setup and run commands\n",
            )
            .map_err(|e| SimError::Execution(format!("failed to write {INPUT_DECK}: {e}")))?;
        }

        Ok(Job::new(job_id, BACKEND_NAME, job_dir.to_string_lossy().to_string()).with_inputs(inputs))
    }

    async fn run(&self, job: &Job) -> SimResult<JobResult> {
        let job_dir = Path::new(&job.workdir);
        let metrics_file = job_dir.join("metrics.json");
        if metrics_file.exists() {
            return self.parse_results(job);
        }

        let outcome = run_backend(
            ENV_CMD,
            DEFAULT_CMD,
            &["-in".to_string(), INPUT_DECK.to_string()],
            job_dir,
            WSL_DISTRO_ENV,
            TIMEOUT_SECS,
        )
        .await?;

        if !outcome.success {
            return Ok(JobResult::failed(
                &job.job_id,
                format!("md solver failed (exit code {:?})", outcome.exit_code),
            )
            .with_logs(outcome.logs));
        }

        if metrics_file.exists() {
            let parsed = self.parse_results(job)?;
            return Ok(parsed.with_logs(outcome.logs));
        }

        let merged = outcome.logs.join("\n");
        let extracted = parse_md_metrics(&merged);
        if !extracted.is_empty() {
            let wrapped = serde_json::json!({ "metrics": extracted });
            let text = serde_json::to_string_pretty(&wrapped)
                .map_err(|e| SimError::Execution(format!("failed to serialize metrics: {e}")))?;
            std::fs::write(&metrics_file, text).map_err(|e| SimError::Execution(format!("failed to write metrics.json: {e}")))?;

            let mut parsed = self.parse_results(job)?;
            let mut logs = outcome.logs;
            logs.push("Auto-extracted metrics from solver logs".to_string());
            parsed.logs.extend(logs);
            return Ok(parsed);
        }

        Ok(JobResult::failed(&job.job_id, "md solver completed but metrics.json not found").with_logs(outcome.logs))
    }

    fn parse_results(&self, job: &Job) -> SimResult<JobResult> {
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
}
