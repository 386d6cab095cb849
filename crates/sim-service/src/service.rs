use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use sim_hal::AdapterRegistry;
use sim_planner::{ExperimentEngine, GridPlanner, PenaltyMode, SequentialPlanner, SurrogatePlanner};
use sim_planner::{AcquisitionKind, ExperimentMemory};
use sim_store::StateStore;
use sim_types::{
    ConstraintSpec, DesignSpace, Job, JobResult, ObjectiveSpec, QueueRecord, QueueState, RunResult, SimError,
    SimResult,
};
use sim_worker::WorkerLoop;

use crate::config::ServiceConfig;
use crate::views::{BackendHealth, JobView, PurgeReport, ServiceSummary};

/// Seed the model-based and sequential planners fall back to when the
/// caller doesn't thread one through, matching `ModelBasedPlanner`'s and
/// `OptunaTPEPlanner`'s own `seed: int = 7` constructor default.
const DEFAULT_PLANNER_SEED: u64 = 7;

/// Composes the durable store, the adapter registry, and the worker loop
/// into the single API a transport layer (HTTP, CLI, ...) would call.
///
/// Construction wires in every known backend adapter; callers never see
/// `sim_hal::Adapter` or `sim_store::StateStore` directly.
pub struct SimulationService {
    store: Arc<dyn StateStore>,
    registry: Arc<AdapterRegistry>,
    worker: WorkerLoop,
    config: ServiceConfig,
}

impl SimulationService {
    pub fn new(store: Arc<dyn StateStore>, config: ServiceConfig) -> Self {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(sim_adapter_cfd::CfdAdapter::new()));
        registry.register(Arc::new(sim_adapter_md::MdAdapter::new()));
        registry.register(Arc::new(sim_adapter_aero::AeroAdapter::new()));
        registry.register(Arc::new(sim_adapter_thermal::ThermalAdapter::new()));
        registry.register(Arc::new(sim_adapter_dft::DftAdapter::new()));
        let registry = Arc::new(registry);

        let worker = WorkerLoop::new(store.clone(), registry.clone());
        SimulationService { store, registry, worker, config }
    }

    fn base_workdir(&self) -> &std::path::Path {
        &self.config.base_workdir
    }

    pub async fn create_job(&self, backend: &str, inputs: HashMap<String, Value>) -> SimResult<Job> {
        let adapter = self.registry.get(backend)?;
        let job_id = sim_types::new_job_id();
        tokio::fs::create_dir_all(self.base_workdir())
            .await
            .map_err(|e| SimError::Internal(format!("failed to create base workdir: {e}")))?;
        let job = adapter.create_job(&job_id, self.base_workdir(), inputs)?;
        self.store.upsert_job(&job).await?;
        tracing::info!(job_id = %job.job_id, backend, "job created");
        Ok(job)
    }

    pub async fn run_job(&self, job_id: &str) -> SimResult<JobResult> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| SimError::not_found("job", job_id))?;
        let adapter = self.registry.get(&job.backend)?;
        let result = adapter.run(&job).await?;
        self.store.upsert_result(&result).await?;
        Ok(result)
    }

    pub async fn get_job(&self, job_id: &str) -> SimResult<JobView> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| SimError::not_found("job", job_id))?;
        let result = self.store.get_result(job_id).await?;
        let queue = self.store.queue_state(job_id).await?;
        Ok(JobView { job, result, queue })
    }

    pub async fn enqueue_job(&self, job_id: &str, max_attempts: Option<i64>) -> SimResult<QueueRecord> {
        if self.store.get_job(job_id).await?.is_none() {
            return Err(SimError::not_found("job", job_id));
        }
        let max_attempts = max_attempts.unwrap_or(self.config.default_max_attempts);
        self.store.enqueue(job_id, max_attempts).await?;
        self.queue_status(job_id).await
    }

    pub async fn run_next_queued(&self) -> SimResult<sim_worker::QueueStepOutcome> {
        self.worker.run_next_queued().await
    }

    pub async fn queue_status(&self, job_id: &str) -> SimResult<QueueRecord> {
        self.store
            .queue_state(job_id)
            .await?
            .ok_or_else(|| SimError::not_found("queue record", job_id))
    }

    pub async fn cancel_job(&self, job_id: &str, reason: Option<String>) -> SimResult<QueueRecord> {
        let state = self.queue_status(job_id).await?;
        if state.state.is_running() {
            return Err(SimError::StateConflict(
                "cannot cancel a currently running job without cooperative cancellation".to_string(),
            ));
        }
        self.store.cancel(job_id, reason.or_else(|| Some("cancelled by user".to_string()))).await?;
        tracing::info!(job_id, "job cancelled");
        self.queue_status(job_id).await
    }

    pub async fn replay_dead_job(&self, job_id: &str, max_attempts: Option<i64>) -> SimResult<QueueRecord> {
        let state = self.queue_status(job_id).await?;
        if state.state != QueueState::Dead {
            return Err(SimError::StateConflict("only dead jobs can be replayed".to_string()));
        }
        let max_attempts = max_attempts.unwrap_or(self.config.default_max_attempts);
        self.store.replay_dead(job_id, max_attempts).await?;
        tracing::info!(job_id, max_attempts, "dead job replayed");
        self.queue_status(job_id).await
    }

    pub async fn purge_finished(&self, keep_latest: Option<i64>) -> SimResult<PurgeReport> {
        let keep_latest = keep_latest.unwrap_or(self.config.default_purge_keep_latest);
        let deleted = self.store.purge_finished(keep_latest).await?;
        tracing::info!(deleted, keep_latest, "purged finished job records");
        Ok(PurgeReport { deleted, kept_latest: keep_latest })
    }

    pub async fn list_jobs(&self, limit: i64) -> SimResult<Vec<sim_types::JobSummary>> {
        self.store.list_jobs(limit).await
    }

    pub async fn summary(&self) -> SimResult<ServiceSummary> {
        let store_summary = self.store.summary().await?;
        Ok(ServiceSummary::new(store_summary, self.backend_health().await))
    }

    /// Proposes experiments against a placeholder quadratic-bowl simulator
    /// over `x`/`y`, the same stand-in the distilled service API used before
    /// a domain-specific engine is plugged in by the caller.
    #[allow(clippy::too_many_arguments)]
    pub async fn suggest_experiments(
        &self,
        domain: &str,
        planner_name: &str,
        design_space: DesignSpace,
        objectives: Vec<ObjectiveSpec>,
        constraints: Vec<ConstraintSpec>,
        n: usize,
    ) -> SimResult<Vec<RunResult>> {
        let memory_path: PathBuf = self.base_workdir().join(format!("{domain}_service_memory.jsonl"));
        let memory = ExperimentMemory::new(memory_path);
        // Matches the constructor default (`seed: int = 7`) the original
        // service.py leaves unspecified when it builds these planners.
        let seed = DEFAULT_PLANNER_SEED;

        let engine = match planner_name {
            "baseline" => ExperimentEngine::new(domain, Box::new(GridPlanner::new()), memory, Box::new(placeholder_simulator)),
            "model_based" => ExperimentEngine::new(
                domain,
                Box::new(SurrogatePlanner::new(seed, AcquisitionKind::Ei)),
                memory,
                Box::new(placeholder_simulator),
            ),
            "optuna_tpe" => ExperimentEngine::new(
                domain,
                Box::new(SequentialPlanner::new(seed)),
                memory,
                Box::new(placeholder_simulator),
            ),
            other => return Err(SimError::Validation(format!("unsupported planner: {other}"))),
        };

        engine.run_iteration(&design_space, &objectives, &constraints, n, PenaltyMode::Discard, 1e6)
    }

    pub async fn backend_health(&self) -> HashMap<String, BackendHealth> {
        let cfd_cmd = std::env::var("CFD_CMD").unwrap_or_else(|_| "bash".to_string());
        let md_cmd = std::env::var("MD_CMD").unwrap_or_else(|_| "md-driver".to_string());
        let aero_cmd = std::env::var("AERO_CMD").unwrap_or_else(|_| "aero-driver".to_string());
        let thermal_cmd = std::env::var("THERMAL_CMD").unwrap_or_else(|_| "thermal-driver".to_string());
        let dft_cmd = std::env::var("DFT_CMD").unwrap_or_else(|_| "dft-driver".to_string());
        let has_wsl = which::which("wsl").is_ok();

        HashMap::from([
            (
                "cfd-driver".to_string(),
                BackendHealth {
                    available: which::which(&cfd_cmd).is_ok() || which::which("sh").is_ok() || has_wsl,
                    cmd: cfd_cmd,
                },
            ),
            (
                "md-driver".to_string(),
                BackendHealth { available: which::which(&md_cmd).is_ok() || has_wsl, cmd: md_cmd },
            ),
            (
                "aero-driver".to_string(),
                BackendHealth { available: which::which(&aero_cmd).is_ok(), cmd: aero_cmd },
            ),
            (
                "thermal-driver".to_string(),
                BackendHealth { available: which::which(&thermal_cmd).is_ok(), cmd: thermal_cmd },
            ),
            (
                "dft-driver".to_string(),
                BackendHealth { available: which::which(&dft_cmd).is_ok() || has_wsl, cmd: dft_cmd },
            ),
        ])
    }
}

fn placeholder_simulator(params: &HashMap<String, f64>) -> HashMap<String, f64> {
    let x = params.get("x").copied().unwrap_or(0.0);
    let y = params.get("y").copied().unwrap_or(0.0);
    HashMap::from([
        ("yield".to_string(), (100.0 - (x - 3.0).powi(2) - (y - 2.0).powi(2)).max(0.0)),
        ("energy".to_string(), x * x + 0.5 * y * y),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_store::SqliteStore;
    use sim_types::GoalDirection;

    fn config(dir: &std::path::Path) -> ServiceConfig {
        ServiceConfig {
            base_workdir: dir.to_path_buf(),
            wsl_distro: "Ubuntu".to_string(),
            default_max_attempts: 3,
            default_purge_keep_latest: 200,
        }
    }

    async fn service(dir: &std::path::Path) -> SimulationService {
        let store: Arc<dyn StateStore> = Arc::new(SqliteStore::in_memory().unwrap());
        SimulationService::new(store, config(dir))
    }

    #[tokio::test]
    async fn create_job_persists_and_is_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let job = svc.create_job("cfd-driver", HashMap::new()).await.unwrap();

        let view = svc.get_job(&job.job_id).await.unwrap();
        assert_eq!(view.job.job_id, job.job_id);
        assert!(view.result.is_none());
        assert!(view.queue.is_none());
    }

    #[tokio::test]
    async fn unsupported_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let err = svc.create_job("not-a-backend", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[tokio::test]
    async fn enqueue_and_run_next_queued_completes_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let job = svc.create_job("thermal-driver", HashMap::new()).await.unwrap();
        // thermal-driver has no existing metrics.json, so running it fails;
        // exercise the queue mechanics rather than a real solver run.
        svc.enqueue_job(&job.job_id, Some(1)).await.unwrap();

        let outcome = svc.run_next_queued().await.unwrap();
        assert!(matches!(outcome, sim_worker::QueueStepOutcome::Dead { .. }));
    }

    #[tokio::test]
    async fn cancel_rejects_running_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let job = svc.create_job("cfd-driver", HashMap::new()).await.unwrap();
        svc.enqueue_job(&job.job_id, Some(1)).await.unwrap();
        svc.store.start_job(&job.job_id).await.unwrap();

        let err = svc.cancel_job(&job.job_id, None).await.unwrap_err();
        assert!(matches!(err, SimError::StateConflict(_)));
    }

    #[tokio::test]
    async fn replay_dead_job_requires_dead_state() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let job = svc.create_job("cfd-driver", HashMap::new()).await.unwrap();
        svc.enqueue_job(&job.job_id, Some(1)).await.unwrap();

        let err = svc.replay_dead_job(&job.job_id, None).await.unwrap_err();
        assert!(matches!(err, SimError::StateConflict(_)));
    }

    #[tokio::test]
    async fn suggest_experiments_appends_to_domain_memory() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let design_space = DesignSpace { bounds: HashMap::from([("x".to_string(), (0.0, 4.0)), ("y".to_string(), (0.0, 4.0))]) };
        let objectives = vec![
            ObjectiveSpec { name: "yield".to_string(), direction: GoalDirection::Maximize, weight: 1.0 },
            ObjectiveSpec { name: "energy".to_string(), direction: GoalDirection::Minimize, weight: 1.0 },
        ];

        let runs = svc.suggest_experiments("thermo", "baseline", design_space, objectives, vec![], 2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(dir.path().join("thermo_service_memory.jsonl").exists());
    }

    #[tokio::test]
    async fn unsupported_planner_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        let design_space = DesignSpace { bounds: HashMap::new() };
        let err = svc
            .suggest_experiments("thermo", "not-a-planner", design_space, vec![], vec![], 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Validation(_)));
    }

    #[tokio::test]
    async fn summary_reports_store_counts_and_backend_health() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;
        svc.create_job("cfd-driver", HashMap::new()).await.unwrap();

        let summary = svc.summary().await.unwrap();
        assert_eq!(summary.total_jobs, 1);
        assert_eq!(summary.backend_health.len(), 5);
    }
}
