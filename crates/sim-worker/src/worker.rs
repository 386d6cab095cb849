use std::sync::Arc;
use std::time::Duration;

use sim_hal::AdapterRegistry;
use sim_store::StateStore;
use sim_types::{QueueState, SimError, SimResult};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::step::QueueStepOutcome;

/// Drives the durable queue: claims one job at a time, runs it through its
/// adapter, and applies the retry/dead-letter policy the store already
/// tracks via `attempt_count`/`max_attempts`.
pub struct WorkerLoop {
    store: Arc<dyn StateStore>,
    registry: Arc<AdapterRegistry>,
}

impl WorkerLoop {
    pub fn new(store: Arc<dyn StateStore>, registry: Arc<AdapterRegistry>) -> Self {
        WorkerLoop { store, registry }
    }

    /// Claims and runs at most one queued job. Returns `Idle` when the
    /// queue is empty, so callers can poll this in a loop without special
    /// casing the empty case.
    pub async fn run_next_queued(&self) -> SimResult<QueueStepOutcome> {
        let Some(job_id) = self.store.claim_next_queued().await? else {
            return Ok(QueueStepOutcome::Idle);
        };

        let job = self
            .store
            .get_job(&job_id)
            .await?
            .ok_or_else(|| SimError::Internal(format!("claimed job {job_id} has no job record")))?;

        let adapter = match self.registry.get(&job.backend) {
            Ok(adapter) => adapter,
            Err(e) => return self.retry_or_dead(&job_id, e.to_string()).await,
        };

        match adapter.run(&job).await {
            Ok(result) if result.status.is_success() => {
                self.store.upsert_result(&result).await?;
                self.store.finish_job(&job_id, QueueState::Completed, None).await?;
                Ok(QueueStepOutcome::Processed { job_id, result })
            }
            Ok(result) => {
                let error = result.error.clone().unwrap_or_else(|| "job failed".to_string());
                self.store.upsert_result(&result).await?;
                self.retry_or_dead(&job_id, error).await
            }
            Err(e) => self.retry_or_dead(&job_id, e.to_string()).await,
        }
    }

    /// Requeues the job if it still has attempt budget, otherwise dead-letters it.
    async fn retry_or_dead(&self, job_id: &str, error: String) -> SimResult<QueueStepOutcome> {
        if self.store.should_retry(job_id).await? {
            self.store.requeue_for_retry(job_id, Some(error.clone())).await?;
            Ok(QueueStepOutcome::Requeued { job_id: job_id.to_string(), error })
        } else {
            self.store.finish_job(job_id, QueueState::Dead, Some(error.clone())).await?;
            Ok(QueueStepOutcome::Dead { job_id: job_id.to_string(), error })
        }
    }

    /// Spawns a background task that calls `run_next_queued` on every tick
    /// of `poll_interval` until `shutdown` is cancelled.
    pub fn run_forever(self: Arc<Self>, poll_interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("worker loop shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.run_next_queued().await {
                            Ok(QueueStepOutcome::Idle) => {}
                            Ok(outcome) => tracing::info!(status = outcome.name(), "worker step"),
                            Err(e) => tracing::error!(error = %e, "worker step failed"),
                        }
                    }
                }
            }
        })
    }

    /// Recovers jobs stuck in `running` past `older_than` — typically left
    /// behind by a worker process that crashed mid-job — by routing them
    /// back through the retry/dead-letter policy. Returns the count swept.
    pub async fn sweep_stranded(&self, older_than: Duration) -> SimResult<usize> {
        let threshold = chrono::Utc::now()
            - chrono::Duration::from_std(older_than).map_err(|e| SimError::Internal(e.to_string()))?;
        let stranded = self.store.stranded_running(threshold).await?;
        for job_id in &stranded {
            tracing::warn!(job_id = %job_id, "sweeping stranded running job");
            self.retry_or_dead(job_id, "stranded in running, swept after timeout".to_string()).await?;
        }
        Ok(stranded.len())
    }
}
