use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sim_types::{Job, JobResult, JobSummary, QueueRecord, QueueState, SimResult};

/// Aggregate counts used for the service-level summary endpoint.
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    pub total_jobs: i64,
    pub status_counts: std::collections::HashMap<String, i64>,
    pub queue_counts: std::collections::HashMap<String, i64>,
}

/// Durable persistence contract for jobs, results, and the queue state
/// machine. `sim-worker` and `sim-service` depend only on this trait, never
/// on `SqliteStore` directly, so an alternate backing store can be swapped
/// in without touching either of them.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn upsert_job(&self, job: &Job) -> SimResult<()>;
    async fn upsert_result(&self, result: &JobResult) -> SimResult<()>;
    async fn get_job(&self, job_id: &str) -> SimResult<Option<Job>>;
    async fn get_result(&self, job_id: &str) -> SimResult<Option<JobResult>>;
    async fn list_jobs(&self, limit: i64) -> SimResult<Vec<JobSummary>>;

    async fn enqueue(&self, job_id: &str, max_attempts: i64) -> SimResult<()>;
    async fn start_job(&self, job_id: &str) -> SimResult<()>;
    async fn finish_job(&self, job_id: &str, state: QueueState, error: Option<String>) -> SimResult<()>;
    async fn should_retry(&self, job_id: &str) -> SimResult<bool>;
    async fn requeue_for_retry(&self, job_id: &str, error: Option<String>) -> SimResult<()>;
    async fn cancel(&self, job_id: &str, reason: Option<String>) -> SimResult<()>;
    async fn replay_dead(&self, job_id: &str, max_attempts: i64) -> SimResult<bool>;
    async fn next_queued_job_id(&self) -> SimResult<Option<String>>;

    /// Atomically picks the oldest queued job and transitions it to
    /// `running` in one transaction, so two concurrent workers never claim
    /// the same record.
    async fn claim_next_queued(&self) -> SimResult<Option<String>>;

    async fn queue_state(&self, job_id: &str) -> SimResult<Option<QueueRecord>>;
    async fn purge_finished(&self, keep_latest: i64) -> SimResult<usize>;
    async fn summary(&self) -> SimResult<StoreSummary>;

    /// Job ids whose record is `running` with a `started_at` older than
    /// `threshold` — candidates for the worker sweeper to recover.
    async fn stranded_running(&self, threshold: DateTime<Utc>) -> SimResult<Vec<String>>;
}
