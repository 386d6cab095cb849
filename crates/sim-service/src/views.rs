use std::collections::HashMap;

use serde::Serialize;
use sim_store::StoreSummary;
use sim_types::{Job, JobResult, QueueRecord};

/// `get_job`'s projection: the job row, its latest result if one exists,
/// and its queue position.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job: Job,
    pub result: Option<JobResult>,
    pub queue: Option<QueueRecord>,
}

/// Whether a backend's configured executable can actually be invoked from
/// this host, either directly on `PATH` or through the WSL bridge.
#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    pub cmd: String,
    pub available: bool,
}

/// Aggregate view combining store-level counts with adapter reachability.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSummary {
    pub total_jobs: i64,
    pub status_counts: HashMap<String, i64>,
    pub queue_counts: HashMap<String, i64>,
    pub backend_health: HashMap<String, BackendHealth>,
}

impl ServiceSummary {
    pub(crate) fn new(store: StoreSummary, backend_health: HashMap<String, BackendHealth>) -> Self {
        ServiceSummary {
            total_jobs: store.total_jobs,
            status_counts: store.status_counts,
            queue_counts: store.queue_counts,
            backend_health,
        }
    }
}

/// `purge_finished`'s report of what was reclaimed.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub deleted: usize,
    pub kept_latest: i64,
}
