use std::path::PathBuf;

/// Runtime configuration for [`crate::SimulationService`].
///
/// Per-backend executable overrides (`CFD_CMD`, `MD_CMD`, ...) are read by
/// each adapter directly via `std::env::var` and are not duplicated here;
/// this config only carries the subset of settings the service itself owns.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root directory under which `service.db`, job directories, and
    /// experiment-memory JSONL files are created.
    pub base_workdir: PathBuf,

    /// WSL distribution adapters fall back to when a backend executable
    /// isn't directly on `PATH`.
    pub wsl_distro: String,

    /// `max_attempts` used by `enqueue_job` when the caller doesn't specify one.
    pub default_max_attempts: i64,

    /// `keep_latest` used by `purge_finished` when the caller doesn't specify one.
    pub default_purge_keep_latest: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_workdir: std::env::var("SIM_BASE_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("sim-orchestrator")),
            wsl_distro: std::env::var(sim_hal::WSL_DISTRO_ENV).unwrap_or_else(|_| "Ubuntu".to_string()),
            default_max_attempts: std::env::var("SIM_DEFAULT_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            default_purge_keep_latest: std::env::var("SIM_PURGE_KEEP_LATEST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200),
        }
    }
}
