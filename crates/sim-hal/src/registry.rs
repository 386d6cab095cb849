use std::sync::Arc;

use rustc_hash::FxHashMap;
use sim_types::{SimError, SimResult};

use crate::adapter::Adapter;

/// Closed registry of the backend adapters this orchestrator knows about.
///
/// There is no dynamic plugin loading here (unlike the quantum-hardware HAL
/// this is adapted from) — every adapter is a concrete crate wired in at
/// construction time by the binary that owns the registry.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: FxHashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(adapter.backend_name().to_string(), adapter);
    }

    pub fn get(&self, backend: &str) -> SimResult<Arc<dyn Adapter>> {
        self.adapters
            .get(backend)
            .cloned()
            .ok_or_else(|| SimError::Validation(format!("unsupported backend: {backend}")))
    }

    pub fn has_backend(&self, backend: &str) -> bool {
        self.adapters.contains_key(backend)
    }

    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    struct StubAdapter;

    #[async_trait::async_trait]
    impl Adapter for StubAdapter {
        fn backend_name(&self) -> &'static str {
            "stub-driver"
        }

        fn create_job(
            &self,
            job_id: &str,
            base_workdir: &Path,
            _inputs: HashMap<String, serde_json::Value>,
        ) -> SimResult<sim_types::Job> {
            Ok(sim_types::Job::new(job_id, self.backend_name(), base_workdir.to_string_lossy().to_string()))
        }

        async fn run(&self, job: &sim_types::Job) -> SimResult<sim_types::JobResult> {
            Ok(sim_types::JobResult::completed(&job.job_id, HashMap::new()))
        }

        fn parse_results(&self, job: &sim_types::Job) -> SimResult<sim_types::JobResult> {
            Ok(sim_types::JobResult::completed(&job.job_id, HashMap::new()))
        }
    }

    #[test]
    fn register_and_fetch_by_name() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(StubAdapter));
        assert!(registry.has_backend("stub-driver"));
        assert_eq!(registry.available_backends(), vec!["stub-driver".to_string()]);
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let registry = AdapterRegistry::new();
        assert!(registry.get("nonexistent").is_err());
    }
}
