use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use sim_types::{RunResult, SimResult};

use crate::error::PlannerError;

/// Append-only log of [`RunResult`] records, one JSON object per line.
///
/// There is no in-memory cache: every [`ExperimentMemory::load_all`] call
/// re-reads the file from disk, so multiple processes can share one memory
/// file without coordination beyond the filesystem's own append semantics.
#[derive(Debug, Clone)]
pub struct ExperimentMemory {
    path: PathBuf,
}

impl ExperimentMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ExperimentMemory { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single `json(result) + "\n"` line.
    ///
    /// Opening in append mode and writing the line in one `write_all` call
    /// relies on the OS's append-atomicity for records this small; a crash
    /// mid-write can at worst leave a truncated last line, never corrupt an
    /// earlier one.
    pub fn append(&self, result: &RunResult) -> SimResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(PlannerError::from)?;
            }
        }
        let mut line = serde_json::to_string(result).map_err(PlannerError::from)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(PlannerError::from)?;
        file.write_all(line.as_bytes()).map_err(PlannerError::from)?;
        Ok(())
    }

    /// Reads every record, tolerating legacy lines that omit `parameters`
    /// (defaulted to an empty map by [`RunResult`]'s own deserialization).
    /// Returns an empty list when the file doesn't exist yet.
    pub fn load_all(&self) -> SimResult<Vec<RunResult>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(PlannerError::from)?;
        let mut out = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let result: RunResult = serde_json::from_str(line).map_err(PlannerError::from)?;
            out.push(result);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_types::RunStatus;
    use std::collections::HashMap;

    fn sample(id: &str) -> RunResult {
        RunResult {
            experiment_id: id.to_string(),
            status: RunStatus::Ok,
            parameters: HashMap::from([("x".to_string(), 1.0)]),
            outputs: HashMap::from([("yield".to_string(), 10.0)]),
            score: Some(10.0),
            notes: vec![],
        }
    }

    #[test]
    fn load_all_is_empty_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mem = ExperimentMemory::new(dir.path().join("nope.jsonl"));
        assert!(mem.load_all().unwrap().is_empty());
    }

    #[test]
    fn append_is_visible_on_next_load() {
        let dir = tempfile::tempdir().unwrap();
        let mem = ExperimentMemory::new(dir.path().join("mem.jsonl"));

        let before = mem.load_all().unwrap();
        mem.append(&sample("exp-1")).unwrap();
        let after = mem.load_all().unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after.last().unwrap().experiment_id, "exp-1");
    }

    #[test]
    fn creates_parent_directory_on_first_append() {
        let dir = tempfile::tempdir().unwrap();
        let mem = ExperimentMemory::new(dir.path().join("nested").join("mem.jsonl"));
        mem.append(&sample("exp-1")).unwrap();
        assert_eq!(mem.load_all().unwrap().len(), 1);
    }

    #[test]
    fn missing_parameters_field_defaults_to_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.jsonl");
        std::fs::write(&path, r#"{"experiment_id":"e-1","status":"ok","outputs":{"yield":1.0}}"#.to_string() + "\n").unwrap();

        let mem = ExperimentMemory::new(path);
        let rows = mem.load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].parameters.is_empty());
    }
}
