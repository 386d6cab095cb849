use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Direction an objective should be driven in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalDirection {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Range,
    Lte,
    Gte,
    Eq,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub name: String,
    pub kind: ConstraintKind,
    pub field: String,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub name: String,
    pub direction: GoalDirection,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// The rectangular parameter region a planner samples from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignSpace {
    pub bounds: HashMap<String, (f64, f64)>,
}

/// One proposed experiment, ready to be run through a domain simulator or
/// backend adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub experiment_id: String,
    pub domain: String,
    pub parameters: HashMap<String, f64>,
    #[serde(default)]
    pub objectives: Vec<ObjectiveSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Feasibility verdict for a run, mirroring the three outcomes the original
/// constraint checker produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Failed,
    Infeasible,
}

/// The recorded outcome of one experiment, appended to experiment memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub experiment_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
    #[serde(default)]
    pub outputs: HashMap<String, f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_weight_defaults_to_one_on_deserialize() {
        let json = r#"{"name":"yield","direction":"maximize"}"#;
        let obj: ObjectiveSpec = serde_json::from_str(json).unwrap();
        assert_eq!(obj.weight, 1.0);
    }

    #[test]
    fn run_result_deserializes_without_parameters_field() {
        let json = r#"{"experiment_id":"e-1","status":"ok","outputs":{"yield":1.0}}"#;
        let r: RunResult = serde_json::from_str(json).unwrap();
        assert!(r.parameters.is_empty());
        assert_eq!(r.status, RunStatus::Ok);
    }
}
