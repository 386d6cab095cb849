use std::collections::HashMap;

use sim_types::{ConstraintKind, ConstraintSpec, DesignSpace, ObjectiveSpec, RunResult, RunStatus, SimResult};

use crate::memory::ExperimentMemory;
use crate::pareto::pareto_front;
use crate::planner::Planner;

/// Caller-supplied simulator: takes a proposed parameter point and returns
/// observed outputs. Supplied by the service facade / caller, never by the
/// engine itself — the engine only orchestrates planning and bookkeeping.
pub type SimulatorFn<'a> = dyn Fn(&HashMap<String, f64>) -> HashMap<String, f64> + Send + Sync + 'a;

/// What to do with the score of an infeasible run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyMode {
    /// Leave the score unset (`None`).
    Discard,
    /// Score as `-|penalty_value|`, letting infeasible points still
    /// participate in acquisition ranking as a strongly discouraged region.
    Soft,
}

/// Drives one planning/execution/persistence cycle: ask a [`Planner`] for
/// proposals, run each through the simulator, apply the constraint check
/// and scoring rules, and append every outcome to experiment memory.
pub struct ExperimentEngine<'a> {
    domain: String,
    planner: Box<dyn Planner + 'a>,
    memory: ExperimentMemory,
    simulator: Box<SimulatorFn<'a>>,
}

impl<'a> ExperimentEngine<'a> {
    pub fn new(
        domain: impl Into<String>,
        planner: Box<dyn Planner + 'a>,
        memory: ExperimentMemory,
        simulator: Box<SimulatorFn<'a>>,
    ) -> Self {
        ExperimentEngine { domain: domain.into(), planner, memory, simulator }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_iteration(
        &self,
        design_space: &DesignSpace,
        objectives: &[ObjectiveSpec],
        constraints: &[ConstraintSpec],
        n: usize,
        penalty_mode: PenaltyMode,
        penalty_value: f64,
    ) -> SimResult<Vec<RunResult>> {
        let history = self.memory.load_all()?;
        let specs = self.planner.propose(&self.domain, design_space, objectives, constraints, &history, n);

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let outputs = (self.simulator)(&spec.parameters);
            let status = check_constraints(&outputs, &spec.constraints);

            let score = match status {
                RunStatus::Ok => Some(score_outputs(&outputs, &spec.objectives)),
                RunStatus::Infeasible if penalty_mode == PenaltyMode::Soft => Some(-penalty_value.abs()),
                _ => None,
            };

            let mut notes = Vec::new();
            if let Some(planner_name) = spec.metadata.get("planner") {
                notes.push(format!("planner={planner_name}"));
            }
            if let Some(acq) = spec.metadata.get("acquisition") {
                notes.push(format!("acquisition={acq}"));
            }

            let result = RunResult {
                experiment_id: spec.experiment_id,
                status,
                parameters: spec.parameters,
                outputs,
                score,
                notes,
            };
            self.memory.append(&result)?;
            results.push(result);
        }

        Ok(results)
    }

    pub fn current_pareto_front(&self, objectives: &[ObjectiveSpec]) -> SimResult<Vec<RunResult>> {
        let history = self.memory.load_all()?;
        Ok(pareto_front(&history, objectives))
    }
}

fn score_outputs(outputs: &HashMap<String, f64>, objectives: &[ObjectiveSpec]) -> f64 {
    objectives
        .iter()
        .map(|obj| {
            let val = *outputs.get(&obj.name).unwrap_or(&0.0);
            let signed = if obj.direction == sim_types::GoalDirection::Maximize { val } else { -val };
            obj.weight * signed
        })
        .sum()
}

const EQ_TOLERANCE: f64 = 1e-9;

fn check_constraints(outputs: &HashMap<String, f64>, constraints: &[ConstraintSpec]) -> RunStatus {
    for c in constraints {
        let Some(&val) = outputs.get(&c.field) else {
            return RunStatus::Failed;
        };
        match c.kind {
            ConstraintKind::Range => {
                if let Some(low) = c.low {
                    if val < low {
                        return RunStatus::Infeasible;
                    }
                }
                if let Some(high) = c.high {
                    if val > high {
                        return RunStatus::Infeasible;
                    }
                }
            }
            ConstraintKind::Lte => {
                if let Some(max) = c.value {
                    if val > max {
                        return RunStatus::Infeasible;
                    }
                }
            }
            ConstraintKind::Gte => {
                if let Some(min) = c.value {
                    if val < min {
                        return RunStatus::Infeasible;
                    }
                }
            }
            ConstraintKind::Eq => {
                if let Some(target) = c.value {
                    if (val - target).abs() > EQ_TOLERANCE {
                        return RunStatus::Infeasible;
                    }
                }
            }
        }
    }
    RunStatus::Ok
}
