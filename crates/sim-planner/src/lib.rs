//! Experiment memory, pluggable planners, the experiment engine, and
//! Pareto-front extraction for the cognitive experiment-suggestion loop.

mod engine;
mod error;
mod memory;
mod pareto;
mod planner;

pub use engine::{ExperimentEngine, PenaltyMode, SimulatorFn};
pub use error::{PlannerError, PlannerResult};
pub use memory::ExperimentMemory;
pub use pareto::{dominates, objective_vector, pareto_front};
pub use planner::{AcquisitionKind, GridPlanner, Planner, SequentialPlanner, SurrogatePlanner};
