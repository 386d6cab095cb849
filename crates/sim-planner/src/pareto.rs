use std::collections::HashMap;

use sim_types::{GoalDirection, ObjectiveSpec, RunResult, RunStatus};

/// Converts a result's raw outputs into a canonical maximization vector,
/// negating any objective whose direction is `minimize`.
pub fn objective_vector(outputs: &HashMap<String, f64>, objectives: &[ObjectiveSpec]) -> HashMap<String, f64> {
    objectives
        .iter()
        .map(|o| {
            let raw = *outputs.get(&o.name).unwrap_or(&0.0);
            let v = if o.direction == GoalDirection::Maximize { raw } else { -raw };
            (o.name.clone(), v)
        })
        .collect()
}

/// True if `a` Pareto-dominates `b`: `a[k] >= b[k]` for every shared key
/// and `a[k] > b[k]` for at least one. Vectors with no shared keys never
/// dominate each other.
pub fn dominates(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> bool {
    let shared: Vec<&String> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if shared.is_empty() {
        return false;
    }
    let ge_all = shared.iter().all(|k| a[*k] >= b[*k]);
    let gt_any = shared.iter().any(|k| a[*k] > b[*k]);
    ge_all && gt_any
}

/// Returns the non-dominated subset of `status == ok` results.
pub fn pareto_front(results: &[RunResult], objectives: &[ObjectiveSpec]) -> Vec<RunResult> {
    let feasible: Vec<&RunResult> = results.iter().filter(|r| r.status == RunStatus::Ok).collect();
    let vectors: Vec<HashMap<String, f64>> = feasible.iter().map(|r| objective_vector(&r.outputs, objectives)).collect();

    let mut front = Vec::new();
    for (i, result) in feasible.iter().enumerate() {
        let dominated = vectors.iter().enumerate().any(|(j, vj)| i != j && dominates(vj, &vectors[i]));
        if !dominated {
            front.push((*result).clone());
        }
    }
    front
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn objectives() -> Vec<ObjectiveSpec> {
        vec![
            ObjectiveSpec { name: "yield".to_string(), direction: GoalDirection::Maximize, weight: 1.0 },
            ObjectiveSpec { name: "energy".to_string(), direction: GoalDirection::Minimize, weight: 1.0 },
        ]
    }

    fn row(id: &str, yield_: f64, energy: f64) -> RunResult {
        RunResult {
            experiment_id: id.to_string(),
            status: RunStatus::Ok,
            parameters: Map::new(),
            outputs: Map::from([("yield".to_string(), yield_), ("energy".to_string(), energy)]),
            score: None,
            notes: vec![],
        }
    }

    #[test]
    fn no_mutual_dominance_keeps_all_three() {
        let results = vec![row("a", 10.0, 5.0), row("b", 8.0, 3.0), row("c", 5.0, 1.0)];
        let front = pareto_front(&results, &objectives());
        assert_eq!(front.len(), 3);
    }

    #[test]
    fn strictly_worse_point_is_excluded() {
        let results = vec![row("a", 10.0, 5.0), row("dominated", 9.0, 6.0)];
        let front = pareto_front(&results, &objectives());
        assert_eq!(front.len(), 1);
        assert_eq!(front[0].experiment_id, "a");
    }

    #[test]
    fn infeasible_and_failed_rows_never_enter_the_front() {
        let mut infeasible = row("x", 100.0, 0.0);
        infeasible.status = RunStatus::Infeasible;
        let results = vec![row("a", 1.0, 1.0), infeasible];
        let front = pareto_front(&results, &objectives());
        assert_eq!(front.len(), 1);
        assert_eq!(front[0].experiment_id, "a");
    }

    #[test]
    fn soundness_every_front_pair_is_mutually_non_dominant() {
        let results = vec![row("a", 10.0, 5.0), row("b", 8.0, 3.0), row("c", 5.0, 1.0), row("d", 1.0, 9.0)];
        let front = pareto_front(&results, &objectives());
        for r in &front {
            for other in &front {
                if r.experiment_id == other.experiment_id {
                    continue;
                }
                let rv = objective_vector(&r.outputs, &objectives());
                let ov = objective_vector(&other.outputs, &objectives());
                assert!(!dominates(&rv, &ov));
            }
        }
    }

    proptest::proptest! {
        #[test]
        fn front_members_never_dominate_each_other(
            points in proptest::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 0..20)
        ) {
            let objs = objectives();
            let results: Vec<RunResult> = points
                .into_iter()
                .enumerate()
                .map(|(i, (y, e))| row(&format!("r{i}"), y, e))
                .collect();
            let front = pareto_front(&results, &objs);

            for a in &front {
                for b in &front {
                    if a.experiment_id == b.experiment_id {
                        continue;
                    }
                    let av = objective_vector(&a.outputs, &objs);
                    let bv = objective_vector(&b.outputs, &objs);
                    prop_assert!(!dominates(&av, &bv));
                }
            }

            for d in &results {
                if front.iter().any(|r| r.experiment_id == d.experiment_id) {
                    continue;
                }
                let dv = objective_vector(&d.outputs, &objs);
                let dominated_by_front = front.iter().any(|r| dominates(&objective_vector(&r.outputs, &objs), &dv));
                prop_assert!(dominated_by_front);
            }
        }
    }
}
