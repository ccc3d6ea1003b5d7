//! Per-group topological ordering of workloads
//!
//! Workloads are grouped by `group_id` (ascending). Inside a group an edge
//! runs from each dependency to its dependent; dependencies living in other
//! groups are checked for existence but do not take part in ordering.
//! Among equally ready workloads the smallest id goes first, so the output
//! only depends on the workload set, never on input order.

use lotplan_core::{GroupId, PlanError, PlanResult, Workload, WorkloadId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Processing order for one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOrder {
    /// Group identifier
    pub group_id: GroupId,
    /// Workload ids, every intra-group dependency before its dependent
    pub workload_ids: Vec<WorkloadId>,
}

/// Group workloads and order each group topologically
///
/// In strict mode a dependency id that exists nowhere fails with
/// `DependencyNotFound` and an unorderable group fails with
/// `CycleDetected`. Otherwise the unknown dependency is ignored and the
/// blocked workloads are appended in ascending id order, both with a warning.
/// Duplicate workload ids are `InvalidInput` in either mode.
pub fn order_workloads(workloads: &[Workload], strict: bool) -> PlanResult<Vec<GroupOrder>> {
    let mut known: HashSet<WorkloadId> = HashSet::with_capacity(workloads.len());
    for workload in workloads {
        if !known.insert(workload.id) {
            return Err(PlanError::InvalidInput(format!(
                "Duplicate workload ID: {}",
                workload.id
            )));
        }
    }

    let mut groups: BTreeMap<GroupId, Vec<&Workload>> = BTreeMap::new();
    for workload in workloads {
        groups.entry(workload.group_id).or_default().push(workload);
    }

    groups
        .into_iter()
        .map(|(group_id, members)| {
            let workload_ids = order_group(group_id, &members, &known, strict)?;
            debug!(group_id, order = ?workload_ids, "Ordered group");
            Ok(GroupOrder {
                group_id,
                workload_ids,
            })
        })
        .collect()
}

/// Kahn's algorithm over one group's subgraph
fn order_group(
    group_id: GroupId,
    members: &[&Workload],
    known: &HashSet<WorkloadId>,
    strict: bool,
) -> PlanResult<Vec<WorkloadId>> {
    let mut in_degree: HashMap<WorkloadId, usize> = members.iter().map(|w| (w.id, 0)).collect();
    let mut successors: HashMap<WorkloadId, Vec<WorkloadId>> = HashMap::new();

    for workload in members {
        let mut seen = HashSet::new();
        for &dependency in &workload.dependencies {
            if !seen.insert(dependency) {
                continue;
            }
            if !known.contains(&dependency) {
                if strict {
                    return Err(PlanError::DependencyNotFound {
                        workload: workload.id,
                        dependency,
                    });
                }
                warn!(
                    workload_id = workload.id,
                    dependency, "Ignoring dependency on unknown workload"
                );
                continue;
            }
            if !in_degree.contains_key(&dependency) {
                // Lives in another group: existence checked, order not enforced
                continue;
            }
            successors.entry(dependency).or_default().push(workload.id);
            *in_degree.entry(workload.id).or_default() += 1;
        }
    }

    let mut ready: BTreeSet<WorkloadId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut ordered = Vec::with_capacity(members.len());

    while let Some(id) = ready.pop_first() {
        ordered.push(id);
        for next in successors.get(&id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*next);
                }
            }
        }
    }

    if ordered.len() != members.len() {
        let mut blocked: Vec<WorkloadId> = in_degree
            .into_iter()
            .filter(|&(_, degree)| degree > 0)
            .map(|(id, _)| id)
            .collect();
        blocked.sort_unstable();

        if strict {
            return Err(PlanError::CycleDetected {
                group: group_id,
                workloads: blocked,
            });
        }
        warn!(group_id, blocked = ?blocked, "Dependency cycle ignored; appending blocked workloads by id");
        ordered.extend(blocked);
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn workload(id: WorkloadId, group: GroupId, deps: &[WorkloadId]) -> Workload {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        deps.iter()
            .fold(Workload::new(id, group, 60, start), |w, &d| w.with_dependency(d))
    }

    fn position(order: &[WorkloadId], id: WorkloadId) -> usize {
        order.iter().position(|&x| x == id).unwrap()
    }

    #[test]
    fn test_groups_ascending() {
        let workloads = vec![
            workload(10, 2, &[]),
            workload(1, 1, &[]),
            workload(20, 3, &[]),
        ];
        let order = order_workloads(&workloads, true).unwrap();
        let groups: Vec<GroupId> = order.iter().map(|g| g.group_id).collect();
        assert_eq!(groups, vec![1, 2, 3]);
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let workloads = vec![
            workload(3, 1, &[2]),
            workload(2, 1, &[1]),
            workload(1, 1, &[]),
            workload(4, 1, &[1, 3]),
        ];
        let order = order_workloads(&workloads, true).unwrap();
        let ids = &order[0].workload_ids;

        for w in &workloads {
            for dep in &w.dependencies {
                assert!(position(ids, *dep) < position(ids, w.id));
            }
        }
        assert_eq!(ids, &vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let workloads = vec![
            workload(9, 1, &[]),
            workload(5, 1, &[]),
            workload(7, 1, &[5]),
            workload(6, 1, &[5]),
        ];
        let order = order_workloads(&workloads, true).unwrap();
        assert_eq!(order[0].workload_ids, vec![5, 6, 7, 9]);

        let mut reversed = workloads.clone();
        reversed.reverse();
        assert_eq!(order_workloads(&reversed, true).unwrap(), order);
    }

    #[test]
    fn test_cross_group_dependency_not_ordered() {
        let workloads = vec![workload(1, 1, &[10]), workload(10, 2, &[])];
        let order = order_workloads(&workloads, true).unwrap();
        assert_eq!(order[0].workload_ids, vec![1]);
        assert_eq!(order[1].workload_ids, vec![10]);
    }

    #[test]
    fn test_missing_dependency() {
        let workloads = vec![workload(1, 1, &[]), workload(2, 2, &[99])];
        let err = order_workloads(&workloads, true).unwrap_err();
        assert!(matches!(
            err,
            PlanError::DependencyNotFound {
                workload: 2,
                dependency: 99
            }
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let workloads = vec![
            workload(1, 1, &[2]),
            workload(2, 1, &[1]),
            workload(3, 1, &[]),
        ];
        let err = order_workloads(&workloads, true).unwrap_err();
        match err {
            PlanError::CycleDetected { group, workloads } => {
                assert_eq!(group, 1);
                assert_eq!(workloads, vec![1, 2]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let workloads = vec![workload(4, 1, &[4])];
        assert!(matches!(
            order_workloads(&workloads, true),
            Err(PlanError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_non_strict_recovers() {
        let workloads = vec![
            workload(1, 1, &[2]),
            workload(2, 1, &[1]),
            workload(3, 1, &[99]),
        ];
        let order = order_workloads(&workloads, false).unwrap();
        assert_eq!(order[0].workload_ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_duplicate_workload_id_is_invalid_input() {
        let workloads = vec![workload(1, 1, &[]), workload(1, 1, &[])];

        for strict in [true, false] {
            let err = order_workloads(&workloads, strict).unwrap_err();
            assert!(
                matches!(err, PlanError::InvalidInput(msg) if msg.contains("Duplicate workload ID: 1"))
            );
        }
    }

    #[test]
    fn test_duplicate_dependency_counted_once() {
        let mut dependent = workload(2, 1, &[]);
        dependent.dependencies = vec![1, 1];
        let workloads = vec![workload(1, 1, &[]), dependent];

        let order = order_workloads(&workloads, true).unwrap();
        assert_eq!(order[0].workload_ids, vec![1, 2]);
    }
}
