//! Main scheduler logic
//!
//! A run moves through validation, ordering and allocation. Groups are
//! processed in ascending id order and workloads in topological order.
//! Each workload goes to the first candidate resource that yields a
//! feasible block. Search never mutates the ledger, and the allocator is
//! only invoked with a confirmed block.

use chrono::NaiveDate;
use lotplan_core::{
    AvailabilityLedger, FailurePolicy, PlanError, PlanResult, Problem, Resource, ScheduleReport,
    ScheduleResult, SchedulingOptions, Unscheduled, Workload, WorkloadId,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::allocator::allocate;
use crate::ordering::order_workloads;
use crate::selector::ResourceSelector;
use crate::slot_finder::find_slot;

/// Dependency-aware greedy scheduler
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Options for every run
    options: SchedulingOptions,
    /// Candidate resource ordering
    selector: ResourceSelector,
}

/// Where each processed workload ended up
enum Outcome {
    Scheduled(usize),
    Unscheduled,
}

/// Start constraint derived from a workload's dependencies
enum Start {
    On(NaiveDate),
    /// A dependency was left unscheduled under the `continue` policy
    Blocked(WorkloadId),
}

impl Scheduler {
    /// Create a new scheduler, rejecting unsupported options
    pub fn new(options: SchedulingOptions) -> PlanResult<Self> {
        options.validate()?;
        let selector = ResourceSelector::new(options.effective_policy());

        info!(
            policy = %selector.policy(),
            strict = options.strict_dependency_mode,
            slot_search = ?options.slot_search,
            on_unschedulable = ?options.on_unschedulable,
            "Scheduler initialized"
        );

        Ok(Self { options, selector })
    }

    /// Options in effect
    pub fn options(&self) -> &SchedulingOptions {
        &self.options
    }

    /// Schedule every workload, committing bookings into `ledger`
    ///
    /// Under the `abort` policy the first unplaceable workload fails the
    /// run and the report's `unscheduled` list is always empty. Bookings
    /// land in a working copy that replaces `ledger` only when the run
    /// succeeds, so a failed run leaves `ledger` as it was.
    pub fn run(
        &self,
        workloads: &[Workload],
        resources: &[Resource],
        ledger: &mut AvailabilityLedger,
    ) -> PlanResult<ScheduleReport> {
        info!(
            workloads = workloads.len(),
            resources = resources.len(),
            availability = ledger.len(),
            "Starting scheduling run"
        );

        validate_inputs(workloads, resources, ledger)?;

        let strict = self.options.strict_dependency_mode;
        let groups = order_workloads(workloads, strict)?;
        let by_id: HashMap<WorkloadId, &Workload> = workloads.iter().map(|w| (w.id, w)).collect();

        let mut working = ledger.clone();
        let mut report = ScheduleReport::default();
        let mut outcomes: HashMap<WorkloadId, Outcome> = HashMap::new();

        for group in &groups {
            for id in &group.workload_ids {
                let Some(&workload) = by_id.get(id) else {
                    continue;
                };

                let earliest = match self.earliest_start(workload, &by_id, &outcomes, &report.results)? {
                    Start::On(earliest) => earliest,
                    Start::Blocked(blocked_by) => {
                        warn!(workload_id = workload.id, blocked_by, "Skipping workload");
                        report.unscheduled.push(Unscheduled {
                            workload_id: workload.id,
                            group_id: workload.group_id,
                            earliest: workload.expected_start,
                            reason: format!("dependency {} was not scheduled", blocked_by),
                        });
                        outcomes.insert(workload.id, Outcome::Unscheduled);
                        continue;
                    }
                };

                match self.place(workload, resources, &mut working, earliest) {
                    Ok(result) => {
                        outcomes.insert(workload.id, Outcome::Scheduled(report.results.len()));
                        report.results.push(result);
                    }
                    Err(PlanError::ResourceUnschedulable {
                        workload: workload_id,
                        group,
                        earliest,
                        reason,
                    }) if self.options.on_unschedulable == FailurePolicy::Continue => {
                        warn!(workload_id, group, %earliest, %reason, "Workload left unscheduled");
                        report.unscheduled.push(Unscheduled {
                            workload_id,
                            group_id: group,
                            earliest,
                            reason,
                        });
                        outcomes.insert(workload.id, Outcome::Unscheduled);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        *ledger = working;

        info!(
            scheduled = report.results.len(),
            unscheduled = report.unscheduled.len(),
            "Scheduling run finished"
        );

        Ok(report)
    }

    /// Latest of `expected_start` and every scheduled dependency's end
    fn earliest_start(
        &self,
        workload: &Workload,
        known: &HashMap<WorkloadId, &Workload>,
        outcomes: &HashMap<WorkloadId, Outcome>,
        results: &[ScheduleResult],
    ) -> PlanResult<Start> {
        let mut earliest = workload.expected_start;

        for &dependency in &workload.dependencies {
            // Unknown ids were already dropped, with a warning, while ordering
            if !known.contains_key(&dependency) {
                continue;
            }
            match outcomes.get(&dependency) {
                Some(Outcome::Scheduled(index)) => {
                    earliest = earliest.max(results[*index].end);
                }
                Some(Outcome::Unscheduled) => return Ok(Start::Blocked(dependency)),
                None if self.options.strict_dependency_mode => {
                    return Err(PlanError::DependencyNotScheduled {
                        workload: workload.id,
                        dependency,
                    });
                }
                None => {
                    warn!(
                        workload_id = workload.id,
                        dependency, "Dependency is scheduled later; ignoring it for the start date"
                    );
                }
            }
        }

        Ok(Start::On(earliest))
    }

    /// Try each candidate resource until one yields a block
    fn place(
        &self,
        workload: &Workload,
        resources: &[Resource],
        ledger: &mut AvailabilityLedger,
        earliest: NaiveDate,
    ) -> PlanResult<ScheduleResult> {
        let candidates = self.selector.order(resources, ledger);
        let mut last_failure = None;

        for resource in candidates {
            match find_slot(ledger, workload, resource, earliest, self.options.slot_search) {
                Ok(block) => return allocate(ledger, workload, resource, &block),
                Err(reason) => {
                    debug!(
                        workload_id = workload.id,
                        resource_id = resource.id,
                        %reason,
                        "Resource cannot host workload"
                    );
                    last_failure = Some(reason);
                }
            }
        }

        Err(PlanError::ResourceUnschedulable {
            workload: workload.id,
            group: workload.group_id,
            earliest,
            reason: last_failure
                .map(|r| r.to_string())
                .unwrap_or_else(|| "no candidate resources".to_string()),
        })
    }
}

/// Run a loaded problem with its own options
///
/// Returns the report together with the ledger after every commit.
pub fn plan(problem: Problem) -> PlanResult<(ScheduleReport, AvailabilityLedger)> {
    let Problem {
        options,
        workloads,
        resources,
        mut ledger,
    } = problem;

    let report = Scheduler::new(options)?.run(&workloads, &resources, &mut ledger)?;
    Ok((report, ledger))
}

/// Structural checks that run before any ordering or search
pub fn validate_inputs(
    workloads: &[Workload],
    resources: &[Resource],
    ledger: &AvailabilityLedger,
) -> PlanResult<()> {
    let mut workload_ids = HashSet::new();
    for w in workloads {
        if !workload_ids.insert(w.id) {
            return Err(PlanError::InvalidInput(format!("Duplicate workload ID: {}", w.id)));
        }
        if w.duration_minutes == 0 {
            return Err(PlanError::InvalidInput(format!(
                "Workload {} has zero duration",
                w.id
            )));
        }
    }

    let mut resource_ids = HashSet::new();
    for r in resources {
        if !resource_ids.insert(r.id) {
            return Err(PlanError::InvalidInput(format!("Duplicate resource ID: {}", r.id)));
        }
    }

    if let Some(entry) = ledger.iter().find(|e| !resource_ids.contains(&e.resource_id())) {
        return Err(PlanError::InvalidInput(format!(
            "Availability {} references unknown resource {}",
            entry.id(),
            entry.resource_id()
        )));
    }

    Ok(())
}
