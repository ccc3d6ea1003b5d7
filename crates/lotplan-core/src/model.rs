//! Workload, Resource, Booking and ScheduleResult type definitions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Workload identifier
pub type WorkloadId = u32;
/// Dependency group identifier
pub type GroupId = u32;
/// Resource identifier
pub type ResourceId = u32;
/// Ledger entry identifier
pub type EntryId = u32;

/// A unit of work requiring time, area and lift capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    /// Unique workload identifier
    pub id: WorkloadId,
    /// Group whose internal dependency order is enforced
    pub group_id: GroupId,
    /// Total working time needed, in minutes
    pub duration_minutes: u32,
    /// Footprint area reserved on every touched period
    #[serde(default)]
    pub area_required: u32,
    /// Weight the hosting resource must be able to lift
    #[serde(default)]
    pub effective_weight: u32,
    /// Whether the workload needs periods without any other booking
    #[serde(default)]
    pub exclusive: bool,
    /// Earliest date the workload may start
    pub expected_start: NaiveDate,
    /// Workloads that must complete first
    #[serde(default)]
    pub dependencies: Vec<WorkloadId>,
}

impl Workload {
    /// Create a workload with no footprint, weight or dependencies
    pub fn new(
        id: WorkloadId,
        group_id: GroupId,
        duration_minutes: u32,
        expected_start: NaiveDate,
    ) -> Self {
        Self {
            id,
            group_id,
            duration_minutes,
            area_required: 0,
            effective_weight: 0,
            exclusive: false,
            expected_start,
            dependencies: Vec::new(),
        }
    }

    /// Set the required footprint area
    pub fn with_area(mut self, area: u32) -> Self {
        self.area_required = area;
        self
    }

    /// Set the effective lift weight
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.effective_weight = weight;
        self
    }

    /// Mark the workload as exclusive
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Add a dependency, keeping the list free of duplicates
    pub fn with_dependency(mut self, dependency: WorkloadId) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }
}

/// A capacity-bounded allocatable entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier
    pub id: ResourceId,
    /// Maximum footprint area
    pub max_area: u32,
    /// Maximum liftable weight
    pub max_lift_weight: u32,
    /// Nominal minutes available per period
    pub available_minutes_per_day: u32,
}

impl Resource {
    /// Create a new resource
    pub fn new(
        id: ResourceId,
        max_area: u32,
        max_lift_weight: u32,
        available_minutes_per_day: u32,
    ) -> Self {
        Self {
            id,
            max_area,
            max_lift_weight,
            available_minutes_per_day,
        }
    }

    /// Whether this resource can lift the workload at all
    pub fn can_lift(&self, workload: &Workload) -> bool {
        self.max_lift_weight >= workload.effective_weight
    }
}

/// One ledger entry touched by one workload's allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Ledger entry that was consumed
    pub entry_id: EntryId,
    /// Period of the entry
    pub date: NaiveDate,
    /// Resource owning the entry
    pub resource_id: ResourceId,
    /// Area reserved on this period
    pub booked_area: u32,
    /// Minutes consumed on this period
    pub booked_minutes: u32,
}

/// Placement of one successfully scheduled workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Scheduled workload
    pub workload_id: WorkloadId,
    /// Date of the first touched entry
    pub start: NaiveDate,
    /// Date of the last touched entry
    pub end: NaiveDate,
    /// Bookings in commit order
    pub bookings: Vec<Booking>,
}

impl ScheduleResult {
    /// Resource hosting the workload
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.bookings.first().map(|b| b.resource_id)
    }

    /// Total minutes booked across all periods
    pub fn booked_minutes(&self) -> u64 {
        self.bookings.iter().map(|b| u64::from(b.booked_minutes)).sum()
    }
}

/// A workload left unplaced under the `continue` failure policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unscheduled {
    /// Workload that could not be placed
    pub workload_id: WorkloadId,
    /// Group of the workload
    pub group_id: GroupId,
    /// Earliest date that was tried
    pub earliest: NaiveDate,
    /// Why no placement was found
    pub reason: String,
}

/// Output of a scheduling run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    /// Results in processing order (group ascending, then topological)
    pub results: Vec<ScheduleResult>,
    /// Workloads skipped under the `continue` policy, in processing order
    pub unscheduled: Vec<Unscheduled>,
}

impl ScheduleReport {
    /// Result recorded for a workload
    pub fn result_for(&self, workload_id: WorkloadId) -> Option<&ScheduleResult> {
        self.results.iter().find(|r| r.workload_id == workload_id)
    }

    /// Whether every workload was placed
    pub fn is_complete(&self) -> bool {
        self.unscheduled.is_empty()
    }
}
