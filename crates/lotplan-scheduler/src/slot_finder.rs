//! Read-only search for a feasible block of ledger entries

use chrono::NaiveDate;
use lotplan_core::{
    AvailabilityEntry, AvailabilityLedger, EntryKey, EntryStatus, Resource, ResourceId,
    SlotSearch, Workload,
};
use tracing::trace;

/// Ledger entries chosen for one workload on one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBlock {
    /// Resource owning every entry
    pub resource_id: ResourceId,
    /// Entry keys in ascending date order
    pub entries: Vec<EntryKey>,
}

/// Why a resource could not host a workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Infeasibility {
    /// The resource cannot lift the workload
    LiftWeightExceeded {
        /// Resource that was tried
        resource_id: ResourceId,
        /// Resource lift ceiling
        max_lift_weight: u32,
        /// Workload weight
        required: u32,
    },
    /// The resource has no entries on or after the earliest date
    NoAvailability {
        /// Resource that was tried
        resource_id: ResourceId,
        /// Earliest date searched
        earliest: NaiveDate,
    },
    /// Entries exist but never add up to the duration
    InsufficientCapacity {
        /// Resource that was tried
        resource_id: ResourceId,
        /// Longest run of usable minutes found
        best_minutes: u64,
        /// Minutes the workload needs
        required_minutes: u32,
    },
}

impl std::fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Infeasibility::LiftWeightExceeded {
                resource_id,
                max_lift_weight,
                required,
            } => write!(
                f,
                "resource {} lifts at most {}, workload needs {}",
                resource_id, max_lift_weight, required
            ),
            Infeasibility::NoAvailability {
                resource_id,
                earliest,
            } => write!(
                f,
                "resource {} has no availability on or after {}",
                resource_id, earliest
            ),
            Infeasibility::InsufficientCapacity {
                resource_id,
                best_minutes,
                required_minutes,
            } => write!(
                f,
                "resource {} offers at most {} usable minutes in one block, workload needs {}",
                resource_id, best_minutes, required_minutes
            ),
        }
    }
}

/// Whether a single entry may host part of the workload
///
/// Shared by search and commit so both apply the same rule.
pub fn entry_fits(entry: &AvailabilityEntry, workload: &Workload) -> bool {
    entry.status() != EntryStatus::FullyBooked
        && entry.remaining_area() >= workload.area_required
        && (!workload.exclusive || entry.is_untouched())
}

/// Find a block on `resource` starting on or after `earliest`
///
/// Never mutates the ledger. The weight gate is checked once, before
/// scanning any entry.
pub fn find_slot(
    ledger: &AvailabilityLedger,
    workload: &Workload,
    resource: &Resource,
    earliest: NaiveDate,
    mode: SlotSearch,
) -> Result<SlotBlock, Infeasibility> {
    if !resource.can_lift(workload) {
        return Err(Infeasibility::LiftWeightExceeded {
            resource_id: resource.id,
            max_lift_weight: resource.max_lift_weight,
            required: workload.effective_weight,
        });
    }

    let entries: Vec<&AvailabilityEntry> = ledger.entries_for(resource.id, earliest).collect();
    if entries.is_empty() {
        return Err(Infeasibility::NoAvailability {
            resource_id: resource.id,
            earliest,
        });
    }

    let mut scan = Accumulator::new(workload.duration_minutes);
    for entry in entries {
        let fits = entry_fits(entry, workload);
        let breaks_run = match mode {
            SlotSearch::Lenient => false,
            SlotSearch::Contiguous => scan
                .last_date
                .is_some_and(|d| d.succ_opt() != Some(entry.date())),
        };

        if breaks_run {
            scan.reset();
        }
        if !fits {
            trace!(
                workload_id = workload.id,
                availability_id = entry.id(),
                "Skipping infeasible availability"
            );
            scan.reset();
            continue;
        }
        if scan.push(entry) {
            return Ok(SlotBlock {
                resource_id: resource.id,
                entries: scan.block,
            });
        }
    }

    Err(Infeasibility::InsufficientCapacity {
        resource_id: resource.id,
        best_minutes: scan.best_minutes,
        required_minutes: workload.duration_minutes,
    })
}

/// Candidate block plus its summed minutes
struct Accumulator {
    required: u64,
    block: Vec<EntryKey>,
    minutes: u64,
    best_minutes: u64,
    last_date: Option<NaiveDate>,
}

impl Accumulator {
    fn new(required: u32) -> Self {
        Self {
            required: u64::from(required),
            block: Vec::new(),
            minutes: 0,
            best_minutes: 0,
            last_date: None,
        }
    }

    fn reset(&mut self) {
        self.block.clear();
        self.minutes = 0;
        self.last_date = None;
    }

    /// Append an entry; true once the duration is covered
    fn push(&mut self, entry: &AvailabilityEntry) -> bool {
        self.block.push(entry.key());
        self.minutes += u64::from(entry.remaining_minutes());
        self.best_minutes = self.best_minutes.max(self.minutes);
        self.last_date = Some(entry.date());
        self.minutes >= self.required
    }
}
