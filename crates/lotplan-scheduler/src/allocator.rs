//! Commits a confirmed block into the availability ledger

use lotplan_core::{
    AvailabilityLedger, Booking, PlanError, PlanResult, Resource, ScheduleResult, Workload,
};
use tracing::info;

use crate::slot_finder::{entry_fits, SlotBlock};

/// Commit `workload` onto `block` and produce its schedule result
///
/// Each touched entry gives up `min(still needed, remaining minutes)`
/// minutes and the workload's full area for that day. All bookings are
/// computed and checked before the first write, so a failed check leaves
/// the ledger untouched. Block keys must be strictly ascending by date.
pub fn allocate(
    ledger: &mut AvailabilityLedger,
    workload: &Workload,
    resource: &Resource,
    block: &SlotBlock,
) -> PlanResult<ScheduleResult> {
    if block.resource_id != resource.id {
        return Err(PlanError::AllocationInvariant(format!(
            "Block for resource {} offered to resource {}",
            block.resource_id, resource.id
        )));
    }
    if !resource.can_lift(workload) {
        return Err(PlanError::AllocationInvariant(format!(
            "Resource {} cannot lift workload {} ({} > {})",
            resource.id, workload.id, workload.effective_weight, resource.max_lift_weight
        )));
    }

    // Each entry is checked once against its pre-commit state, so keys must be unique
    if let Some(pair) = block
        .entries
        .windows(2)
        .find(|pair| pair[0].date >= pair[1].date)
    {
        return Err(PlanError::AllocationInvariant(format!(
            "Block for workload {} is not strictly ascending: {} then {}",
            workload.id, pair[0].date, pair[1].date
        )));
    }
    if let Some(key) = block.entries.iter().find(|k| k.resource_id != block.resource_id) {
        return Err(PlanError::AllocationInvariant(format!(
            "Block for resource {} contains an entry of resource {}",
            block.resource_id, key.resource_id
        )));
    }

    let mut needed = workload.duration_minutes;
    let mut planned = Vec::with_capacity(block.entries.len());

    for key in &block.entries {
        if needed == 0 {
            break;
        }
        let entry = ledger.get(key).ok_or_else(|| {
            PlanError::AllocationInvariant(format!(
                "No availability for resource {} on {}",
                key.resource_id, key.date
            ))
        })?;
        if !entry_fits(entry, workload) {
            return Err(PlanError::AllocationInvariant(format!(
                "Availability {} on {} no longer fits workload {} on resource {}",
                entry.id(),
                entry.date(),
                workload.id,
                resource.id
            )));
        }

        let take = needed.min(entry.remaining_minutes());
        if take == 0 {
            continue;
        }
        planned.push((
            *key,
            Booking {
                entry_id: entry.id(),
                date: entry.date(),
                resource_id: entry.resource_id(),
                booked_area: workload.area_required,
                booked_minutes: take,
            },
        ));
        needed -= take;
    }

    if needed > 0 {
        return Err(PlanError::AllocationInvariant(format!(
            "Block allocation for workload {} did not provide full duration. {} minutes remaining.",
            workload.id, needed
        )));
    }

    let mut bookings = Vec::with_capacity(planned.len());
    for (key, booking) in planned {
        ledger.commit(&key, booking.booked_area, booking.booked_minutes)?;
        bookings.push(booking);
    }

    let (Some(first), Some(last)) = (bookings.first(), bookings.last()) else {
        return Err(PlanError::AllocationInvariant(format!(
            "Workload {} produced no bookings",
            workload.id
        )));
    };
    let (start, end) = (first.date, last.date);

    info!(
        workload_id = workload.id,
        resource_id = resource.id,
        start = %start,
        end = %end,
        periods = bookings.len(),
        "Allocated workload"
    );

    Ok(ScheduleResult {
        workload_id: workload.id,
        start,
        end,
        bookings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotplan_core::{AvailabilityEntry, EntryKey, EntryStatus};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn create_test_ledger() -> AvailabilityLedger {
        AvailabilityLedger::new(vec![
            AvailabilityEntry::new(1, 1, day(3), 650, 720),
            AvailabilityEntry::new(2, 1, day(4), 650, 720),
        ])
        .unwrap()
    }

    fn block(dates: &[NaiveDate]) -> SlotBlock {
        SlotBlock {
            resource_id: 1,
            entries: dates.iter().map(|&d| EntryKey::new(1, d)).collect(),
        }
    }

    #[test]
    fn test_allocate_single_period() {
        let mut ledger = create_test_ledger();
        let resource = Resource::new(1, 650, 50, 720);
        let w = Workload::new(7, 1, 480, day(3)).with_area(300);

        let result = allocate(&mut ledger, &w, &resource, &block(&[day(3)])).unwrap();
        assert_eq!(result.workload_id, 7);
        assert_eq!(result.start, day(3));
        assert_eq!(result.end, day(3));
        assert_eq!(result.bookings.len(), 1);
        assert_eq!(result.bookings[0].booked_area, 300);
        assert_eq!(result.bookings[0].booked_minutes, 480);

        let entry = ledger.get(&EntryKey::new(1, day(3))).unwrap();
        assert_eq!(entry.remaining_area(), 350);
        assert_eq!(entry.remaining_minutes(), 240);
        assert_eq!(entry.status(), EntryStatus::PartiallyBooked);
    }

    #[test]
    fn test_allocate_reserves_full_area_each_day() {
        let mut ledger = create_test_ledger();
        let resource = Resource::new(1, 650, 50, 720);
        let w = Workload::new(7, 1, 1000, day(3)).with_area(200);

        let result = allocate(&mut ledger, &w, &resource, &block(&[day(3), day(4)])).unwrap();
        assert_eq!(result.start, day(3));
        assert_eq!(result.end, day(4));
        let minutes: Vec<u32> = result.bookings.iter().map(|b| b.booked_minutes).collect();
        assert_eq!(minutes, vec![720, 280]);

        let first = ledger.get(&EntryKey::new(1, day(3))).unwrap();
        assert_eq!(first.remaining_area(), 450);
        assert_eq!(first.status(), EntryStatus::FullyBooked);

        let second = ledger.get(&EntryKey::new(1, day(4))).unwrap();
        assert_eq!(second.remaining_area(), 450);
        assert_eq!(second.remaining_minutes(), 440);
    }

    #[test]
    fn test_short_block_is_invariant_violation() {
        let mut ledger = create_test_ledger();
        let before = ledger.clone().into_entries();
        let resource = Resource::new(1, 650, 50, 720);
        let w = Workload::new(7, 1, 1000, day(3));

        let err = allocate(&mut ledger, &w, &resource, &block(&[day(3)])).unwrap_err();
        assert!(matches!(err, PlanError::AllocationInvariant(_)));
        assert_eq!(ledger.into_entries(), before);
    }

    #[test]
    fn test_exclusive_rechecked_at_commit() {
        let mut ledger = create_test_ledger();
        let resource = Resource::new(1, 650, 50, 720);
        ledger.commit(&EntryKey::new(1, day(4)), 0, 60).unwrap();
        let before = ledger.clone().into_entries();

        let w = Workload::new(7, 1, 1000, day(3)).exclusive();
        let err = allocate(&mut ledger, &w, &resource, &block(&[day(3), day(4)])).unwrap_err();
        assert!(matches!(err, PlanError::AllocationInvariant(_)));
        assert_eq!(ledger.into_entries(), before);
    }

    #[test]
    fn test_repeated_entry_rejected_before_commit() {
        let mut ledger =
            AvailabilityLedger::new(vec![AvailabilityEntry::new(1, 1, day(3), 650, 720)]).unwrap();
        let before = ledger.clone().into_entries();
        let resource = Resource::new(1, 650, 50, 720);
        let w = Workload::new(7, 1, 1000, day(3)).with_area(400);

        let err = allocate(&mut ledger, &w, &resource, &block(&[day(3), day(3)])).unwrap_err();
        assert!(matches!(err, PlanError::AllocationInvariant(_)));
        assert_eq!(ledger.into_entries(), before);
    }

    #[test]
    fn test_descending_block_rejected() {
        let mut ledger = create_test_ledger();
        let before = ledger.clone().into_entries();
        let resource = Resource::new(1, 650, 50, 720);
        let w = Workload::new(7, 1, 1000, day(3));

        let err = allocate(&mut ledger, &w, &resource, &block(&[day(4), day(3)])).unwrap_err();
        assert!(matches!(err, PlanError::AllocationInvariant(_)));
        assert_eq!(ledger.into_entries(), before);
    }

    #[test]
    fn test_block_for_other_resource_rejected() {
        let mut ledger = create_test_ledger();
        let resource = Resource::new(2, 650, 50, 720);
        let w = Workload::new(7, 1, 60, day(3));

        let result = allocate(&mut ledger, &w, &resource, &block(&[day(3)]));
        assert!(matches!(result, Err(PlanError::AllocationInvariant(_))));
    }
}
