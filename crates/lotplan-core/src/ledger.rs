//! Availability ledger: per-resource, per-period remaining capacity
//!
//! The ledger is the only state a scheduling run mutates. Entries can only
//! be changed through [`AvailabilityLedger::commit`], and an entry's
//! [`EntryStatus`] is always derived from its remaining/total pair.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use tracing::trace;

use crate::error::{PlanError, PlanResult};
use crate::model::{EntryId, ResourceId};

/// Booking status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    /// Nothing booked yet
    Available,
    /// Some capacity consumed, both dimensions still above zero
    PartiallyBooked,
    /// Remaining area or remaining minutes is zero
    FullyBooked,
}

impl EntryStatus {
    fn derive(remaining_area: u32, total_area: u32, remaining_minutes: u32, total_minutes: u32) -> Self {
        if remaining_area == 0 || remaining_minutes == 0 {
            EntryStatus::FullyBooked
        } else if remaining_area < total_area || remaining_minutes < total_minutes {
            EntryStatus::PartiallyBooked
        } else {
            EntryStatus::Available
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Available => write!(f, "Available"),
            EntryStatus::PartiallyBooked => write!(f, "Partially Booked"),
            EntryStatus::FullyBooked => write!(f, "Fully Booked"),
        }
    }
}

/// One resource's capacity state for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord")]
pub struct AvailabilityEntry {
    id: EntryId,
    resource_id: ResourceId,
    date: NaiveDate,
    total_area: u32,
    total_minutes: u32,
    remaining_area: u32,
    remaining_minutes: u32,
}

/// Wire form of an entry; remaining capacity defaults to the totals
#[derive(Deserialize)]
struct EntryRecord {
    id: EntryId,
    resource_id: ResourceId,
    date: NaiveDate,
    total_area: u32,
    total_minutes: u32,
    remaining_area: Option<u32>,
    remaining_minutes: Option<u32>,
}

impl TryFrom<EntryRecord> for AvailabilityEntry {
    type Error = PlanError;

    fn try_from(record: EntryRecord) -> PlanResult<Self> {
        let entry = AvailabilityEntry::new(
            record.id,
            record.resource_id,
            record.date,
            record.total_area,
            record.total_minutes,
        );
        let area = record.remaining_area.unwrap_or(record.total_area);
        let minutes = record.remaining_minutes.unwrap_or(record.total_minutes);
        entry.with_remaining(area, minutes)
    }
}

impl AvailabilityEntry {
    /// Create an entry with its full capacity remaining
    pub fn new(
        id: EntryId,
        resource_id: ResourceId,
        date: NaiveDate,
        total_area: u32,
        total_minutes: u32,
    ) -> Self {
        Self {
            id,
            resource_id,
            date,
            total_area,
            total_minutes,
            remaining_area: total_area,
            remaining_minutes: total_minutes,
        }
    }

    /// Seed pre-booked capacity; remaining values may not exceed the totals
    pub fn with_remaining(mut self, remaining_area: u32, remaining_minutes: u32) -> PlanResult<Self> {
        if remaining_area > self.total_area || remaining_minutes > self.total_minutes {
            return Err(PlanError::InvalidInput(format!(
                "Availability {} remaining capacity ({} area, {} min) exceeds its totals ({} area, {} min)",
                self.id, remaining_area, remaining_minutes, self.total_area, self.total_minutes
            )));
        }
        self.remaining_area = remaining_area;
        self.remaining_minutes = remaining_minutes;
        Ok(self)
    }

    /// Entry identifier
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Resource owning this entry
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Period covered by this entry
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Ledger key of this entry
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.resource_id, self.date)
    }

    /// Total area of the period
    pub fn total_area(&self) -> u32 {
        self.total_area
    }

    /// Total minutes of the period
    pub fn total_minutes(&self) -> u32 {
        self.total_minutes
    }

    /// Area not yet reserved
    pub fn remaining_area(&self) -> u32 {
        self.remaining_area
    }

    /// Minutes not yet consumed
    pub fn remaining_minutes(&self) -> u32 {
        self.remaining_minutes
    }

    /// Whether no booking has touched this entry's minutes
    pub fn is_untouched(&self) -> bool {
        self.remaining_minutes == self.total_minutes
    }

    /// Current status, derived from remaining and total capacity
    pub fn status(&self) -> EntryStatus {
        EntryStatus::derive(
            self.remaining_area,
            self.total_area,
            self.remaining_minutes,
            self.total_minutes,
        )
    }
}

/// Ledger key: one resource on one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    /// Resource identifier
    pub resource_id: ResourceId,
    /// Period
    pub date: NaiveDate,
}

impl EntryKey {
    /// Create a new key
    pub fn new(resource_id: ResourceId, date: NaiveDate) -> Self {
        Self { resource_id, date }
    }
}

/// Mutable capacity state for a scheduling run
#[derive(Debug, Clone, Default)]
pub struct AvailabilityLedger {
    entries: BTreeMap<EntryKey, AvailabilityEntry>,
}

impl AvailabilityLedger {
    /// Build a ledger, rejecting duplicate entry ids and duplicate (resource, date) pairs
    pub fn new(entries: impl IntoIterator<Item = AvailabilityEntry>) -> PlanResult<Self> {
        let mut map = BTreeMap::new();
        let mut ids = HashSet::new();

        for entry in entries {
            if !ids.insert(entry.id) {
                return Err(PlanError::InvalidInput(format!(
                    "Duplicate availability ID: {}",
                    entry.id
                )));
            }
            let key = entry.key();
            if let Some(existing) = map.insert(key, entry) {
                return Err(PlanError::InvalidInput(format!(
                    "Availability {} duplicates resource {} on {}",
                    existing.id, key.resource_id, key.date
                )));
            }
        }

        Ok(Self { entries: map })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up one entry
    pub fn get(&self, key: &EntryKey) -> Option<&AvailabilityEntry> {
        self.entries.get(key)
    }

    /// All entries, ordered by resource then date
    pub fn iter(&self) -> impl Iterator<Item = &AvailabilityEntry> {
        self.entries.values()
    }

    /// Entries of one resource on or after `on_or_after`, ascending by date
    pub fn entries_for(
        &self,
        resource_id: ResourceId,
        on_or_after: NaiveDate,
    ) -> impl Iterator<Item = &AvailabilityEntry> {
        self.entries
            .range((
                Bound::Included(EntryKey::new(resource_id, on_or_after)),
                Bound::Included(EntryKey::new(resource_id, NaiveDate::MAX)),
            ))
            .map(|(_, entry)| entry)
    }

    /// Remaining minutes summed over a resource's whole ledger
    pub fn remaining_minutes(&self, resource_id: ResourceId) -> u64 {
        self.entries_for(resource_id, NaiveDate::MIN)
            .map(|e| u64::from(e.remaining_minutes))
            .sum()
    }

    /// Consume capacity from one entry and return its new status
    ///
    /// This is the only write path into the ledger. It never lets a
    /// remaining value drop below zero.
    pub fn commit(&mut self, key: &EntryKey, area: u32, minutes: u32) -> PlanResult<EntryStatus> {
        let entry = self.entries.get_mut(key).ok_or_else(|| {
            PlanError::AllocationInvariant(format!(
                "No availability for resource {} on {}",
                key.resource_id, key.date
            ))
        })?;

        let remaining_area = entry.remaining_area.checked_sub(area);
        let remaining_minutes = entry.remaining_minutes.checked_sub(minutes);
        let (Some(remaining_area), Some(remaining_minutes)) = (remaining_area, remaining_minutes)
        else {
            return Err(PlanError::AllocationInvariant(format!(
                "Insufficient capacity on availability {} ({}): requested {} area / {} min, remaining {} area / {} min",
                entry.id, entry.date, area, minutes, entry.remaining_area, entry.remaining_minutes
            )));
        };

        entry.remaining_area = remaining_area;
        entry.remaining_minutes = remaining_minutes;
        let status = entry.status();

        trace!(
            availability_id = entry.id,
            resource_id = key.resource_id,
            date = %key.date,
            remaining_area,
            remaining_minutes,
            status = %status,
            "Committed capacity"
        );

        Ok(status)
    }

    /// Consume the ledger, returning its entries ordered by resource then date
    pub fn into_entries(self) -> Vec<AvailabilityEntry> {
        self.entries.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn sample_ledger() -> AvailabilityLedger {
        AvailabilityLedger::new(vec![
            AvailabilityEntry::new(3, 1, day(5), 650, 720),
            AvailabilityEntry::new(1, 1, day(3), 650, 720),
            AvailabilityEntry::new(2, 1, day(4), 650, 720),
            AvailabilityEntry::new(4, 2, day(3), 200, 480),
        ])
        .unwrap()
    }

    #[test]
    fn test_status_rule() {
        let entry = AvailabilityEntry::new(1, 1, day(3), 650, 720);
        assert_eq!(entry.status(), EntryStatus::Available);

        let partial = entry.clone().with_remaining(350, 720).unwrap();
        assert_eq!(partial.status(), EntryStatus::PartiallyBooked);

        let no_area = entry.clone().with_remaining(0, 720).unwrap();
        assert_eq!(no_area.status(), EntryStatus::FullyBooked);

        let no_minutes = entry.with_remaining(650, 0).unwrap();
        assert_eq!(no_minutes.status(), EntryStatus::FullyBooked);
    }

    #[test]
    fn test_with_remaining_rejects_overflow() {
        let entry = AvailabilityEntry::new(1, 1, day(3), 650, 720);
        let result = entry.with_remaining(700, 720);
        assert!(matches!(result, Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_entries_for_orders_by_date() {
        let ledger = sample_ledger();

        let ids: Vec<EntryId> = ledger.entries_for(1, day(4)).map(|e| e.id()).collect();
        assert_eq!(ids, vec![2, 3]);

        let all: Vec<EntryId> = ledger.entries_for(1, day(1)).map(|e| e.id()).collect();
        assert_eq!(all, vec![1, 2, 3]);

        assert_eq!(ledger.entries_for(2, day(4)).count(), 0);
        assert_eq!(ledger.entries_for(9, day(1)).count(), 0);
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let dup_id = AvailabilityLedger::new(vec![
            AvailabilityEntry::new(1, 1, day(3), 650, 720),
            AvailabilityEntry::new(1, 1, day(4), 650, 720),
        ]);
        assert!(matches!(dup_id, Err(PlanError::InvalidInput(_))));

        let dup_key = AvailabilityLedger::new(vec![
            AvailabilityEntry::new(1, 1, day(3), 650, 720),
            AvailabilityEntry::new(2, 1, day(3), 650, 720),
        ]);
        assert!(matches!(dup_key, Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_commit_updates_status() {
        let mut ledger = sample_ledger();
        let key = EntryKey::new(1, day(3));

        let status = ledger.commit(&key, 300, 480).unwrap();
        assert_eq!(status, EntryStatus::PartiallyBooked);
        assert_eq!(ledger.get(&key).unwrap().remaining_area(), 350);
        assert_eq!(ledger.get(&key).unwrap().remaining_minutes(), 240);

        let status = ledger.commit(&key, 300, 240).unwrap();
        assert_eq!(status, EntryStatus::FullyBooked);
    }

    #[test]
    fn test_commit_never_goes_negative() {
        let mut ledger = sample_ledger();
        let key = EntryKey::new(2, day(3));

        let result = ledger.commit(&key, 300, 60);
        assert!(matches!(result, Err(PlanError::AllocationInvariant(_))));
        assert_eq!(ledger.get(&key).unwrap().remaining_area(), 200);
        assert_eq!(ledger.get(&key).unwrap().remaining_minutes(), 480);

        let missing = ledger.commit(&EntryKey::new(9, day(3)), 1, 1);
        assert!(matches!(missing, Err(PlanError::AllocationInvariant(_))));
    }

    #[test]
    fn test_remaining_minutes_per_resource() {
        let mut ledger = sample_ledger();
        assert_eq!(ledger.remaining_minutes(1), 2160);
        assert_eq!(ledger.remaining_minutes(2), 480);

        ledger.commit(&EntryKey::new(1, day(4)), 0, 720).unwrap();
        assert_eq!(ledger.remaining_minutes(1), 1440);
    }

    #[test]
    fn test_entry_deserialize_defaults_and_checks() {
        let entry: AvailabilityEntry = serde_json::from_str(
            r#"{"id": 1, "resource_id": 1, "date": "2025-03-03", "total_area": 650, "total_minutes": 720}"#,
        )
        .unwrap();
        assert_eq!(entry.remaining_area(), 650);
        assert_eq!(entry.remaining_minutes(), 720);

        let seeded: AvailabilityEntry = serde_json::from_str(
            r#"{"id": 1, "resource_id": 1, "date": "2025-03-03", "total_area": 650, "total_minutes": 720, "remaining_minutes": 240}"#,
        )
        .unwrap();
        assert_eq!(seeded.status(), EntryStatus::PartiallyBooked);

        let invalid = serde_json::from_str::<AvailabilityEntry>(
            r#"{"id": 1, "resource_id": 1, "date": "2025-03-03", "total_area": 650, "total_minutes": 720, "remaining_area": 900}"#,
        );
        assert!(invalid.is_err());
    }
}
