//! Candidate resource ordering

use lotplan_core::{AvailabilityLedger, Resource, ResourcePolicy};
use std::cmp::Reverse;
use tracing::debug;

/// Orders candidate resources for a workload
#[derive(Debug, Clone, Copy)]
pub struct ResourceSelector {
    /// Ordering policy
    policy: ResourcePolicy,
}

impl ResourceSelector {
    /// Create a new selector
    pub fn new(policy: ResourcePolicy) -> Self {
        Self { policy }
    }

    /// Resources in the order they should be tried
    ///
    /// Every policy falls back to ascending id, so ties never depend on
    /// input order.
    pub fn order<'a>(
        &self,
        resources: &'a [Resource],
        ledger: &AvailabilityLedger,
    ) -> Vec<&'a Resource> {
        let mut ordered: Vec<&Resource> = resources.iter().collect();
        ordered.sort_by_key(|r| r.id);

        match self.policy {
            ResourcePolicy::ById => {}
            ResourcePolicy::LeastLoaded => {
                ordered.sort_by_cached_key(|r| (Reverse(ledger.remaining_minutes(r.id)), r.id));
            }
            ResourcePolicy::BestFitArea => ordered.sort_by_key(|r| (r.max_area, r.id)),
            ResourcePolicy::BestFitLift => ordered.sort_by_key(|r| (r.max_lift_weight, r.id)),
        }

        debug!(
            policy = %self.policy,
            order = ?ordered.iter().map(|r| r.id).collect::<Vec<_>>(),
            "Ordered candidate resources"
        );

        ordered
    }

    /// Get the current policy
    pub fn policy(&self) -> ResourcePolicy {
        self.policy
    }
}

impl Default for ResourceSelector {
    fn default() -> Self {
        Self::new(ResourcePolicy::ById)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotplan_core::{AvailabilityEntry, EntryKey};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn create_test_resources() -> Vec<Resource> {
        vec![
            Resource::new(3, 400, 20, 720),
            Resource::new(1, 650, 50, 720),
            Resource::new(2, 200, 30, 720),
        ]
    }

    fn ids(ordered: &[&Resource]) -> Vec<u32> {
        ordered.iter().map(|r| r.id).collect()
    }

    fn create_test_ledger() -> AvailabilityLedger {
        AvailabilityLedger::new(vec![
            AvailabilityEntry::new(1, 1, day(3), 650, 720),
            AvailabilityEntry::new(2, 2, day(3), 200, 720),
            AvailabilityEntry::new(3, 2, day(4), 200, 720),
            AvailabilityEntry::new(4, 3, day(3), 400, 720),
        ])
        .unwrap()
    }

    #[test]
    fn test_by_id() {
        let selector = ResourceSelector::default();
        let resources = create_test_resources();
        let ledger = create_test_ledger();

        assert_eq!(ids(&selector.order(&resources, &ledger)), vec![1, 2, 3]);
    }

    #[test]
    fn test_least_loaded_prefers_most_remaining_minutes() {
        let selector = ResourceSelector::new(ResourcePolicy::LeastLoaded);
        let resources = create_test_resources();
        let mut ledger = create_test_ledger();

        // Resource 2 has two free days, resources 1 and 3 tie on one
        assert_eq!(ids(&selector.order(&resources, &ledger)), vec![2, 1, 3]);

        ledger.commit(&EntryKey::new(1, day(3)), 0, 600).unwrap();
        assert_eq!(ids(&selector.order(&resources, &ledger)), vec![2, 3, 1]);
    }

    #[test]
    fn test_best_fit_policies() {
        let resources = create_test_resources();
        let ledger = create_test_ledger();

        let area = ResourceSelector::new(ResourcePolicy::BestFitArea);
        assert_eq!(ids(&area.order(&resources, &ledger)), vec![2, 3, 1]);

        let lift = ResourceSelector::new(ResourcePolicy::BestFitLift);
        assert_eq!(ids(&lift.order(&resources, &ledger)), vec![3, 2, 1]);
    }

    #[test]
    fn test_empty_resources() {
        let selector = ResourceSelector::default();
        let ledger = AvailabilityLedger::default();

        assert!(selector.order(&[], &ledger).is_empty());
    }
}
