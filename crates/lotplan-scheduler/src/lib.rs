//! lotplan-scheduler: dependency-aware greedy scheduling
//!
//! This crate places workloads onto time-sliced resources:
//! - Per-group topological ordering
//! - Candidate resource ordering
//! - Read-only slot search
//! - Ledger commits for confirmed blocks

pub mod allocator;
pub mod ordering;
pub mod scheduler;
pub mod selector;
pub mod slot_finder;

pub use allocator::allocate;
pub use ordering::{order_workloads, GroupOrder};
pub use scheduler::{plan, validate_inputs, Scheduler};
pub use selector::ResourceSelector;
pub use slot_finder::{entry_fits, find_slot, Infeasibility, SlotBlock};
