//! lotplan-core: Core types for the lotplan scheduler
//!
//! This crate provides the fundamental types used throughout lotplan:
//! - Workload, resource and booking records
//! - The availability ledger and its single mutation path
//! - Scheduling options and file formats
//! - Error handling

pub mod config;
pub mod error;
pub mod ledger;
pub mod model;

pub use config::*;
pub use error::*;
pub use ledger::*;
pub use model::*;
