//! Error types for lotplan

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{GroupId, WorkloadId};

/// Main error type for lotplan
#[derive(Error, Debug)]
pub enum PlanError {
    /// Structurally invalid input, rejected before any ordering or search
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A workload references a dependency id that exists nowhere
    #[error("Workload {workload} depends on missing workload id {dependency}")]
    DependencyNotFound {
        /// Workload declaring the dependency
        workload: WorkloadId,
        /// Dependency id that could not be resolved
        dependency: WorkloadId,
    },

    /// A group's dependency subgraph cannot be fully ordered
    #[error("Cycle detected in group {group}. Involved workload ids: {}", join_ids(.workloads))]
    CycleDetected {
        /// Group containing the cycle
        group: GroupId,
        /// Every workload id still blocked, ascending
        workloads: Vec<WorkloadId>,
    },

    /// No candidate resource could host the workload
    #[error(
        "Unable to schedule workload {workload} (group {group}) starting on/after {earliest}: {reason}"
    )]
    ResourceUnschedulable {
        /// Workload that could not be placed
        workload: WorkloadId,
        /// Group of the workload
        group: GroupId,
        /// Earliest date that was tried
        earliest: NaiveDate,
        /// Last per-resource infeasibility encountered
        reason: String,
    },

    /// A dependency has no recorded result when its dependent is reached
    #[error("Workload {workload} depends on {dependency} which is not scheduled yet")]
    DependencyNotScheduled {
        /// Workload being scheduled
        workload: WorkloadId,
        /// Dependency without a result
        dependency: WorkloadId,
    },

    /// Commit-time consistency check failed despite a confirmed search
    #[error("Allocation invariant violated: {0}")]
    AllocationInvariant(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for lotplan operations
pub type PlanResult<T> = Result<T, PlanError>;

/// Stage of a scheduling run at which an error was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Input and option checks
    Validation,
    /// Grouping and topological ordering
    Ordering,
    /// Resource search and commit
    Allocation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Validation => write!(f, "validation"),
            Stage::Ordering => write!(f, "ordering"),
            Stage::Allocation => write!(f, "allocation"),
        }
    }
}

impl PlanError {
    /// Stage of the run that produced this error, if it came from a run at all
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PlanError::InvalidInput(_) => Some(Stage::Validation),
            PlanError::DependencyNotFound { .. } | PlanError::CycleDetected { .. } => {
                Some(Stage::Ordering)
            }
            PlanError::ResourceUnschedulable { .. }
            | PlanError::DependencyNotScheduled { .. }
            | PlanError::AllocationInvariant(_) => Some(Stage::Allocation),
            PlanError::Config(_) | PlanError::Io(_) | PlanError::Serialization(_) => None,
        }
    }
}

fn join_ids(ids: &[WorkloadId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PlanError {
    fn from(err: toml::de::Error) -> Self {
        PlanError::Config(err.to_string())
    }
}
