//! Configuration types for lotplan

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PlanError, PlanResult};
use crate::ledger::{AvailabilityEntry, AvailabilityLedger};
use crate::model::{Resource, Workload};

/// Options controlling a scheduling run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingOptions {
    /// Reserved for concurrent occupation of several resources; rejected when set
    pub enable_parallel_execution: bool,
    /// Treat missing dependencies, cycles and unscheduled dependencies as fatal
    pub strict_dependency_mode: bool,
    /// Try the resource with the most remaining minutes first
    pub prefer_least_loaded_resource: bool,
    /// Candidate resource ordering
    pub resource_policy: ResourcePolicy,
    /// Slot search variant
    pub slot_search: SlotSearch,
    /// What to do when a workload fits on no resource
    pub on_unschedulable: FailurePolicy,
}

impl Default for SchedulingOptions {
    fn default() -> Self {
        Self {
            enable_parallel_execution: false,
            strict_dependency_mode: true,
            prefer_least_loaded_resource: false,
            resource_policy: ResourcePolicy::ById,
            slot_search: SlotSearch::Lenient,
            on_unschedulable: FailurePolicy::Abort,
        }
    }
}

impl SchedulingOptions {
    /// Reject option combinations the scheduler does not support
    pub fn validate(&self) -> PlanResult<()> {
        if self.enable_parallel_execution {
            return Err(PlanError::InvalidInput(
                "enable_parallel_execution is not supported: a workload occupies exactly one resource at a time".to_string(),
            ));
        }
        if self.prefer_least_loaded_resource
            && !matches!(
                self.resource_policy,
                ResourcePolicy::ById | ResourcePolicy::LeastLoaded
            )
        {
            return Err(PlanError::InvalidInput(format!(
                "prefer_least_loaded_resource conflicts with resource_policy '{}'",
                self.resource_policy
            )));
        }
        Ok(())
    }

    /// Resource ordering actually used for a run
    pub fn effective_policy(&self) -> ResourcePolicy {
        if self.prefer_least_loaded_resource {
            ResourcePolicy::LeastLoaded
        } else {
            self.resource_policy
        }
    }
}

/// Candidate resource ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourcePolicy {
    /// Ascending resource id
    ById,
    /// Most remaining minutes across the whole ledger first
    LeastLoaded,
    /// Smallest maximum area first
    BestFitArea,
    /// Smallest maximum lift weight first
    BestFitLift,
}

impl std::fmt::Display for ResourcePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourcePolicy::ById => write!(f, "by-id"),
            ResourcePolicy::LeastLoaded => write!(f, "least-loaded"),
            ResourcePolicy::BestFitArea => write!(f, "best-fit-area"),
            ResourcePolicy::BestFitLift => write!(f, "best-fit-lift"),
        }
    }
}

/// Slot search variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSearch {
    /// Skip infeasible periods and keep accumulating from the next one
    Lenient,
    /// Only calendar-consecutive periods; restart after any gap
    Contiguous,
}

/// Behaviour when a workload cannot be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole run
    Abort,
    /// Record the workload as unscheduled and carry on
    Continue,
}

/// Planner configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Default scheduling options
    pub scheduling: SchedulingOptions,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl PlannerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlanError::Config(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| PlanError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Batch input document (TOML or JSON)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemFile {
    /// Options for this problem; defaults apply when absent
    pub options: Option<SchedulingOptions>,
    /// Workloads to schedule
    pub workloads: Option<Vec<Workload>>,
    /// Resources to schedule on
    pub resources: Option<Vec<Resource>>,
    /// Ledger entries
    pub availability: Option<Vec<AvailabilityEntry>>,
}

/// Validated batch input, ready for a scheduling run
#[derive(Debug, Clone)]
pub struct Problem {
    /// Options for the run
    pub options: SchedulingOptions,
    /// Workloads to schedule
    pub workloads: Vec<Workload>,
    /// Resources to schedule on
    pub resources: Vec<Resource>,
    /// Capacity ledger
    pub ledger: AvailabilityLedger,
}

impl ProblemFile {
    /// Load a problem file; `.json` is parsed as JSON, anything else as TOML
    pub fn from_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// Check every collection is present and build the ledger
    ///
    /// `fallback` supplies the options when the file carries none.
    pub fn into_problem(self, fallback: &SchedulingOptions) -> PlanResult<Problem> {
        let workloads = self
            .workloads
            .ok_or_else(|| PlanError::InvalidInput("workloads collection is missing".to_string()))?;
        let resources = self
            .resources
            .ok_or_else(|| PlanError::InvalidInput("resources collection is missing".to_string()))?;
        let availability = self.availability.ok_or_else(|| {
            PlanError::InvalidInput("availability collection is missing".to_string())
        })?;

        Ok(Problem {
            options: self.options.unwrap_or_else(|| fallback.clone()),
            workloads,
            resources,
            ledger: AvailabilityLedger::new(availability)?,
        })
    }
}
