//! CLI commands implementation

use anyhow::{Context, Result};
use lotplan_core::{PlannerConfig, Problem, ProblemFile, ScheduleReport, Workload};
use lotplan_scheduler::{order_workloads, plan, validate_inputs, Scheduler};
use std::path::Path;

/// Load the planner config, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    match path {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PlannerConfig::default()),
    }
}

/// Load a problem file, filling in options from the config
pub fn load_problem(config: &PlannerConfig, path: &Path) -> Result<Problem> {
    let file = ProblemFile::from_file(path)
        .with_context(|| format!("Failed to read problem {}", path.display()))?;
    Ok(file.into_problem(&config.scheduling)?)
}

/// Schedule a problem and print the report
pub fn run(config: &PlannerConfig, path: &Path, json: bool) -> Result<()> {
    let problem = load_problem(config, path)?;
    let workloads = problem.workloads.clone();
    let (report, _ledger) = plan(problem)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&workloads, &report);
    }

    Ok(())
}

/// Print the per-group processing order
pub fn order(config: &PlannerConfig, path: &Path) -> Result<()> {
    let problem = load_problem(config, path)?;
    Scheduler::new(problem.options.clone())?;
    validate_inputs(&problem.workloads, &problem.resources, &problem.ledger)?;
    let groups = order_workloads(&problem.workloads, problem.options.strict_dependency_mode)?;

    if groups.is_empty() {
        println!("No workloads found");
        return Ok(());
    }

    println!("{:<10} ORDER", "GROUP");
    println!("{}", "-".repeat(60));
    for group in groups {
        let ids: Vec<String> = group.workload_ids.iter().map(|id| id.to_string()).collect();
        println!("{:<10} {}", group.group_id, ids.join(" -> "));
    }

    Ok(())
}

/// Validate a problem without allocating anything
pub fn check(config: &PlannerConfig, path: &Path) -> Result<()> {
    let problem = load_problem(config, path)?;
    Scheduler::new(problem.options.clone())?;
    validate_inputs(&problem.workloads, &problem.resources, &problem.ledger)?;
    let groups = order_workloads(&problem.workloads, problem.options.strict_dependency_mode)?;

    println!("Problem {} is valid", path.display());
    println!("  Workloads: {}", problem.workloads.len());
    println!("  Groups: {}", groups.len());
    println!("  Resources: {}", problem.resources.len());
    println!("  Availability entries: {}", problem.ledger.len());

    Ok(())
}

fn print_report(workloads: &[Workload], report: &ScheduleReport) {
    if report.results.is_empty() && report.unscheduled.is_empty() {
        println!("No workloads scheduled");
        return;
    }

    if !report.results.is_empty() {
        println!(
            "{:<10} {:<8} {:<10} {:<12} {:<12} {:<8} {:<10}",
            "WORKLOAD", "GROUP", "RESOURCE", "START", "END", "PERIODS", "MINUTES"
        );
        println!("{}", "-".repeat(76));
        for result in &report.results {
            let group = workloads
                .iter()
                .find(|w| w.id == result.workload_id)
                .map(|w| w.group_id.to_string())
                .unwrap_or_else(|| "-".to_string());
            let resource = result
                .resource_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<10} {:<8} {:<10} {:<12} {:<12} {:<8} {:<10}",
                result.workload_id,
                group,
                resource,
                result.start,
                result.end,
                result.bookings.len(),
                result.booked_minutes()
            );
        }
    }

    if !report.unscheduled.is_empty() {
        println!("\nUnscheduled:");
        for skipped in &report.unscheduled {
            println!(
                "  Workload {} (group {}, from {}): {}",
                skipped.workload_id, skipped.group_id, skipped.earliest, skipped.reason
            );
        }
    }
}
