//! lotplan CLI
//!
//! Command-line interface for running the scheduler over a problem file.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// lotplan - greedy scheduler for capacity-bounded, time-sliced resources
#[derive(Parser, Debug)]
#[command(name = "lotplan")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Planner configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Schedule every workload and print the report
    Run {
        /// Problem file (.json or .toml)
        problem: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the per-group processing order
    Order {
        /// Problem file (.json or .toml)
        problem: PathBuf,
    },

    /// Validate and order a problem without allocating
    Check {
        /// Problem file (.json or .toml)
        problem: PathBuf,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;

    // Flag wins over the config file; verbose wins over both
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        parse_level(cli.log_level.as_deref().unwrap_or(config.logging.level.as_str()))
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.command {
        Commands::Run { problem, json } => {
            commands::run(&config, &problem, json)?;
        }
        Commands::Order { problem } => {
            commands::order(&config, &problem)?;
        }
        Commands::Check { problem } => {
            commands::check(&config, &problem)?;
        }
    }

    Ok(())
}
