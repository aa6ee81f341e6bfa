// src/cli.rs

//! Command-line arguments for the plan runner.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `opqueue`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "opqueue",
    version,
    about = "Run a TOML plan of dependent, prioritised tasks on a fixed worker pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Opqueue.toml")]
    pub config: String,

    /// Override `[scheduler].workers` from the plan.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OPQUEUE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the plan and print it in submission order without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
