// src/lib.rs

//! `opqueue`: a dependency-aware, priority-ordered task scheduler running a
//! fixed pool of workers on Tokio.
//!
//! The library entry point is [`Scheduler`]; the `opqueue` binary drives it
//! from a TOML plan (see [`config`]).

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod observe;
pub mod plan;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub use crate::dag::TaskSpec;
pub use crate::engine::Scheduler;
pub use crate::errors::{OpqueueError, TaskError};
pub use crate::exec::TaskContext;
pub use crate::observe::{Interest, SubscriptionHandle, TaskEvent};
pub use crate::types::{Priority, StateCounts, TaskId, TaskOutcome, TaskState};

use crate::cli::CliArgs;
use crate::config::{PlanFile, load_and_validate};
use crate::plan::{PlanReport, log_transitions, run_plan};

/// High-level entry point used by `main.rs`.
///
/// Loads the plan, then either prints it (`--dry-run`) or runs it to
/// completion and prints a summary. Ctrl-C drains the scheduler.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut plan = load_and_validate(&args.config)
        .with_context(|| format!("failed to load plan '{}'", args.config))?;

    if let Some(workers) = args.workers {
        plan.scheduler.workers = workers;
    }

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let scheduler = Scheduler::new(plan.scheduler.clone())?;
    let _log_subscription = log_transitions(&scheduler);

    // Ctrl-C → drain.
    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; cancelling queued tasks");
            scheduler.shutdown(true).await;
        });
    }

    let report = run_plan(&scheduler, &plan).await?;
    print_report(&report);
    Ok(())
}

fn print_dry_run(plan: &PlanFile) {
    println!("opqueue dry-run");
    println!("  scheduler.name = {}", plan.scheduler.name);
    println!("  scheduler.workers = {}", plan.scheduler.workers);
    println!(
        "  scheduler.default_priority = {:?}",
        plan.scheduler.default_priority
    );
    println!();

    println!("tasks ({}), in submission order:", plan.tasks.len());
    for name in plan.submission_order() {
        let Some(task) = plan.tasks.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      priority: {:?}", task.priority);
        println!("      duration: {:?}", task.duration);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if let Some(ref message) = task.fail {
            println!("      fail: {message}");
        }
    }

    if !plan.cancels.is_empty() {
        println!();
        println!("cancels ({}):", plan.cancels.len());
        for cancel in &plan.cancels {
            println!("  - {} at {:?}", cancel.task, cancel.at);
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_report(report: &PlanReport) {
    println!("opqueue summary");
    for (name, state) in &report.states {
        println!("  {name:<20} {state}");
    }
    if !report.stalled.is_empty() {
        println!();
        println!("stalled behind a failed dependency: {:?}", report.stalled);
    }
    let c = report.counts;
    println!();
    println!(
        "completed {} / failed {} / cancelled {} / pending {}",
        c.completed, c.failed, c.cancelled, c.pending
    );
}
