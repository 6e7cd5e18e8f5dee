// src/lib.rs

//! `taskflow`: a dependency-graph task scheduler.
//!
//! Register named tasks on a [`Scheduler`], declare which tasks must finish
//! before others start, and `run()` the graph on a sequential or concurrent
//! executor. Each successful task gets a completion rank and a start/end
//! timing; failures are captured per task and abort the run.
//!
//! ```no_run
//! use taskflow::dag::{Scheduler, SchedulerState};
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.add_task("fetch", || Ok(()))?;
//! scheduler.add_task("build", || Ok(()))?;
//! scheduler.add_dependency("build", "fetch")?;
//!
//! let summary = scheduler.run()?;
//! assert_eq!(summary.state, SchedulerState::Drained);
//! # Ok::<(), taskflow::errors::TaskflowError>(())
//! ```

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

pub use dag::{Scheduler, SchedulerOptions, SchedulerState};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::RunSummary;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - CLI overrides of `[config]`
/// - scheduler construction and the run itself
/// - summary printing and optional DOT export
pub fn run(args: CliArgs) -> Result<SchedulerState> {
    let mut cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    apply_overrides(&mut cfg, &args);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(SchedulerState::Building);
    }

    let mut scheduler = Scheduler::from_config(&cfg)?;
    info!(
        tasks = scheduler.len(),
        executor = scheduler.executor_name(),
        "graph loaded"
    );

    let summary = scheduler.run()?;
    print_summary(&scheduler, &summary);

    if let Some(path) = args.export.as_ref() {
        scheduler
            .export_report()
            .write_dot(path)
            .with_context(|| format!("writing graph to {}", path.display()))?;
        info!(path = %path.display(), "graph exported");
    }

    Ok(summary.state)
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(kind) = args.executor {
        cfg.config.executor = kind;
    }
    if let Some(max) = args.max_threads {
        cfg.config.max_threads = Some(max.max(1));
    }
    if args.cancel_on_failure {
        cfg.config.cancel_on_failure = true;
    }
}

fn print_summary(scheduler: &Scheduler, summary: &RunSummary) {
    println!(
        "run {} after {} batch(es): {} completed, {} failed, {} not executed",
        summary.state, summary.batches, summary.completed, summary.failed, summary.pending
    );
    print!("{}", scheduler.export_report());

    let errors = scheduler.errors();
    if !errors.is_empty() {
        println!("errors ({}):", errors.len());
        for e in errors {
            println!("  - {e}");
        }
    }
}

/// Simple dry-run output: print settings, tasks, deps and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskflow dry-run");
    println!("  config.executor = {}", cfg.config.executor);
    match cfg.config.max_threads {
        Some(n) => println!("  config.max_threads = {n}"),
        None => println!("  config.max_threads = (batch size)"),
    }
    println!("  config.cancel_on_failure = {}", cfg.config.cancel_on_failure);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if let Some(ref cmd) = task.cmd {
            println!("      cmd: {cmd}");
        }
        if let Some(ms) = task.sleep_ms {
            println!("      sleep_ms: {ms}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
    }

    debug!("dry-run complete (no execution)");
}
