// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ExecutorKind;

/// Command-line arguments for `taskflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskflow",
    version,
    about = "Run a dependency graph of tasks described in a TOML file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskflow.toml")]
    pub config: PathBuf,

    /// Override `[config].executor` (sequential or concurrent).
    #[arg(long, value_name = "KIND")]
    pub executor: Option<ExecutorKind>,

    /// Override `[config].max_threads`.
    #[arg(long, value_name = "N")]
    pub max_threads: Option<usize>,

    /// Stop every task that has not started once one task fails.
    #[arg(long)]
    pub cancel_on_failure: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't execute any task.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the annotated graph as Graphviz DOT to this path after the run.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
