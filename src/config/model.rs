// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::SchedulerOptions;
use crate::types::ExecutorKind;

/// Configuration exactly as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// executor = "concurrent"
/// max_threads = 4
/// cancel_on_failure = false
///
/// [task.fetch]
/// cmd = "echo fetching"
///
/// [task.build]
/// cmd = "echo building"
/// sleep_ms = 50
/// after = ["fetch"]
/// ```
///
/// All sections are optional at parse time; validation requires at least
/// one task.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A configuration that passed validation (see `config::validate`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Wrap already-validated parts. Prefer `ConfigFile::try_from(raw)`.
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigSection {
    /// `"sequential"` or `"concurrent"` (default).
    #[serde(default)]
    pub executor: ExecutorKind,

    /// Upper bound on concurrently running jobs for the concurrent executor.
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Stop every task that has not started yet once one task fails.
    #[serde(default)]
    pub cancel_on_failure: bool,
}

impl ConfigSection {
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            executor: self.executor,
            max_threads: self.max_threads,
            cancel_on_failure: self.cancel_on_failure,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Shell command to execute.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Simulated work, in milliseconds, performed before `cmd`.
    #[serde(default)]
    pub sleep_ms: Option<u64>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,
}

impl TaskConfig {
    pub fn sleep(&self) -> Option<Duration> {
        self.sleep_ms.map(Duration::from_millis)
    }
}
