use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Which executor variant dispatches a batch.
///
/// - `Sequential`: every job runs on the calling thread, in batch order.
/// - `Concurrent`: jobs run on a bounded blocking pool and the batch is
///   joined before control returns (default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Sequential,
    Concurrent,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Concurrent
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Sequential => f.write_str("sequential"),
            ExecutorKind::Concurrent => f.write_str("concurrent"),
        }
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "serial" => Ok(ExecutorKind::Sequential),
            "concurrent" | "parallel" | "async" => Ok(ExecutorKind::Concurrent),
            other => Err(format!(
                "invalid executor: {other} (expected \"sequential\" or \"concurrent\")"
            )),
        }
    }
}
