// src/engine/ledger.rs

//! Failure list, timing map and completion-rank counter.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use super::clock::Timing;
use super::lock;
use crate::types::TaskName;

/// What kind of failure a task reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The body returned an error.
    Error,
    /// The body panicked.
    Panic,
    /// A dependency reference could not be resolved.
    Dependency,
}

/// One captured task failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskName,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Error => write!(f, "{} failed: {}", self.task, self.message),
            FailureKind::Panic => write!(f, "{} panicked: {}", self.task, self.message),
            FailureKind::Dependency => {
                write!(f, "{} has an invalid dependency: {}", self.task, self.message)
            }
        }
    }
}

/// Shared, concurrently-written record of a run.
#[derive(Debug, Default)]
pub struct RunLedger {
    failures: Mutex<Vec<TaskFailure>>,
    timings: Mutex<BTreeMap<TaskName, Timing>>,
    next_rank: AtomicU32,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next completion rank (fetch-and-increment).
    pub fn next_rank(&self) -> u32 {
        self.next_rank.fetch_add(1, Ordering::AcqRel)
    }

    /// Number of ranks handed out so far.
    pub fn ranks_issued(&self) -> u32 {
        self.next_rank.load(Ordering::Acquire)
    }

    pub fn push_failure(&self, failure: TaskFailure) {
        lock(&self.failures).push(failure);
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        lock(&self.failures).clone()
    }

    pub fn has_failures(&self) -> bool {
        !lock(&self.failures).is_empty()
    }

    pub fn record_timing(&self, task: &str, timing: Timing) {
        lock(&self.timings).insert(task.to_string(), timing);
    }

    /// Drop any timing entry for `task` (used when a body fails).
    pub fn forget_timing(&self, task: &str) {
        lock(&self.timings).remove(task);
    }

    pub fn timing_of(&self, task: &str) -> Option<Timing> {
        lock(&self.timings).get(task).copied()
    }

    pub fn timings(&self) -> BTreeMap<TaskName, Timing> {
        lock(&self.timings).clone()
    }
}
