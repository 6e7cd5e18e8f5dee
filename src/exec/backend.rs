// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The scheduler talks to an `Executor` instead of spawning threads itself.
//! An executor receives one batch of self-guarding jobs and must not return
//! until every job in it has returned.
//!
//! - [`SequentialExecutor`] runs the batch on the calling thread, in order.
//! - [`ConcurrentExecutor`] runs jobs on a bounded blocking pool.
//! - Tests can provide their own implementation, e.g. one that records
//!   batch sizes before delegating.

use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::ExecutorKind;

use super::concurrent::ConcurrentExecutor;
use super::sequential::SequentialExecutor;

/// One dispatched unit of work. Jobs catch their own failures.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting how a batch of jobs is executed.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run every job in `batch` and block until all of them have returned.
    fn enqueue(&self, batch: Vec<Job>) -> Result<()>;

    /// Short human-readable name, used in logs.
    fn name(&self) -> &'static str;
}

/// Build the executor selected by configuration.
pub fn executor_for(kind: ExecutorKind, max_threads: Option<usize>) -> Arc<dyn Executor> {
    match kind {
        ExecutorKind::Sequential => Arc::new(SequentialExecutor),
        ExecutorKind::Concurrent => Arc::new(ConcurrentExecutor::new(max_threads)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_for_honours_kind() {
        assert_eq!(executor_for(ExecutorKind::Sequential, None).name(), "sequential");
        assert_eq!(executor_for(ExecutorKind::Concurrent, Some(2)).name(), "concurrent");
    }
}
