// src/exec/concurrent.rs

//! Thread-pool executor driven through Tokio's blocking pool.
//!
//! Jobs block (they wait on their dependencies and run synchronous bodies),
//! so each one goes through `spawn_blocking` rather than onto the async
//! workers. The blocking pool is sized to the batch, capped by `max_threads`
//! or, when unset, by a multiple of the available parallelism. The pool
//! hands out queued jobs in FIFO order; the scheduler submits batches
//! dependencies-first, so a capped pool still drains.
//!
//! A batch may be enqueued from a thread that already carries a Tokio
//! context (a task body running its own scheduler, or user
//! `spawn_blocking` code). Such a thread must not build or drop a runtime,
//! so the batch is driven from a scoped helper thread instead.

use std::num::NonZeroUsize;
use std::thread;

use tokio::runtime::{Builder, Handle};
use tracing::{debug, warn};

use crate::errors::{Result, TaskflowError};

use super::backend::{Executor, Job};

/// Blocking workers per available core when `max_threads` is unset.
const THREADS_PER_CORE: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ConcurrentExecutor {
    max_threads: Option<usize>,
}

impl ConcurrentExecutor {
    pub fn new(max_threads: Option<usize>) -> Self {
        Self { max_threads }
    }

    pub fn max_threads(&self) -> Option<usize> {
        self.max_threads
    }

    /// Cap applied when `max_threads` is unset.
    pub fn default_cap() -> usize {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            * THREADS_PER_CORE
    }

    /// Number of blocking workers used for a batch of `jobs`.
    pub fn pool_size(&self, jobs: usize) -> usize {
        let cap = self.max_threads.unwrap_or_else(Self::default_cap);
        jobs.max(1).min(cap.max(1))
    }

    fn dispatch(&self, batch: Vec<Job>) -> Result<usize> {
        let pool = self.pool_size(batch.len());
        debug!(jobs = batch.len(), pool, "concurrent executor dispatching batch");

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(pool)
            .thread_name("taskflow-worker")
            .build()?;

        Ok(runtime.block_on(async move {
            let handles: Vec<_> = batch.into_iter().map(tokio::task::spawn_blocking).collect();

            let mut lost = 0usize;
            for handle in handles {
                if let Err(err) = handle.await {
                    warn!(error = %err, "job did not return normally");
                    lost += 1;
                }
            }
            lost
        }))
    }
}

impl Executor for ConcurrentExecutor {
    fn enqueue(&self, batch: Vec<Job>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let lost = if Handle::try_current().is_ok() {
            debug!("tokio context present; driving batch from a helper thread");
            thread::scope(|scope| {
                scope
                    .spawn(|| self.dispatch(batch))
                    .join()
                    .map_err(|_| TaskflowError::Executor("batch driver thread panicked".to_string()))
            })??
        } else {
            self.dispatch(batch)?
        };

        if lost > 0 {
            return Err(TaskflowError::Executor(format!(
                "{lost} job(s) panicked outside their task guard"
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "concurrent"
    }
}
