// src/exec/sequential.rs

use tracing::trace;

use crate::errors::Result;

use super::backend::{Executor, Job};

/// Runs every job on the calling thread, in batch order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn enqueue(&self, batch: Vec<Job>) -> Result<()> {
        trace!(jobs = batch.len(), "sequential executor running batch");
        for job in batch {
            job();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}
