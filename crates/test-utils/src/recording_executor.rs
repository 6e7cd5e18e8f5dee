use std::sync::{Arc, Mutex};

use taskflow::errors::Result;
use taskflow::exec::{Executor, Job, SequentialExecutor};
use tracing::debug;

/// An executor wrapper that:
/// - records the size of every batch it receives
/// - delegates the actual work to an inner executor (sequential by default).
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    inner: Arc<dyn Executor>,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::wrapping(SequentialExecutor)
    }

    pub fn wrapping(inner: impl Executor + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the recorded batch sizes; stays valid after the
    /// executor has been moved into a scheduler.
    pub fn batches_handle(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.batches)
    }

    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for RecordingExecutor {
    fn enqueue(&self, batch: Vec<Job>) -> Result<()> {
        debug!(jobs = batch.len(), inner = self.inner.name(), "recording batch");
        self.batches.lock().unwrap().push(batch.len());
        self.inner.enqueue(batch)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
