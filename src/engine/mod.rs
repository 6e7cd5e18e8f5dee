// src/engine/mod.rs

//! Run-wide shared state for task execution.
//!
//! Every job dispatched by the scheduler holds an `Arc<RunContext>` which
//! bundles:
//! - the [`Clock`] all start/end timestamps are measured against
//! - the [`RunLedger`] (failure list, timing map, completion-rank counter)
//! - the [`Signal`] tasks wait on while their dependencies are outstanding
//! - the cooperative cancellation flag
//!
//! Tasks own their completion flags; everything that many tasks write
//! concurrently lives here behind a lock or an atomic.

pub mod clock;
pub mod ledger;
pub mod signal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

pub use clock::{Clock, Timing};
pub use ledger::{FailureKind, RunLedger, TaskFailure};
pub use signal::Signal;

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
///
/// Task bodies run under `catch_unwind`, so a poisoned ledger only means a
/// panic happened while the guard was held elsewhere; the data is still
/// consistent for our append/insert-only usage.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state for one scheduler lifetime (until the next reset).
#[derive(Debug)]
pub struct RunContext {
    clock: Clock,
    ledger: RunLedger,
    signal: Signal,
    cancel_on_failure: bool,
    cancelled: AtomicBool,
}

impl RunContext {
    pub fn new(cancel_on_failure: bool) -> Self {
        Self {
            clock: Clock::new(),
            ledger: RunLedger::new(),
            signal: Signal::new(),
            cancel_on_failure,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Whether tasks that have not started yet should give up.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Record a task failure and wake every waiting task so it can observe
    /// the failure.
    pub(crate) fn report_failure(&self, failure: TaskFailure) {
        self.ledger.push_failure(failure);
        if self.cancel_on_failure && !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!("cancel_on_failure set; cancelling tasks that have not started");
        }
        self.signal.notify();
    }

    /// Wake every waiting task after a successful completion.
    pub(crate) fn report_completion(&self) {
        self.signal.notify();
    }
}
