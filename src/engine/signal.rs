// src/engine/signal.rs

//! Completion notification shared by all tasks of a run.
//!
//! A task waiting on its dependencies reads the current generation, checks
//! readiness, and only then blocks until the generation moves past the value
//! it read. Any completion or failure bumps the generation, so a wake-up that
//! lands between the readiness check and the wait is never lost.

use std::sync::{Condvar, Mutex, PoisonError};

use super::lock;

#[derive(Debug, Default)]
pub struct Signal {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        *lock(&self.generation)
    }

    /// Advance the generation and wake every waiter.
    pub fn notify(&self) {
        {
            let mut generation = lock(&self.generation);
            *generation = generation.wrapping_add(1);
        }
        self.changed.notify_all();
    }

    /// Block until the generation differs from `seen`.
    pub fn wait_past(&self, seen: u64) {
        let mut generation = lock(&self.generation);
        while *generation == seen {
            generation = self
                .changed
                .wait(generation)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_returns_immediately_when_generation_already_moved() {
        let signal = Signal::new();
        let seen = signal.generation();
        signal.notify();
        signal.wait_past(seen);
    }

    #[test]
    fn waiter_is_woken_by_another_thread() {
        let signal = Arc::new(Signal::new());
        let seen = signal.generation();

        let notifier = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.notify())
        };

        signal.wait_past(seen);
        notifier.join().unwrap();
        assert_ne!(signal.generation(), seen);
    }
}
