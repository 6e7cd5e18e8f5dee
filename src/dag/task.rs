// src/dag/task.rs

//! A named unit of work plus its completion state.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use tracing::{debug, error, trace};

use crate::dag::arena::{TaskArena, TaskRef};
use crate::engine::{FailureKind, RunContext, TaskFailure, Timing};
use crate::errors::Result;
use crate::types::TaskName;

/// Zero-argument task body. Returning `Err` (or panicking) fails the task.
pub type TaskBody = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const FAILED: u8 = 2;

const NO_RANK: u32 = u32::MAX;

/// Observable state of a task.
///
/// A single atomic holds it, so a task is never both completed and failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not run yet (or gave up waiting on a failed dependency).
    Pending,
    /// Body returned normally; a completion rank is assigned.
    Completed,
    /// Body returned an error or panicked.
    Failed,
}

/// Whether a task may start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Some dependency is still outstanding.
    Waiting,
    /// A dependency (or something it depends on) failed; the task can never run in this run.
    Blocked { failed: TaskName },
}

/// What a single `execute` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    AlreadyCompleted,
    AlreadyFailed,
    Completed { rank: u32 },
    Failed,
    Blocked { failed: TaskName },
    Cancelled,
}

pub struct Task {
    name: TaskName,
    body: TaskBody,
    deps: Vec<TaskRef>,
    status: AtomicU8,
    rank: AtomicU32,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("status", &self.status())
            .field("rank", &self.completion_rank())
            .finish_non_exhaustive()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>, body: TaskBody) -> Self {
        Self {
            name: name.into(),
            body,
            deps: Vec::new(),
            status: AtomicU8::new(PENDING),
            rank: AtomicU32::new(NO_RANK),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[TaskRef] {
        &self.deps
    }

    pub fn dependency_count(&self) -> usize {
        self.deps.len()
    }

    pub fn status(&self) -> TaskStatus {
        match self.status.load(Ordering::Acquire) {
            COMPLETED => TaskStatus::Completed,
            FAILED => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status() == TaskStatus::Completed
    }

    pub fn has_failed(&self) -> bool {
        self.status() == TaskStatus::Failed
    }

    /// Position of this task in the global order of successful finishes.
    pub fn completion_rank(&self) -> Option<u32> {
        if self.is_completed() {
            Some(self.rank.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    pub(crate) fn set_body(&mut self, body: TaskBody) {
        self.body = body;
    }

    pub(crate) fn push_dependency(&mut self, dep: TaskRef) {
        self.deps.push(dep);
    }

    pub(crate) fn remove_dependency(&mut self, dep: TaskRef) -> usize {
        let before = self.deps.len();
        self.deps.retain(|d| *d != dep);
        before - self.deps.len()
    }

    /// Back to "not yet run"; dependencies and body are kept.
    pub(crate) fn reset(&mut self) {
        *self.status.get_mut() = PENDING;
        *self.rank.get_mut() = NO_RANK;
    }

    /// `true` iff every dependency has completed.
    pub fn ready(&self, arena: &TaskArena) -> bool {
        matches!(self.readiness(arena), Ok(Readiness::Ready))
    }

    pub fn readiness(&self, arena: &TaskArena) -> Result<Readiness> {
        let mut waiting = false;

        for &dep_ref in &self.deps {
            let dep = arena.resolve(dep_ref)?;
            match dep.status() {
                TaskStatus::Completed => {}
                TaskStatus::Failed => {
                    return Ok(Readiness::Blocked {
                        failed: dep.name.clone(),
                    });
                }
                TaskStatus::Pending => {
                    if let Some(failed) = arena.first_failed_upstream(dep_ref)? {
                        return Ok(Readiness::Blocked { failed });
                    }
                    waiting = true;
                }
            }
        }

        Ok(if waiting {
            Readiness::Waiting
        } else {
            Readiness::Ready
        })
    }

    /// Wait for dependencies, run the body once, and record the result.
    ///
    /// Never panics and never propagates a body error: failures end up in
    /// the run ledger and in this task's status.
    pub(crate) fn execute(&self, arena: &TaskArena, ctx: &RunContext) -> ExecOutcome {
        match self.status() {
            TaskStatus::Completed => return ExecOutcome::AlreadyCompleted,
            TaskStatus::Failed => return ExecOutcome::AlreadyFailed,
            TaskStatus::Pending => {}
        }

        if let Some(outcome) = self.wait_for_dependencies(arena, ctx) {
            return outcome;
        }

        let start = ctx.clock().now();
        debug!(task = %self.name, "running task body");

        let body = &self.body;
        match panic::catch_unwind(AssertUnwindSafe(|| body())) {
            Ok(Ok(())) => {
                let timing = Timing {
                    start,
                    end: ctx.clock().now(),
                };
                ctx.ledger().record_timing(&self.name, timing);

                // Rank and timing must be visible before the flag flips.
                let rank = ctx.ledger().next_rank();
                self.rank.store(rank, Ordering::Relaxed);
                self.status.store(COMPLETED, Ordering::Release);
                ctx.report_completion();

                debug!(
                    task = %self.name,
                    rank,
                    elapsed_ms = timing.elapsed().as_millis() as u64,
                    "task completed"
                );
                ExecOutcome::Completed { rank }
            }
            Ok(Err(err)) => self.fail(ctx, FailureKind::Error, format!("{err:#}")),
            Err(payload) => self.fail(ctx, FailureKind::Panic, panic_message(payload.as_ref())),
        }
    }

    fn wait_for_dependencies(&self, arena: &TaskArena, ctx: &RunContext) -> Option<ExecOutcome> {
        let mut logged_wait = false;

        loop {
            let seen = ctx.signal().generation();

            if ctx.is_cancelled() {
                debug!(task = %self.name, "run cancelled before task started");
                return Some(ExecOutcome::Cancelled);
            }

            match self.readiness(arena) {
                Ok(Readiness::Ready) => return None,
                Ok(Readiness::Blocked { failed }) => {
                    debug!(
                        task = %self.name,
                        failed = %failed,
                        "upstream task failed; giving up"
                    );
                    return Some(ExecOutcome::Blocked { failed });
                }
                Ok(Readiness::Waiting) => {
                    if !logged_wait {
                        trace!(task = %self.name, "waiting on dependencies");
                        logged_wait = true;
                    }
                    ctx.signal().wait_past(seen);
                }
                Err(err) => {
                    return Some(self.fail(ctx, FailureKind::Dependency, err.to_string()));
                }
            }
        }
    }

    fn fail(&self, ctx: &RunContext, kind: FailureKind, message: String) -> ExecOutcome {
        let failure = TaskFailure {
            task: self.name.clone(),
            kind,
            message,
        };

        ctx.ledger().forget_timing(&self.name);
        self.status.store(FAILED, Ordering::Release);
        error!(task = %self.name, "{failure}");
        ctx.report_failure(failure);

        ExecOutcome::Failed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("unknown panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn body(f: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) -> TaskBody {
        Arc::new(f)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> TaskBody {
        let counter = Arc::clone(counter);
        body(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn successful_execute_assigns_rank_and_timing_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut arena = TaskArena::new();
        let a = arena.push(Task::new("A", counting(&calls)));
        let ctx = RunContext::new(false);

        let task = arena.resolve(a).unwrap();
        assert_eq!(task.execute(&arena, &ctx), ExecOutcome::Completed { rank: 0 });
        assert_eq!(task.execute(&arena, &ctx), ExecOutcome::AlreadyCompleted);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(task.completion_rank(), Some(0));
        assert!(ctx.ledger().timing_of("A").is_some());
    }

    #[test]
    fn error_body_is_captured_not_propagated() {
        let mut arena = TaskArena::new();
        let f = arena.push(Task::new(
            "F",
            body(|| Err(anyhow::anyhow!("disk on fire"))),
        ));
        let ctx = RunContext::new(false);

        let task = arena.resolve(f).unwrap();
        assert_eq!(task.execute(&arena, &ctx), ExecOutcome::Failed);
        assert!(task.has_failed());
        assert!(!task.is_completed());
        assert_eq!(task.completion_rank(), None);
        assert!(ctx.ledger().timing_of("F").is_none());

        let failures = ctx.ledger().failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::Error);
        assert_eq!(failures[0].to_string(), "F failed: disk on fire");
    }

    #[test]
    fn panicking_body_is_captured() {
        let mut arena = TaskArena::new();
        let p = arena.push(Task::new("P", body(|| panic!("kaboom"))));
        let ctx = RunContext::new(false);

        let task = arena.resolve(p).unwrap();
        assert_eq!(task.execute(&arena, &ctx), ExecOutcome::Failed);
        let failures = ctx.ledger().failures();
        assert_eq!(failures[0].kind, FailureKind::Panic);
        assert!(failures[0].message.contains("kaboom"));
    }

    #[test]
    fn dependent_of_failed_task_is_blocked_and_never_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut arena = TaskArena::new();
        let f = arena.push(Task::new("F", body(|| Err(anyhow::anyhow!("nope")))));
        let mid = arena.push(Task::new("mid", counting(&calls)));
        let leaf = arena.push(Task::new("leaf", counting(&calls)));
        arena.add_dependency(mid, f).unwrap();
        arena.add_dependency(leaf, mid).unwrap();
        let ctx = RunContext::new(false);

        arena.resolve(f).unwrap().execute(&arena, &ctx);

        // Transitive: `leaf` only knows about `mid`, which never ran.
        let outcome = arena.resolve(leaf).unwrap().execute(&arena, &ctx);
        assert_eq!(
            outcome,
            ExecOutcome::Blocked {
                failed: "F".to_string()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(arena.resolve(leaf).unwrap().status(), TaskStatus::Pending);
    }

    #[test]
    fn readiness_tracks_dependency_completion() {
        let mut arena = TaskArena::new();
        let a = arena.push(Task::new("A", body(|| Ok(()))));
        let b = arena.push(Task::new("B", body(|| Ok(()))));
        arena.add_dependency(b, a).unwrap();
        let ctx = RunContext::new(false);

        assert!(arena.resolve(a).unwrap().ready(&arena));
        assert_eq!(
            arena.resolve(b).unwrap().readiness(&arena).unwrap(),
            Readiness::Waiting
        );

        arena.resolve(a).unwrap().execute(&arena, &ctx);
        assert!(arena.resolve(b).unwrap().ready(&arena));
    }

    #[test]
    fn cancelled_context_stops_unstarted_tasks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut arena = TaskArena::new();
        let boom = arena.push(Task::new("boom", body(|| Err(anyhow::anyhow!("x")))));
        let other = arena.push(Task::new("other", counting(&calls)));
        let ctx = RunContext::new(true);

        arena.resolve(boom).unwrap().execute(&arena, &ctx);
        assert_eq!(
            arena.resolve(other).unwrap().execute(&arena, &ctx),
            ExecOutcome::Cancelled
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reset_clears_state() {
        let mut arena = TaskArena::new();
        let a = arena.push(Task::new("A", body(|| Ok(()))));
        let ctx = RunContext::new(false);
        arena.resolve(a).unwrap().execute(&arena, &ctx);

        let task = arena.resolve_mut(a).unwrap();
        task.reset();
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.completion_rank(), None);
    }
}
