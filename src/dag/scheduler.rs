// src/dag/scheduler.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::arena::{TaskArena, TaskRef};
use crate::dag::report::{GraphReport, ReportNode};
use crate::dag::task::{Task, TaskBody, TaskStatus};
use crate::engine::{RunContext, TaskFailure, Timing};
use crate::errors::{Result, TaskflowError};
use crate::exec::{Executor, Job, command_body, executor_for};
use crate::types::{ExecutorKind, TaskName};

/// Programmatic scheduler configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub executor: ExecutorKind,
    /// Cap on concurrently running jobs (concurrent executor only).
    pub max_threads: Option<usize>,
    /// Make every not-yet-started task give up after the first failure.
    pub cancel_on_failure: bool,
}

/// Whole-graph state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Tasks and edges may be added, replaced or removed.
    Building,
    /// The dispatch loop is active.
    Running,
    /// Every task completed.
    Drained,
    /// A task failure was observed and dispatching stopped.
    Aborted,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Building => "building",
            SchedulerState::Running => "running",
            SchedulerState::Drained => "drained",
            SchedulerState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// What a call to [`Scheduler::run`] achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub state: SchedulerState,
    /// Batches dispatched by this call.
    pub batches: usize,
    pub completed: usize,
    pub failed: usize,
    /// Tasks that never ran (blocked by a failure, or cancelled).
    pub pending: usize,
}

/// Scheduler owns the task arena, the name index and the run-wide state.
///
/// It is responsible for:
/// - registering tasks by unique name and replacing bodies on re-registration
/// - validating dependency edges (unknown names, self-edges, cycles)
/// - dispatching batches of pending tasks through the configured executor
///   until the graph drains or a failure aborts the run
/// - exposing failures, timings and a report after the run
///
/// Dispatched jobs share the arena and run context through `Arc`s; graph
/// mutation requires that no job still holds them.
#[derive(Debug)]
pub struct Scheduler {
    arena: Arc<TaskArena>,
    names: HashMap<TaskName, TaskRef>,
    executor: Arc<dyn Executor>,
    context: Arc<RunContext>,
    options: SchedulerOptions,
    state: SchedulerState,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_options(SchedulerOptions::default())
    }

    pub fn with_options(options: SchedulerOptions) -> Self {
        Self {
            arena: Arc::new(TaskArena::new()),
            names: HashMap::new(),
            executor: executor_for(options.executor, options.max_threads),
            context: Arc::new(RunContext::new(options.cancel_on_failure)),
            options,
            state: SchedulerState::Building,
        }
    }

    /// Construct a scheduler from a validated [`ConfigFile`], with one
    /// shell-command task per `[task.<name>]` section.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut scheduler = Self::with_options(cfg.config.scheduler_options());

        for (name, tc) in cfg.task.iter() {
            let body = command_body(name, tc.cmd.clone(), tc.sleep());
            scheduler.add_task_body(name.as_str(), body)?;
        }

        for (name, tc) in cfg.task.iter() {
            scheduler.add_dependencies(name, &tc.after)?;
        }

        debug!(tasks = scheduler.len(), "scheduler built from config");
        Ok(scheduler)
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Install a custom executor. Takes effect on the next `run()`.
    pub fn set_executor(&mut self, executor: impl Executor + 'static) {
        debug!(executor = executor.name(), "executor replaced");
        self.executor = Arc::new(executor);
    }

    /// Switch between the built-in executors.
    pub fn set_executor_kind(&mut self, kind: ExecutorKind) {
        self.options.executor = kind;
        self.executor = executor_for(kind, self.options.max_threads);
        debug!(executor = self.executor.name(), "executor replaced");
    }

    fn arena_mut(&mut self) -> Result<&mut TaskArena> {
        let arena = Arc::get_mut(&mut self.arena).ok_or(TaskflowError::GraphBusy)?;
        self.state = SchedulerState::Building;
        Ok(arena)
    }

    fn lookup(&self, name: &str) -> Result<TaskRef> {
        self.names.get(name).copied().ok_or_else(|| {
            warn!(task = %name, "unknown task name");
            TaskflowError::UnknownTask(name.to_string())
        })
    }

    /// Register `name`, or replace its body if it already exists.
    ///
    /// Replacing keeps the task's edges and completion state.
    pub fn add_task<F>(&mut self, name: impl Into<TaskName>, body: F) -> Result<TaskRef>
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_task_body(name, Arc::new(body))
    }

    /// [`add_task`](Self::add_task) for an already type-erased body.
    pub fn add_task_body(&mut self, name: impl Into<TaskName>, body: TaskBody) -> Result<TaskRef> {
        let name = name.into();

        if let Some(&existing) = self.names.get(&name) {
            self.arena_mut()?.resolve_mut(existing)?.set_body(body);
            debug!(task = %name, "task body replaced");
            return Ok(existing);
        }

        let task_ref = self.arena_mut()?.push(Task::new(name.clone(), body));
        debug!(task = %name, index = task_ref.index(), "task registered");
        self.names.insert(name, task_ref);
        Ok(task_ref)
    }

    /// `dependent` will not start until `dependency` has completed.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let from = self.lookup(dependent)?;
        let to = self.lookup(dependency)?;
        self.arena_mut()?.add_dependency(from, to)?;
        debug!(dependent, dependency, "dependency added");
        Ok(())
    }

    /// Add several dependencies to one task.
    ///
    /// Every edge is attempted; the first error (if any) is returned.
    pub fn add_dependencies<I, S>(&mut self, dependent: &str, dependencies: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut first_err = None;
        for dependency in dependencies {
            if let Err(err) = self.add_dependency(dependent, dependency.as_ref()) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Remove every copy of the edge and return how many there were.
    pub fn remove_dependency(&mut self, dependent: &str, dependency: &str) -> Result<usize> {
        let from = self.lookup(dependent)?;
        let to = self.lookup(dependency)?;
        let removed = self.arena_mut()?.remove_dependency(from, to)?;
        debug!(dependent, dependency, removed, "dependency removed");
        Ok(removed)
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        let task_ref = self.names.get(name)?;
        self.arena.resolve(*task_ref).ok()
    }

    pub fn task_ref(&self, name: &str) -> Option<TaskRef> {
        self.names.get(name).copied()
    }

    /// Task names in registration order.
    pub fn task_names(&self) -> Vec<TaskName> {
        self.arena.iter().map(|(_, t)| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Drop every task and all run state. Old `TaskRef`s become dangling.
    pub fn clear(&mut self) -> Result<()> {
        self.arena_mut()?.clear();
        self.names.clear();
        self.context = Arc::new(RunContext::new(self.options.cancel_on_failure));
        debug!("scheduler cleared");
        Ok(())
    }

    /// Forget all run results (flags, ranks, timings, failures) and restart
    /// the clock. Tasks and edges are kept.
    pub fn reset(&mut self) -> Result<()> {
        let arena = self.arena_mut()?;
        let refs: Vec<TaskRef> = arena.iter().map(|(r, _)| r).collect();
        for task_ref in refs {
            arena.resolve_mut(task_ref)?.reset();
        }
        self.context = Arc::new(RunContext::new(self.options.cancel_on_failure));
        debug!(tasks = self.len(), "run state reset");
        Ok(())
    }

    /// Run the graph until every task completed or a failure was observed.
    ///
    /// A drained graph is not run again; a scheduler with recorded failures
    /// stays aborted until [`reset`](Self::reset).
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.has_errors() {
            debug!("failures already recorded; not running");
            self.state = SchedulerState::Aborted;
            return Ok(self.summary(0));
        }
        if self.all_completed() {
            debug!("all tasks already completed; nothing to run");
            self.state = SchedulerState::Drained;
            return Ok(self.summary(0));
        }

        self.state = SchedulerState::Running;
        info!(
            tasks = self.len(),
            executor = self.executor.name(),
            "starting DAG run"
        );

        let mut batches = 0usize;
        loop {
            let pending = self.pending_in_order()?;
            let ranks_before = self.context.ledger().ranks_issued();

            batches += 1;
            debug!(batch = batches, jobs = pending.len(), "dispatching batch");

            let jobs: Vec<Job> = pending.iter().map(|&r| self.job_for(r)).collect();
            if let Err(err) = self.executor.enqueue(jobs) {
                error!(batch = batches, error = %err, "executor failed");
                self.state = SchedulerState::Aborted;
                return Err(err);
            }

            if self.has_errors() {
                self.state = SchedulerState::Aborted;
                for failure in self.context.ledger().failures() {
                    error!(task = %failure.task, "{failure}");
                }
                warn!(batch = batches, "run aborted after task failure");
                break;
            }

            if self.all_completed() {
                self.state = SchedulerState::Drained;
                info!(batches, "DAG run drained");
                break;
            }

            if self.context.ledger().ranks_issued() == ranks_before {
                let pending = self.count(TaskStatus::Pending);
                self.state = SchedulerState::Aborted;
                return Err(TaskflowError::Stalled { pending });
            }
        }

        Ok(self.summary(batches))
    }

    /// Not-yet-completed tasks, dependencies before dependents.
    fn pending_in_order(&self) -> Result<Vec<TaskRef>> {
        let mut pending = Vec::new();
        for task_ref in self.arena.topological_order()? {
            if !self.arena.resolve(task_ref)?.is_completed() {
                pending.push(task_ref);
            }
        }
        Ok(pending)
    }

    fn job_for(&self, task_ref: TaskRef) -> Job {
        let arena = Arc::clone(&self.arena);
        let ctx = Arc::clone(&self.context);

        Box::new(move || match arena.resolve(task_ref) {
            Ok(task) => {
                let outcome = task.execute(&arena, &ctx);
                debug!(task = %task.name(), ?outcome, "job finished");
            }
            Err(err) => error!(error = %err, "job for unresolvable task"),
        })
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.arena
            .iter()
            .filter(|(_, t)| t.status() == status)
            .count()
    }

    fn summary(&self, batches: usize) -> RunSummary {
        RunSummary {
            state: self.state,
            batches,
            completed: self.count(TaskStatus::Completed),
            failed: self.count(TaskStatus::Failed),
            pending: self.count(TaskStatus::Pending),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.context.ledger().has_failures()
    }

    /// Human-readable failure messages, in the order they were captured.
    pub fn errors(&self) -> Vec<String> {
        self.context
            .ledger()
            .failures()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        self.context.ledger().failures()
    }

    pub fn all_completed(&self) -> bool {
        self.arena.iter().all(|(_, t)| t.is_completed())
    }

    pub fn timings(&self) -> BTreeMap<TaskName, Timing> {
        self.context.ledger().timings()
    }

    pub fn timing_of(&self, name: &str) -> Option<Timing> {
        self.context.ledger().timing_of(name)
    }

    /// Describe the graph with per-task rank and timing.
    pub fn export_report(&self) -> GraphReport {
        let nodes = self
            .arena
            .iter()
            .map(|(_, task)| ReportNode {
                name: task.name().to_string(),
                dependencies: task
                    .dependencies()
                    .iter()
                    .filter_map(|d| self.arena.resolve(*d).ok())
                    .map(|d| d.name().to_string())
                    .collect(),
                status: task.status(),
                rank: task.completion_rank(),
                timing: self.timing_of(task.name()),
            })
            .collect();

        GraphReport { nodes }
    }
}
