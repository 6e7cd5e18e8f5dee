// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`arena`] stores tasks by index and resolves [`TaskRef`]s.
//! - [`task`] holds one unit of work and its completion state.
//! - [`scheduler`] owns the graph and drives batches through an executor.
//! - [`report`] describes a graph after a run (text and Graphviz).

pub mod arena;
pub mod report;
pub mod scheduler;
pub mod task;

pub use arena::{ArenaId, TaskArena, TaskRef};
pub use report::{GraphReport, ReportNode};
pub use scheduler::{RunSummary, Scheduler, SchedulerOptions, SchedulerState};
pub use task::{ExecOutcome, Readiness, Task, TaskBody, TaskStatus};
