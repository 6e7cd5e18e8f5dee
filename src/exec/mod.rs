// src/exec/mod.rs

//! Batch execution layer.
//!
//! - [`backend`] provides the `Executor` trait and `executor_for`, which maps
//!   an [`ExecutorKind`](crate::types::ExecutorKind) to an implementation.
//! - [`sequential`] runs a batch on the calling thread.
//! - [`concurrent`] runs a batch on a bounded blocking pool.
//! - [`command`] builds shell-command task bodies for config-driven graphs.

pub mod backend;
pub mod command;
pub mod concurrent;
pub mod sequential;

pub use backend::{Executor, Job, executor_for};
pub use command::command_body;
pub use concurrent::ConcurrentExecutor;
pub use sequential::SequentialExecutor;
