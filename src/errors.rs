// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::dag::arena::ArenaId;

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Task '{0}' cannot depend on itself")]
    SelfDependency(String),

    #[error("Edge '{dependent}' -> '{dependency}' rejected: '{dependency}' already depends on '{dependent}'")]
    CycleRejected {
        dependent: String,
        dependency: String,
    },

    #[error("Cycle detected in task graph: {0}")]
    Cycle(String),

    #[error("Dangling task reference: index {index} into arena {arena:?} ({reason})")]
    DanglingRef {
        arena: ArenaId,
        index: usize,
        reason: &'static str,
    },

    #[error("Task graph is still shared with dispatched jobs; mutation refused")]
    GraphBusy,

    #[error("Run stalled with {pending} task(s) pending and no failure recorded")]
    Stalled { pending: usize },

    #[error("Executor error: {0}")]
    Executor(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskflowError>;
