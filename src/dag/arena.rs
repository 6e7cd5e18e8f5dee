// src/dag/arena.rs

//! Index-based task storage.
//!
//! Tasks live in a single growable `Vec`. Edges never hold addresses; they
//! hold a [`TaskRef`], i.e. "the task at index `i` of arena `A`", and are
//! resolved through the arena at use time. Growth may move tasks in memory
//! without invalidating any edge, and a reference that no longer points into
//! the arena resolves to [`TaskflowError::DanglingRef`] instead of garbage.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::warn;

use crate::dag::task::{Task, TaskStatus};
use crate::errors::{Result, TaskflowError};
use crate::types::TaskName;

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`TaskArena`] (changes on `clear`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId(u64);

impl ArenaId {
    fn fresh() -> Self {
        ArenaId(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable reference to a task: arena identity plus index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    arena: ArenaId,
    index: usize,
}

impl TaskRef {
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Owning collection of tasks; all edges are between its indices.
#[derive(Debug)]
pub struct TaskArena {
    id: ArenaId,
    tasks: Vec<Task>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self {
            id: ArenaId::fresh(),
            tasks: Vec::new(),
        }
    }

    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a task and return its stable reference.
    pub fn push(&mut self, task: Task) -> TaskRef {
        self.tasks.push(task);
        TaskRef {
            arena: self.id,
            index: self.tasks.len() - 1,
        }
    }

    /// Drop every task. References handed out before are invalidated.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.id = ArenaId::fresh();
    }

    pub fn resolve(&self, task: TaskRef) -> Result<&Task> {
        self.check(task)?;
        Ok(&self.tasks[task.index])
    }

    pub fn resolve_mut(&mut self, task: TaskRef) -> Result<&mut Task> {
        self.check(task)?;
        Ok(&mut self.tasks[task.index])
    }

    fn check(&self, task: TaskRef) -> Result<()> {
        if task.arena != self.id {
            return Err(TaskflowError::DanglingRef {
                arena: task.arena,
                index: task.index,
                reason: "reference belongs to another or cleared arena",
            });
        }
        if task.index >= self.tasks.len() {
            return Err(TaskflowError::DanglingRef {
                arena: task.arena,
                index: task.index,
                reason: "index out of bounds",
            });
        }
        Ok(())
    }

    /// All tasks in insertion order, with their references.
    pub fn iter(&self) -> impl Iterator<Item = (TaskRef, &Task)> {
        let arena = self.id;
        self.tasks
            .iter()
            .enumerate()
            .map(move |(index, task)| (TaskRef { arena, index }, task))
    }

    /// Whether `from` depends on `target`, directly or transitively.
    pub fn depends_on(&self, from: TaskRef, target: TaskRef) -> Result<bool> {
        let mut stack = vec![from];
        let mut visited: HashSet<TaskRef> = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for &dep in self.resolve(current)?.dependencies() {
                if dep == target {
                    return Ok(true);
                }
                stack.push(dep);
            }
        }

        Ok(false)
    }

    /// Add the edge "`dependent` waits for `dependency`".
    ///
    /// Self-edges and edges closing a cycle are refused; the dependency
    /// lists are left untouched in that case.
    pub fn add_dependency(&mut self, dependent: TaskRef, dependency: TaskRef) -> Result<()> {
        let dependent_name = self.resolve(dependent)?.name().to_string();
        let dependency_name = self.resolve(dependency)?.name().to_string();

        if dependent == dependency {
            warn!(task = %dependent_name, "refusing self-dependency");
            return Err(TaskflowError::SelfDependency(dependent_name));
        }

        if self.depends_on(dependency, dependent)? {
            warn!(
                dependent = %dependent_name,
                dependency = %dependency_name,
                "circular dependency detected; edge refused"
            );
            return Err(TaskflowError::CycleRejected {
                dependent: dependent_name,
                dependency: dependency_name,
            });
        }

        self.resolve_mut(dependent)?.push_dependency(dependency);
        Ok(())
    }

    /// Remove every copy of the edge; returns how many were removed.
    pub fn remove_dependency(&mut self, dependent: TaskRef, dependency: TaskRef) -> Result<usize> {
        self.check(dependency)?;
        Ok(self.resolve_mut(dependent)?.remove_dependency(dependency))
    }

    /// Name of the first failed task reachable from `task` (itself
    /// included) through dependency edges.
    pub fn first_failed_upstream(&self, task: TaskRef) -> Result<Option<TaskName>> {
        let mut stack = vec![task];
        let mut visited: HashSet<TaskRef> = HashSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let resolved = self.resolve(current)?;
            match resolved.status() {
                TaskStatus::Failed => return Ok(Some(resolved.name().to_string())),
                // A completed task's own dependencies were satisfied.
                TaskStatus::Completed => {}
                TaskStatus::Pending => stack.extend(resolved.dependencies().iter().copied()),
            }
        }

        Ok(None)
    }

    /// Every task ordered so that dependencies come before dependents.
    pub fn topological_order(&self) -> Result<Vec<TaskRef>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.tasks.len(), 0);
        let nodes: Vec<NodeIndex> = (0..self.tasks.len()).map(|i| graph.add_node(i)).collect();

        for (index, task) in self.tasks.iter().enumerate() {
            for dep in task.dependencies() {
                self.check(*dep)?;
                graph.add_edge(nodes[dep.index], nodes[index], ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            let name = self.tasks[graph[cycle.node_id()]].name().to_string();
            TaskflowError::Cycle(format!("cycle detected in task graph involving task '{name}'"))
        })?;

        Ok(order
            .into_iter()
            .map(|node| TaskRef {
                arena: self.id,
                index: graph[node],
            })
            .collect())
    }
}

impl Default for TaskArena {
    fn default() -> Self {
        Self::new()
    }
}
