// src/dag/report.rs

//! Post-run graph description: every task with its dependencies, rank and
//! timing. Rendering to Graphviz goes through `petgraph::dot`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::task::TaskStatus;
use crate::engine::Timing;
use crate::errors::Result;
use crate::types::TaskName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportNode {
    pub name: TaskName,
    /// Names of the tasks this one waits for, in declaration order.
    pub dependencies: Vec<TaskName>,
    pub status: TaskStatus,
    pub rank: Option<u32>,
    pub timing: Option<Timing>,
}

impl ReportNode {
    pub fn executed(&self) -> bool {
        self.rank.is_some()
    }

    /// Two-line node label: name, then rank and timing or "not executed".
    pub fn label(&self) -> String {
        match (self.rank, self.timing) {
            (Some(rank), Some(t)) => format!(
                "{}\nrank {} | {:.3}s - {:.3}s",
                self.name,
                rank,
                t.start.as_secs_f64(),
                t.end.as_secs_f64()
            ),
            (Some(rank), None) => format!("{}\nrank {}", self.name, rank),
            _ => format!("{}\nnot executed", self.name),
        }
    }
}

/// Snapshot of a scheduler's graph, in task insertion order.
#[derive(Debug, Clone, Default)]
pub struct GraphReport {
    pub nodes: Vec<ReportNode>,
}

impl GraphReport {
    pub fn node(&self, name: &str) -> Option<&ReportNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn executed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.executed()).count()
    }

    /// Graphviz source; edges point from a dependency to its dependent.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, &str> = DiGraph::with_capacity(self.nodes.len(), 0);
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            index.insert(node.name.as_str(), graph.add_node(node.label()));
        }

        for node in &self.nodes {
            let to = index[node.name.as_str()];
            for dep in &node.dependencies {
                if let Some(&from) = index.get(dep.as_str()) {
                    graph.add_edge(from, to, "");
                }
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    pub fn write_dot(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_dot())?;
        Ok(())
    }
}

impl fmt::Display for GraphReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node.name)?;
            match (node.rank, node.timing) {
                (Some(rank), Some(t)) => write!(
                    f,
                    ": rank {} ({:.3}s - {:.3}s, {} ms)",
                    rank,
                    t.start.as_secs_f64(),
                    t.end.as_secs_f64(),
                    t.elapsed().as_millis()
                )?,
                (Some(rank), None) => write!(f, ": rank {}", rank)?,
                _ if node.status == TaskStatus::Failed => write!(f, ": failed")?,
                _ => write!(f, ": not executed")?,
            }
            if !node.dependencies.is_empty() {
                write!(f, " [after {}]", node.dependencies.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
