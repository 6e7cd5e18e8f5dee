// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_bodies(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_threads == Some(0) {
        return Err(TaskflowError::ConfigError(
            "[config].max_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_bodies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.is_none() && task.sleep_ms.is_none() {
            return Err(TaskflowError::ConfigError(format!(
                "task '{}' needs `cmd` or `sleep_ms`",
                name
            )));
        }
        if matches!(task.cmd.as_deref(), Some(cmd) if cmd.trim().is_empty()) {
            return Err(TaskflowError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(TaskflowError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(TaskflowError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task, i.e. `after = ["A"]` on B adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskflowError::Cycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ConfigSection, TaskConfig};
    use std::collections::BTreeMap;

    fn task(cmd: &str, after: &[&str]) -> TaskConfig {
        TaskConfig {
            cmd: Some(cmd.to_string()),
            sleep_ms: None,
            after: after.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn raw(tasks: Vec<(&str, TaskConfig)>) -> RawConfigFile {
        RawConfigFile {
            config: ConfigSection::default(),
            task: tasks
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(matches!(
            ConfigFile::try_from(raw(vec![])),
            Err(TaskflowError::ConfigError(_))
        ));
    }

    #[test]
    fn zero_max_threads_is_rejected() {
        let mut cfg = raw(vec![("A", task("echo A", &[]))]);
        cfg.config.max_threads = Some(0);
        assert!(matches!(
            ConfigFile::try_from(cfg),
            Err(TaskflowError::ConfigError(msg)) if msg.contains("max_threads")
        ));
    }

    #[test]
    fn task_without_body_is_rejected() {
        let cfg = raw(vec![("A", TaskConfig::default())]);
        assert!(matches!(
            ConfigFile::try_from(cfg),
            Err(TaskflowError::ConfigError(msg)) if msg.contains("`cmd` or `sleep_ms`")
        ));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let cfg = raw(vec![("A", task("echo A", &["A"]))]);
        assert!(matches!(
            ConfigFile::try_from(cfg),
            Err(TaskflowError::ConfigError(msg)) if msg.contains("itself")
        ));
    }

    #[test]
    fn three_cycle_is_rejected() {
        let cfg = raw(vec![
            ("A", task("echo A", &["C"])),
            ("B", task("echo B", &["A"])),
            ("C", task("echo C", &["B"])),
        ]);
        assert!(matches!(ConfigFile::try_from(cfg), Err(TaskflowError::Cycle(_))));
    }

    #[test]
    fn valid_dag_passes() {
        let cfg = raw(vec![
            ("A", task("echo A", &[])),
            ("B", task("echo B", &["A"])),
        ]);
        assert!(ConfigFile::try_from(cfg).is_ok());
    }
}
