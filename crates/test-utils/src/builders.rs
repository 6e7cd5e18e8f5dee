#![allow(dead_code)]

use std::collections::BTreeMap;

use taskflow::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use taskflow::errors::Result;
use taskflow::types::ExecutorKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn executor(mut self, kind: ExecutorKind) -> Self {
        self.config.config.executor = kind;
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.config.config.max_threads = Some(n);
        self
    }

    pub fn cancel_on_failure(mut self, val: bool) -> Self {
        self.config.config.cancel_on_failure = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                sleep_ms: None,
                after: vec![],
            },
        }
    }

    /// A task that only simulates work.
    pub fn sleep_only(ms: u64) -> Self {
        Self {
            task: TaskConfig {
                cmd: None,
                sleep_ms: Some(ms),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.task.sleep_ms = Some(ms);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
