// src/exec/command.rs

//! Task bodies backed by shell commands, used when a graph is loaded from a
//! config file.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{debug, info};

use crate::dag::TaskBody;

/// Build a body that optionally sleeps, then optionally runs `cmd` through
/// the platform shell. A non-zero exit status fails the task.
pub fn command_body(name: &str, cmd: Option<String>, sleep: Option<Duration>) -> TaskBody {
    let name = name.to_string();

    Arc::new(move || {
        if let Some(sleep) = sleep {
            debug!(task = %name, sleep_ms = sleep.as_millis() as u64, "simulating work");
            std::thread::sleep(sleep);
        }

        let Some(cmd) = cmd.as_deref() else {
            return Ok(());
        };

        info!(task = %name, cmd = %cmd, "starting task process");

        let output = shell(cmd)
            .output()
            .with_context(|| format!("spawning process for task '{name}'"))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(task = %name, "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(task = %name, "stderr: {}", line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            bail!("command `{cmd}` exited with status {code}");
        }

        Ok(())
    })
}

fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}
