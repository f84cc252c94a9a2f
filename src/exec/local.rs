// src/exec/local.rs

use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::backend::{split_env, RunRequest, TaskBackend, TaskOutcome};

/// Runs the command in a local shell, inheriting the host environment merged
/// with the task envs (task entries override on key collision).
#[derive(Debug, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskBackend for LocalBackend {
    async fn run(&self, req: &RunRequest) -> Result<TaskOutcome> {
        info!(task = %req.name, cmd = %req.command, "starting local process");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&req.command);

        for entry in req.envs.iter() {
            let (key, value) = split_env(entry)?;
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Run the shell as a process-group leader so a timeout can take down
        // everything it forked, not just the shell itself.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", req.name))?;

        // Forward both streams to the host's streams line by line as they
        // arrive.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    println!("{line}");
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    eprintln!("{line}");
                }
            });
        }

        let status = match tokio::time::timeout(req.timeout, child.wait()).await {
            Ok(status) => {
                status.with_context(|| format!("waiting for process of task '{}'", req.name))?
            }
            Err(_elapsed) => {
                warn!(
                    task = %req.name,
                    timeout = ?req.timeout,
                    "local process timed out; killing its process group"
                );
                kill_process_group(&mut child).await;
                return Ok(TaskOutcome::TimedOut);
            }
        };

        let code = status.code().unwrap_or(-1) as i64;
        info!(task = %req.name, exit_code = code, "local process exited");

        if status.success() {
            Ok(TaskOutcome::Success)
        } else {
            Ok(TaskOutcome::Failed(code))
        }
    }
}

/// Kill the child's whole process group, then reap the shell.
async fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // The shell was spawned as a group leader; a negative pid signals
        // the entire group, including anything the command forked.
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
    let _ = child.kill().await;
}
