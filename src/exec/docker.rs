// src/exec/docker.rs

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;
use tracing::{info, warn};

use crate::errors::{PipedagError, Result};
use crate::exec::backend::{RunRequest, TaskBackend, TaskOutcome};

/// Runs the command in a container: create, start, wait, stream logs.
///
/// The docker daemon is resolved from the environment (`DOCKER_HOST`, ...)
/// on each run, so a pipeline with no docker tasks never touches the daemon.
#[derive(Debug, Default)]
pub struct DockerBackend;

impl DockerBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskBackend for DockerBackend {
    async fn run(&self, req: &RunRequest) -> Result<TaskOutcome> {
        let image = req
            .image
            .clone()
            .ok_or_else(|| PipedagError::Config(format!("task '{}' has no image", req.name)))?;

        info!(task = %req.name, image = %image, "starting docker container");

        let docker = Docker::connect_with_local_defaults()
            .context("connecting to the docker daemon")?;

        let host_config = (!req.binds.is_empty()).then(|| HostConfig {
            binds: Some(req.binds.clone()),
            ..Default::default()
        });

        let config = Config {
            image: Some(image),
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                req.command.clone(),
            ]),
            env: Some(req.envs.clone()),
            host_config,
            ..Default::default()
        };

        let created = docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| anyhow::Error::new(e).context("creating container"))?;

        docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| anyhow::Error::new(e).context("starting container"))?;

        // Stream logs to the host's streams while we wait for the exit.
        let mut logs = docker.logs(
            &created.id,
            Some(LogsOptions::<String> {
                follow: true,
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );
        let log_task = tokio::spawn(async move {
            while let Some(chunk) = logs.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) => {
                        print!("{}", String::from_utf8_lossy(&message))
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        eprint!("{}", String::from_utf8_lossy(&message))
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });

        let mut wait = docker.wait_container(&created.id, None::<WaitContainerOptions<String>>);

        let outcome = match tokio::time::timeout(req.timeout, wait.next()).await {
            Ok(Some(Ok(resp))) => {
                info!(task = %req.name, exit_code = resp.status_code, "container exited");
                if resp.status_code == 0 {
                    TaskOutcome::Success
                } else {
                    TaskOutcome::Failed(resp.status_code)
                }
            }
            Ok(Some(Err(e))) => {
                log_task.abort();
                return Err(anyhow::Error::new(e)
                    .context(format!("waiting for container of task '{}'", req.name))
                    .into());
            }
            Ok(None) => {
                log_task.abort();
                return Err(anyhow!("container wait stream ended without a status").into());
            }
            Err(_elapsed) => {
                warn!(task = %req.name, timeout = ?req.timeout, "container timed out; removing");
                log_task.abort();
                let _ = docker
                    .remove_container(
                        &created.id,
                        Some(RemoveContainerOptions {
                            force: true,
                            ..Default::default()
                        }),
                    )
                    .await;
                return Ok(TaskOutcome::TimedOut);
            }
        };

        let _ = log_task.await;
        Ok(outcome)
    }
}
