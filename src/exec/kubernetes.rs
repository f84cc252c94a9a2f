// src/exec/kubernetes.rs

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec};
use kube::api::{Api, DeleteParams, LogParams, ObjectMeta, PostParams};
use kube::Client;
use tracing::{info, warn};

use crate::errors::{PipedagError, Result};
use crate::exec::backend::{split_env, RunRequest, TaskBackend, TaskOutcome};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Runs the command as a pod in the configured namespace and waits for a
/// terminal phase.
pub struct KubernetesBackend {
    namespace: String,
}

impl KubernetesBackend {
    pub fn new() -> Self {
        Self {
            namespace: "default".to_string(),
        }
    }
}

impl Default for KubernetesBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskBackend for KubernetesBackend {
    async fn run(&self, req: &RunRequest) -> Result<TaskOutcome> {
        if !req.binds.is_empty() {
            return Err(PipedagError::UnsupportedFeature(format!(
                "task '{}': binds are not supported on the kubernetes backend",
                req.name
            )));
        }

        let env = req
            .envs
            .iter()
            .map(|entry| {
                let (name, value) = split_env(entry)?;
                Ok(EnvVar {
                    name: name.to_string(),
                    value: Some(value.to_string()),
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let pod = Pod {
            metadata: ObjectMeta {
                generate_name: Some(format!("{}-", req.name)),
                ..Default::default()
            },
            spec: Some(PodSpec {
                restart_policy: Some("Never".to_string()),
                containers: vec![Container {
                    name: "main".to_string(),
                    image: req.image.clone(),
                    image_pull_policy: Some("IfNotPresent".to_string()),
                    command: Some(vec![
                        "sh".to_string(),
                        "-c".to_string(),
                        req.command.clone(),
                    ]),
                    env: Some(env),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        let client = Client::try_default()
            .await
            .map_err(|e| anyhow::Error::new(e).context("building kubernetes client"))?;
        let pods: Api<Pod> = Api::namespaced(client, &self.namespace);

        let created = pods
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| anyhow::Error::new(e).context("creating pod"))?;
        let pod_name = created
            .metadata
            .name
            .clone()
            .ok_or_else(|| anyhow!("created pod has no name"))?;

        info!(task = %req.name, pod = %pod_name, namespace = %self.namespace, "pod created");

        let deadline = tokio::time::Instant::now() + req.timeout;
        let terminal = loop {
            if tokio::time::Instant::now() >= deadline {
                warn!(task = %req.name, pod = %pod_name, "pod timed out; deleting");
                let _ = pods.delete(&pod_name, &DeleteParams::default()).await;
                return Ok(TaskOutcome::TimedOut);
            }

            tokio::time::sleep(POLL_INTERVAL).await;

            let current = pods
                .get(&pod_name)
                .await
                .map_err(|e| anyhow::Error::new(e).context("polling pod"))?;
            let phase = current
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_default();

            if phase == "Succeeded" || phase == "Failed" {
                break current;
            }
        };

        // Surface container logs after the pod reached a terminal phase.
        let logs = pods
            .logs(
                &pod_name,
                &LogParams {
                    container: Some("main".to_string()),
                    ..Default::default()
                },
            )
            .await
            .with_context(|| format!("fetching logs of pod '{pod_name}'"))?;
        print!("{logs}");

        let exit_code = terminal
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref())
            .and_then(|cs| cs.iter().find(|c| c.name == "main"))
            .and_then(|c| c.state.as_ref())
            .and_then(|s| s.terminated.as_ref())
            .map(|t| t.exit_code as i64);

        let phase = terminal
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_default();

        info!(task = %req.name, pod = %pod_name, phase = %phase, ?exit_code, "pod finished");

        if phase == "Succeeded" {
            Ok(TaskOutcome::Success)
        } else {
            Ok(TaskOutcome::Failed(exit_code.unwrap_or(1)))
        }
    }
}
