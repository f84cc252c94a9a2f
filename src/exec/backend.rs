// src/exec/backend.rs

//! Backend abstraction for running one task command to completion.
//!
//! The engine talks to a [`TaskBackend`] instead of concrete process/container
//! clients. This keeps the worker loop backend-agnostic and lets tests
//! substitute a fake that never spawns anything real.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::model::TaskType;
use crate::errors::{PipedagError, Result};
use crate::exec::docker::DockerBackend;
use crate::exec::kubernetes::KubernetesBackend;
use crate::exec::local::LocalBackend;

/// Fully rendered execution request for a single task.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub name: String,
    /// Rendered shell command, run as `sh -c <command>`.
    pub command: String,
    pub task_type: TaskType,
    /// Image for the container backends; `None` on the local backend.
    pub image: Option<String>,
    /// Rendered `KEY=VALUE` entries.
    pub envs: Vec<String>,
    /// `host:container` bind mounts (docker only).
    pub binds: Vec<String>,
    pub timeout: Duration,
}

/// Terminal result of a backend execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Non-zero exit status.
    Failed(i64),
    /// The backend gave up waiting and cancelled the execution.
    TimedOut,
}

/// One backend: run a command, stream its output, surface the exit status.
///
/// Backends do not retry; a non-zero exit is reported, not raised.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn run(&self, req: &RunRequest) -> Result<TaskOutcome>;
}

/// Production dispatcher: routes each request to the backend its task
/// resolves to.
pub struct BackendRouter {
    local: LocalBackend,
    docker: DockerBackend,
    kubernetes: KubernetesBackend,
}

impl BackendRouter {
    pub fn new() -> Self {
        Self {
            local: LocalBackend::new(),
            docker: DockerBackend::new(),
            kubernetes: KubernetesBackend::new(),
        }
    }
}

impl Default for BackendRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskBackend for BackendRouter {
    async fn run(&self, req: &RunRequest) -> Result<TaskOutcome> {
        match req.task_type {
            TaskType::Local => self.local.run(req).await,
            TaskType::Docker => self.docker.run(req).await,
            TaskType::Kubernetes => self.kubernetes.run(req).await,
        }
    }
}

/// Split a rendered `KEY=VALUE` entry at the first `=`.
pub fn split_env(entry: &str) -> Result<(&str, &str)> {
    entry.split_once('=').ok_or_else(|| {
        PipedagError::Config(format!("malformed env entry '{entry}' (expected KEY=VALUE)"))
    })
}
