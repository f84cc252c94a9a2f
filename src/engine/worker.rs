// src/engine/worker.rs

//! Worker side of the scheduler protocol.
//!
//! Each worker owns one task at a time from pickup to completion: evaluate
//! `when`, stage inputs, render, dispatch to the backend, stage outputs.
//! Workers never mutate scheduler state; they post [`RuntimeEvent`]s back to
//! the coordinator.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::config::model::{ParamMap, TaskSpec, TaskType};
use crate::engine::runtime::RuntimeEvent;
use crate::engine::scheduler::TaskCompletion;
use crate::errors::{PipedagError, Result};
use crate::exec::{RunRequest, TaskBackend, TaskOutcome};
use crate::stage::Stager;
use crate::template::TemplateEngine;

/// Immutable per-run context shared by all workers.
pub struct WorkerContext {
    pub pipeline_params: ParamMap,
    pub pipeline_envs: Vec<String>,
    pub default_task_type: Option<TaskType>,
    pub default_image: Option<String>,
    pub timeout: std::time::Duration,
    pub engine: TemplateEngine,
    pub stager: Arc<dyn Stager>,
    pub backend: Arc<dyn TaskBackend>,
}

/// Consume tasks from the shared ready queue until it closes.
pub async fn worker_loop(
    worker_id: usize,
    ready_rx: Arc<Mutex<mpsc::UnboundedReceiver<Arc<TaskSpec>>>>,
    ctx: Arc<WorkerContext>,
    events_tx: mpsc::Sender<RuntimeEvent>,
) {
    debug!(worker_id, "worker started");

    loop {
        // Hold the lock only while receiving, so other workers can pick up
        // tasks while this one executes.
        let task = { ready_rx.lock().await.recv().await };
        let Some(task) = task else { break };

        // Conditional execution is decided against pipeline params, before
        // the task ever starts.
        if !task.when.iter().all(|c| c.passes(&ctx.pipeline_params)) {
            info!(worker_id, task = %task.name, "when clause rejected; skipping");
            post(
                &events_tx,
                RuntimeEvent::TaskCompleted {
                    task: task.name.clone(),
                    completion: TaskCompletion::Skipped,
                    at: Utc::now(),
                },
            )
            .await;
            continue;
        }

        post(
            &events_tx,
            RuntimeEvent::TaskStarted {
                task: task.name.clone(),
                at: Utc::now(),
            },
        )
        .await;

        let completion = match execute_task(&ctx, &task).await {
            Ok(()) => TaskCompletion::Done,
            Err(err) => {
                error!(worker_id, task = %task.name, error = %err, "task execution failed");
                TaskCompletion::Failed(err.to_string())
            }
        };

        post(
            &events_tx,
            RuntimeEvent::TaskCompleted {
                task: task.name.clone(),
                completion,
                at: Utc::now(),
            },
        )
        .await;
    }

    debug!(worker_id, "worker exiting (ready queue closed)");
}

async fn post(events_tx: &mpsc::Sender<RuntimeEvent>, event: RuntimeEvent) {
    if events_tx.send(event).await.is_err() {
        error!("runtime event channel closed; dropping event");
    }
}

/// Stage inputs, render, dispatch, stage outputs for one task.
async fn execute_task(ctx: &WorkerContext, task: &TaskSpec) -> Result<()> {
    for input in task.inputs.iter() {
        info!(task = %task.name, url = %input.s3, path = ?input.path, "staging input");
        ctx.stager.download(&input.s3, &input.path).await?;
    }

    // Effective params: pipeline params overlaid by task params.
    let mut params = ctx.pipeline_params.clone();
    params.extend(task.params.clone());

    // Pipeline envs first, task envs after, so task entries win on collision.
    let mut envs = Vec::with_capacity(ctx.pipeline_envs.len() + task.envs.len());
    for entry in ctx.pipeline_envs.iter().chain(task.envs.iter()) {
        envs.push(ctx.engine.render(entry, &params)?);
    }

    let command = ctx.engine.render(&task.command, &params)?;

    let req = RunRequest {
        name: task.name.clone(),
        command,
        task_type: task.effective_task_type(ctx.default_task_type),
        image: task
            .effective_image(ctx.default_image.as_deref())
            .map(String::from),
        envs,
        binds: task.binds.clone(),
        timeout: ctx.timeout,
    };

    match ctx.backend.run(&req).await? {
        TaskOutcome::Success => {}
        TaskOutcome::Failed(code) => {
            return Err(PipedagError::TaskFailure {
                task: task.name.clone(),
                code,
            })
        }
        TaskOutcome::TimedOut => {
            return Err(PipedagError::Timeout {
                task: task.name.clone(),
                timeout_ms: ctx.timeout.as_millis() as u64,
            })
        }
    }

    for output in task.outputs.iter() {
        info!(task = %task.name, url = %output.s3, path = ?output.path, "staging output");
        ctx.stager.upload(&output.path, &output.s3).await?;
    }

    Ok(())
}
