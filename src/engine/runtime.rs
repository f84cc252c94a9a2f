// src/engine/runtime.rs

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::model::TaskSpec;
use crate::engine::scheduler::{Scheduler, TaskCompletion, TaskState, TaskStatus};
use crate::engine::worker::{worker_loop, WorkerContext};
use crate::errors::Result;

/// Events posted by workers into the coordinator loop.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskStarted {
        task: String,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task: String,
        completion: TaskCompletion,
        at: DateTime<Utc>,
    },
}

/// Options that influence how the runtime behaves.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Size of the worker pool; also the bound on concurrently running tasks.
    pub worker_count: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { worker_count: 3 }
    }
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Every task's final state, in topological order.
    pub states: Vec<TaskState>,
    /// Failed tasks with their reasons.
    pub failed: Vec<(String, String)>,
    /// Tasks that never became ready (blocked behind a failure).
    pub never_ran: Vec<String>,
}

impl RunReport {
    /// The run succeeded iff no task failed.
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.states
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status)
    }
}

/// The coordinator: single owner of the scheduler, fed by worker events.
///
/// Responsibilities:
/// - seed the ready queue with tasks whose waiting-sets are empty
/// - apply `Started` / `Completed` events serially
/// - enqueue newly unblocked tasks in topological order
/// - stop the pool and report once nothing is queued or running
pub struct Runtime {
    scheduler: Scheduler,
    ctx: Arc<WorkerContext>,
    options: RuntimeOptions,
}

impl Runtime {
    pub fn new(scheduler: Scheduler, ctx: Arc<WorkerContext>, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            ctx,
            options,
        }
    }

    /// Drive the run to completion and return the final report.
    pub async fn run(mut self) -> Result<RunReport> {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel::<Arc<TaskSpec>>();
        let ready_rx = Arc::new(Mutex::new(ready_rx));
        let (events_tx, mut events_rx) = mpsc::channel::<RuntimeEvent>(64);

        // A pool of zero workers could never drain the queue.
        let worker_count = self.options.worker_count.max(1);

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&ready_rx),
                Arc::clone(&self.ctx),
                events_tx.clone(),
            )));
        }
        // The coordinator only reads events; workers hold the senders.
        drop(events_tx);

        let mut in_flight = 0usize;
        for task in self.scheduler.take_ready() {
            in_flight += 1;
            ready_tx
                .send(task)
                .map_err(|_| anyhow!("worker pool stopped before the run began"))?;
        }
        info!(initial_ready = in_flight, workers = worker_count, "run started");

        while in_flight > 0 {
            let event = events_rx
                .recv()
                .await
                .ok_or_else(|| anyhow!("workers stopped while tasks were in flight"))?;
            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::TaskStarted { task, at } => {
                    self.scheduler.on_started(&task, at);
                }
                RuntimeEvent::TaskCompleted {
                    task,
                    completion,
                    at,
                } => {
                    in_flight -= 1;
                    for newly_ready in self.scheduler.on_completed(&task, completion, at) {
                        in_flight += 1;
                        ready_tx
                            .send(newly_ready)
                            .map_err(|_| anyhow!("worker pool stopped mid-run"))?;
                    }
                }
            }
        }

        // Nothing queued or running: close the queue and let workers drain.
        drop(ready_tx);
        for handle in handles {
            let _ = handle.await;
        }

        let report = RunReport {
            states: self.scheduler.states(),
            failed: self.scheduler.failures(),
            never_ran: self.scheduler.never_ran(),
        };

        info!(
            success = report.success(),
            failed = report.failed.len(),
            never_ran = report.never_ran.len(),
            "run finished"
        );

        Ok(report)
    }
}
