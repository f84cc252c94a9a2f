// src/engine/scheduler.rs

//! Task state bookkeeping for a single run.
//!
//! The scheduler is pure and synchronous: the runtime event loop is its only
//! caller, so every mutation happens in a single-owner frame. Workers never
//! touch it; they post events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::model::TaskSpec;

/// Lifecycle status of a concrete task.
///
/// Transitions are monotonic: `New → Running → (Done | Failed | Skipped)`,
/// and `New → Skipped` directly when a `when` clause rejects execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    New,
    Running,
    Done,
    Skipped,
    Failed,
}

/// Per-run state of a concrete task.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub name: String,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Terminal result of a task, as posted by its worker.
#[derive(Debug, Clone)]
pub enum TaskCompletion {
    Done,
    Skipped,
    Failed(String),
}

/// Owns TaskStates and the waiting-sets, and decides which tasks are ready.
///
/// A task is ready iff its waiting-set is empty and its status is still
/// `New`. Completing a task with `Done` or `Skipped` removes it from every
/// waiting-set; a `Failed` completion removes nothing, so dependents of a
/// failed task stay `New` for the rest of the run.
pub struct Scheduler {
    tasks: HashMap<String, Arc<TaskSpec>>,
    states: HashMap<String, TaskState>,
    waiting: HashMap<String, HashSet<String>>,
    /// Topological order; ready tasks are handed out in this order.
    order: Vec<String>,
    /// Tasks already handed to the ready queue, to prevent double enqueue.
    queued: HashSet<String>,
    failures: HashMap<String, String>,
}

impl Scheduler {
    /// Build a scheduler from concrete tasks and their topological order.
    ///
    /// `order` must contain exactly the names of `tasks`; dependencies are
    /// taken from each task's (already fan-in-resolved) `deps`.
    pub fn new(tasks: Vec<TaskSpec>, order: Vec<String>) -> Self {
        let mut task_map = HashMap::with_capacity(tasks.len());
        let mut states = HashMap::with_capacity(tasks.len());
        let mut waiting = HashMap::with_capacity(tasks.len());

        for task in tasks {
            states.insert(
                task.name.clone(),
                TaskState {
                    name: task.name.clone(),
                    status: TaskStatus::New,
                    start_time: None,
                    end_time: None,
                },
            );
            waiting.insert(
                task.name.clone(),
                task.deps.iter().cloned().collect::<HashSet<_>>(),
            );
            task_map.insert(task.name.clone(), Arc::new(task));
        }

        Self {
            tasks: task_map,
            states,
            waiting,
            order,
            queued: HashSet::new(),
            failures: HashMap::new(),
        }
    }

    /// Collect every task that is ready and not yet enqueued, in topological
    /// order, and mark it as queued.
    pub fn take_ready(&mut self) -> Vec<Arc<TaskSpec>> {
        let mut ready = Vec::new();

        for name in self.order.iter() {
            if self.queued.contains(name) {
                continue;
            }
            let is_new = matches!(
                self.states.get(name).map(|s| s.status),
                Some(TaskStatus::New)
            );
            let unblocked = self.waiting.get(name).map_or(false, |w| w.is_empty());

            if is_new && unblocked {
                self.queued.insert(name.clone());
                if let Some(task) = self.tasks.get(name) {
                    debug!(task = %name, "task ready; enqueueing");
                    ready.push(Arc::clone(task));
                }
            }
        }

        ready
    }

    /// A worker picked the task up and began executing it.
    pub fn on_started(&mut self, name: &str, at: DateTime<Utc>) {
        match self.states.get_mut(name) {
            Some(state) => {
                state.status = TaskStatus::Running;
                state.start_time = Some(at);
                debug!(task = %name, "task running");
            }
            None => warn!(task = %name, "started event for unknown task; ignoring"),
        }
    }

    /// Apply a completion event and return the tasks it newly unblocked.
    pub fn on_completed(
        &mut self,
        name: &str,
        completion: TaskCompletion,
        at: DateTime<Utc>,
    ) -> Vec<Arc<TaskSpec>> {
        let Some(state) = self.states.get_mut(name) else {
            warn!(task = %name, "completion event for unknown task; ignoring");
            return Vec::new();
        };

        state.end_time = Some(at);

        let satisfies_dependents = match completion {
            TaskCompletion::Done => {
                state.status = TaskStatus::Done;
                info!(task = %name, "task done");
                true
            }
            TaskCompletion::Skipped => {
                state.status = TaskStatus::Skipped;
                info!(task = %name, "task skipped");
                true
            }
            TaskCompletion::Failed(reason) => {
                state.status = TaskStatus::Failed;
                warn!(task = %name, reason = %reason, "task failed; dependents stay blocked");
                self.failures.insert(name.to_string(), reason);
                false
            }
        };

        if satisfies_dependents {
            for waits in self.waiting.values_mut() {
                waits.remove(name);
            }
            self.take_ready()
        } else {
            Vec::new()
        }
    }

    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.states.get(name).map(|s| s.status)
    }

    /// Snapshot of all states in topological order.
    pub fn states(&self) -> Vec<TaskState> {
        self.order
            .iter()
            .filter_map(|name| self.states.get(name).cloned())
            .collect()
    }

    /// Failed tasks with their reasons, in topological order.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|name| {
                self.failures
                    .get(name)
                    .map(|reason| (name.clone(), reason.clone()))
            })
            .collect()
    }

    /// Tasks that never left `New` (blocked behind a failure).
    pub fn never_ran(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| {
                matches!(
                    self.states.get(name.as_str()).map(|s| s.status),
                    Some(TaskStatus::New)
                )
            })
            .cloned()
            .collect()
    }
}
