// src/engine/mod.rs

//! Pipeline execution engine.
//!
//! This module ties together:
//! - the scheduler state machine (waiting-sets, statuses, ready collection)
//! - the worker loop (when → stage inputs → render → dispatch → stage outputs)
//! - the coordinator runtime that owns all state mutation and the bounded
//!   worker pool

pub mod runtime;
pub mod scheduler;
pub mod worker;

pub use runtime::{RunReport, Runtime, RuntimeEvent, RuntimeOptions};
pub use scheduler::{Scheduler, TaskCompletion, TaskState, TaskStatus};
pub use worker::WorkerContext;
