// src/config/mod.rs

//! Pipeline document loading and validation.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a pipeline file from disk, TOML or YAML (`loader.rs`).
//! - Validate load-time invariants like DAG correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    InputSpec, OutputSpec, ParamMap, ParamValue, PipelineSpec, RangeSpec, TaskSpec, TaskType,
    WhenOperator, WhenSpec,
};
pub use validate::validate_pipeline;
