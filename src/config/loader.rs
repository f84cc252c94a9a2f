// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::PipelineSpec;
use crate::config::validate::validate_pipeline;
use crate::errors::{PipedagError, Result};

/// Load a pipeline document from a given path and return the raw `PipelineSpec`.
///
/// The decoder is chosen by file suffix (`.toml` or `.yaml`/`.yml`); both
/// populate the same in-memory shape. This only deserializes; it does **not**
/// perform semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PipelineSpec> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    if contents.trim().is_empty() {
        return Err(PipedagError::Config(format!(
            "pipeline file {:?} is empty",
            path
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let pipeline: PipelineSpec = match ext {
        "toml" => toml::from_str(&contents)?,
        "yaml" | "yml" => serde_yaml::from_str(&contents)?,
        other => {
            return Err(PipedagError::Config(format!(
                "unrecognized pipeline file suffix '.{other}' (expected .toml or .yaml)"
            )))
        }
    };

    Ok(pipeline)
}

/// Load a pipeline file from path and run load-time validation.
///
/// This is the entry point the rest of the application should use:
///
/// - Reads TOML or YAML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks params, fan-out fields, dependencies, backend fields, and
///   acyclicity of the declared graph.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineSpec> {
    let pipeline = load_from_path(&path)?;
    validate_pipeline(&pipeline)?;
    Ok(pipeline)
}
