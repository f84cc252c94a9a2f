// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipedagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cycle detected in task graph involving '{0}'")]
    Cycle(String),

    #[error("task '{task}' has unknown dependency '{dep}'")]
    UnknownDependency { task: String, dep: String },

    #[error("expansion produced duplicate task name '{0}'")]
    NameCollision(String),

    #[error("template render failed for {text:?}")]
    Template {
        text: String,
        #[source]
        source: Box<liquid::Error>,
    },

    #[error("staging failed for '{url}': {cause}")]
    Staging { url: String, cause: anyhow::Error },

    #[error("task '{task}' exited with status {code}")]
    TaskFailure { task: String, code: i64 },

    #[error("task '{task}' timed out after {timeout_ms}ms")]
    Timeout { task: String, timeout_ms: u64 },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipedagError>;
