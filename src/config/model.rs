// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameter mapping shared by the pipeline and its tasks.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Milliseconds used internally when `timeout` is 0 or absent.
pub const UNBOUNDED_TIMEOUT_MS: u64 = 365 * 86_400 * 1000;

/// A single pipeline parameter value as it appears in the document.
///
/// Params are heterogeneous (scalars, lists, nested maps), so this keeps the
/// decoded shape and converts at the template / comparison boundaries.
/// Variant order matters for `untagged` deserialization: integers must be
/// tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Convert into the template engine's value model.
    pub fn to_liquid(&self) -> liquid::model::Value {
        use liquid::model::Value;

        match self {
            ParamValue::Null => Value::Nil,
            ParamValue::Bool(b) => Value::scalar(*b),
            ParamValue::Int(i) => Value::scalar(*i),
            ParamValue::Float(f) => Value::scalar(*f),
            ParamValue::String(s) => Value::scalar(s.clone()),
            ParamValue::List(items) => {
                Value::Array(items.iter().map(ParamValue::to_liquid).collect())
            }
            ParamValue::Map(entries) => {
                let mut obj = liquid::Object::new();
                for (k, v) in entries {
                    obj.insert(liquid::model::KString::from_string(k.clone()), v.to_liquid());
                }
                Value::Object(obj)
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

/// Execution substrate for a task's command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Local,
    Docker,
    Kubernetes,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Local => write!(f, "local"),
            TaskType::Docker => write!(f, "docker"),
            TaskType::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// Object-store binding staged before (`inputs`) or after (`outputs`) a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Object-store URL of the form `scheme://bucket/key-prefix`.
    pub s3: String,
    /// Local directory on the executing host.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub s3: String,
    pub path: PathBuf,
}

/// Numeric fan-out: `item` iterates `from, from+step, ...` while `item <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub from: i64,
    pub to: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
}

impl RangeSpec {
    pub fn effective_step(&self) -> i64 {
        self.step.unwrap_or(1)
    }
}

/// Comparison operator for a `when` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhenOperator {
    #[default]
    Eq,
    In,
}

/// Conditional execution clause. A task runs iff every clause passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenSpec {
    /// Name of the pipeline param this clause inspects.
    pub input: String,
    #[serde(default)]
    pub operator: WhenOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<ParamValue>,
}

impl WhenSpec {
    /// Evaluate this clause against the pipeline params.
    ///
    /// - `eq`: passes when `params[input] == values`; an absent `values`
    ///   defaults to `true`.
    /// - `in`: passes when `values` is a list containing `params[input]`.
    pub fn passes(&self, params: &ParamMap) -> bool {
        let actual = params.get(&self.input);

        match self.operator {
            WhenOperator::Eq => {
                let expected = self.values.clone().unwrap_or(ParamValue::Bool(true));
                actual == Some(&expected)
            }
            WhenOperator::In => match &self.values {
                Some(ParamValue::List(candidates)) => {
                    actual.map_or(false, |v| candidates.contains(v))
                }
                // Non-list `values` is rejected at validation; fail closed here.
                _ => false,
            },
        }
    }
}

/// A declared task, before expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,

    /// Shell command, rendered as a Liquid template against the effective params.
    #[serde(default)]
    pub command: String,

    /// `KEY=VALUE` entries, each rendered as a Liquid template.
    #[serde(default)]
    pub envs: Vec<String>,

    /// Names of tasks that must complete before this one starts.
    #[serde(default)]
    pub deps: Vec<String>,

    #[serde(default)]
    pub inputs: Vec<InputSpec>,

    #[serde(default)]
    pub outputs: Vec<OutputSpec>,

    /// Task-local params, overlaid on the pipeline params for templating.
    #[serde(default)]
    pub params: ParamMap,

    /// Fan out one child per element, bound as `params.item`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_items: Option<Vec<ParamValue>>,

    /// Fan out one child per value of a numeric range, bound as `params.item`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_range: Option<RangeSpec>,

    /// Liquid template producing each child's unique name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namegen: Option<String>,

    /// Backend override; absent means inherit the pipeline default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,

    /// Image override for container backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,

    /// `host:container` bind mounts (docker backend only).
    #[serde(default)]
    pub binds: Vec<String>,

    #[serde(default)]
    pub when: Vec<WhenSpec>,
}

impl TaskSpec {
    /// Backend this task resolves to, given the pipeline default.
    pub fn effective_task_type(&self, pipeline_default: Option<TaskType>) -> TaskType {
        self.task_type.or(pipeline_default).unwrap_or_default()
    }

    /// Image this task resolves to, given the pipeline default.
    pub fn effective_image<'a>(&'a self, pipeline_default: Option<&'a str>) -> Option<&'a str> {
        self.docker_image.as_deref().or(pipeline_default)
    }
}

/// Top-level pipeline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub desc: String,

    /// Per-task timeout in milliseconds; 0 means unbounded.
    #[serde(default)]
    pub timeout: u64,

    #[serde(default)]
    pub labels: Vec<String>,

    /// Pipeline-wide `KEY=VALUE` entries applied to every task.
    #[serde(default)]
    pub envs: Vec<String>,

    #[serde(default)]
    pub params: ParamMap,

    /// Default backend for tasks that do not set `task_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,

    /// Default image for tasks that do not set `docker_image`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,

    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

impl PipelineSpec {
    /// Task timeout as a duration; 0 is mapped to roughly one year.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout == 0 {
            Duration::from_millis(UNBOUNDED_TIMEOUT_MS)
        } else {
            Duration::from_millis(self.timeout)
        }
    }
}
