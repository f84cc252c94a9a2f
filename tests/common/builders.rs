#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use pipedag::config::model::{
    InputSpec, OutputSpec, ParamValue, PipelineSpec, RangeSpec, TaskSpec, TaskType, WhenOperator,
    WhenSpec,
};

/// Builder for `PipelineSpec` to simplify test setup.
pub struct PipelineBuilder {
    pipeline: PipelineSpec,
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            pipeline: PipelineSpec {
                name: name.to_string(),
                author: String::new(),
                desc: String::new(),
                timeout: 0,
                labels: vec![],
                envs: vec![],
                params: BTreeMap::new(),
                task_type: None,
                docker_image: None,
                tasks: vec![],
            },
        }
    }

    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.pipeline.tasks.push(task);
        self
    }

    pub fn param(mut self, key: &str, value: ParamValue) -> Self {
        self.pipeline.params.insert(key.to_string(), value);
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.pipeline.envs.push(entry.to_string());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.pipeline.timeout = ms;
        self
    }

    pub fn task_type(mut self, t: TaskType) -> Self {
        self.pipeline.task_type = Some(t);
        self
    }

    pub fn docker_image(mut self, image: &str) -> Self {
        self.pipeline.docker_image = Some(image.to_string());
        self
    }

    pub fn build(self) -> PipelineSpec {
        self.pipeline
    }
}

/// Builder for `TaskSpec`.
pub struct TaskBuilder {
    task: TaskSpec,
}

impl TaskBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            task: TaskSpec {
                name: name.to_string(),
                command: command.to_string(),
                envs: vec![],
                deps: vec![],
                inputs: vec![],
                outputs: vec![],
                params: BTreeMap::new(),
                with_items: None,
                with_range: None,
                namegen: None,
                task_type: None,
                docker_image: None,
                binds: vec![],
                when: vec![],
            },
        }
    }

    pub fn dep(mut self, name: &str) -> Self {
        self.task.deps.push(name.to_string());
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.task.envs.push(entry.to_string());
        self
    }

    pub fn input(mut self, s3: &str, path: &str) -> Self {
        self.task.inputs.push(InputSpec {
            s3: s3.to_string(),
            path: PathBuf::from(path),
        });
        self
    }

    pub fn output(mut self, s3: &str, path: &str) -> Self {
        self.task.outputs.push(OutputSpec {
            s3: s3.to_string(),
            path: PathBuf::from(path),
        });
        self
    }

    pub fn param(mut self, key: &str, value: ParamValue) -> Self {
        self.task.params.insert(key.to_string(), value);
        self
    }

    pub fn with_items(mut self, items: Vec<ParamValue>) -> Self {
        self.task.with_items = Some(items);
        self
    }

    pub fn with_range(mut self, from: i64, to: i64, step: Option<i64>) -> Self {
        self.task.with_range = Some(RangeSpec { from, to, step });
        self
    }

    pub fn namegen(mut self, template: &str) -> Self {
        self.task.namegen = Some(template.to_string());
        self
    }

    pub fn task_type(mut self, t: TaskType) -> Self {
        self.task.task_type = Some(t);
        self
    }

    pub fn docker_image(mut self, image: &str) -> Self {
        self.task.docker_image = Some(image.to_string());
        self
    }

    pub fn bind(mut self, entry: &str) -> Self {
        self.task.binds.push(entry.to_string());
        self
    }

    pub fn when_eq(mut self, input: &str, values: ParamValue) -> Self {
        self.task.when.push(WhenSpec {
            input: input.to_string(),
            operator: WhenOperator::Eq,
            values: Some(values),
        });
        self
    }

    pub fn when_in(mut self, input: &str, values: Vec<ParamValue>) -> Self {
        self.task.when.push(WhenSpec {
            input: input.to_string(),
            operator: WhenOperator::In,
            values: Some(ParamValue::List(values)),
        });
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}
