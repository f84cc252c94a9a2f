// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ParamValue, PipelineSpec, TaskType, WhenOperator};
use crate::errors::{PipedagError, Result};

/// Run load-time validation against a decoded pipeline.
///
/// This checks:
/// - every pipeline param has a value (no nulls)
/// - task names are unique and commands are non-empty
/// - at most one of `with_items` / `with_range` per task, with a usable
///   `namegen` / range
/// - `when` clauses are well-formed
/// - all `deps` refer to declared tasks
/// - the declared graph has no cycles
/// - backend-specific fields are consistent (docker image, kubernetes binds)
pub fn validate_pipeline(pipeline: &PipelineSpec) -> Result<()> {
    validate_params(pipeline)?;
    validate_task_shapes(pipeline)?;
    validate_task_dependencies(pipeline)?;
    validate_dag(pipeline)?;
    validate_backend_fields(pipeline)?;
    Ok(())
}

fn validate_params(pipeline: &PipelineSpec) -> Result<()> {
    for (name, value) in pipeline.params.iter() {
        if value.is_null() {
            return Err(PipedagError::Config(format!("param '{name}' is not set")));
        }
    }
    Ok(())
}

fn validate_task_shapes(pipeline: &PipelineSpec) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for task in pipeline.tasks.iter() {
        if task.name.is_empty() {
            return Err(PipedagError::Config("task with empty name".to_string()));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(PipedagError::Config(format!(
                "duplicate task name '{}'",
                task.name
            )));
        }
        if task.command.is_empty() {
            return Err(PipedagError::Config(format!(
                "task '{}' has an empty command",
                task.name
            )));
        }

        if task.with_items.is_some() && task.with_range.is_some() {
            return Err(PipedagError::Config(format!(
                "task '{}' sets both with_items and with_range",
                task.name
            )));
        }

        if task.with_items.is_some() && task.namegen.as_deref().unwrap_or_default().is_empty() {
            return Err(PipedagError::Config(format!(
                "task '{}' uses with_items but has no namegen",
                task.name
            )));
        }

        if let Some(range) = &task.with_range {
            if range.effective_step() <= 0 {
                return Err(PipedagError::Config(format!(
                    "task '{}' has with_range step {} (must be positive)",
                    task.name,
                    range.effective_step()
                )));
            }
            if range.to < range.from {
                return Err(PipedagError::Config(format!(
                    "task '{}' has with_range to={} below from={}",
                    task.name, range.to, range.from
                )));
            }
        }

        for clause in task.when.iter() {
            if clause.operator == WhenOperator::In
                && !matches!(clause.values, Some(ParamValue::List(_)))
            {
                return Err(PipedagError::Config(format!(
                    "task '{}': when clause on '{}' uses operator 'in' without a list of values",
                    task.name, clause.input
                )));
            }
        }
    }

    Ok(())
}

fn validate_task_dependencies(pipeline: &PipelineSpec) -> Result<()> {
    let names: HashSet<&str> = pipeline.tasks.iter().map(|t| t.name.as_str()).collect();

    for task in pipeline.tasks.iter() {
        for dep in task.deps.iter() {
            if !names.contains(dep.as_str()) {
                return Err(PipedagError::UnknownDependency {
                    task: task.name.clone(),
                    dep: dep.clone(),
                });
            }
            if dep == &task.name {
                return Err(PipedagError::Cycle(task.name.clone()));
            }
        }
    }
    Ok(())
}

fn validate_dag(pipeline: &PipelineSpec) -> Result<()> {
    // Edge direction: dep -> task, so a topological sort yields dependencies
    // before dependents and fails if there is a cycle.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in pipeline.tasks.iter() {
        graph.add_node(task.name.as_str());
    }

    for task in pipeline.tasks.iter() {
        for dep in task.deps.iter() {
            graph.add_edge(dep.as_str(), task.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipedagError::Cycle(cycle.node_id().to_string())),
    }
}

fn validate_backend_fields(pipeline: &PipelineSpec) -> Result<()> {
    for task in pipeline.tasks.iter() {
        match task.effective_task_type(pipeline.task_type) {
            TaskType::Local => {}
            TaskType::Docker => {
                if task.effective_image(pipeline.docker_image.as_deref()).is_none() {
                    return Err(PipedagError::Config(format!(
                        "task '{}' runs on docker but no docker_image is set",
                        task.name
                    )));
                }
            }
            TaskType::Kubernetes => {
                if task.effective_image(pipeline.docker_image.as_deref()).is_none() {
                    return Err(PipedagError::Config(format!(
                        "task '{}' runs on kubernetes but no docker_image is set",
                        task.name
                    )));
                }
                if !task.binds.is_empty() {
                    return Err(PipedagError::UnsupportedFeature(format!(
                        "task '{}': binds are not supported on the kubernetes backend",
                        task.name
                    )));
                }
            }
        }
    }
    Ok(())
}
