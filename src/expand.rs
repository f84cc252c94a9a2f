// src/expand.rs

//! Expansion planner.
//!
//! Turns declared tasks with `with_items` or `with_range` into concrete child
//! tasks before scheduling. Children share the parent's command, envs, deps,
//! inputs, outputs, and params, overlaid with `params.item`; the parent
//! itself is never executed. Downstream tasks that depend on the parent name
//! are rewritten to depend on the whole set of children (fan-in).

use std::collections::{HashMap, HashSet};

use crate::config::model::{ParamValue, PipelineSpec, TaskSpec};
use crate::errors::{PipedagError, Result};
use crate::template::TemplateEngine;

/// Expand every declared task into its concrete tasks, in declaration order.
///
/// Concrete task names are checked for global uniqueness; a `namegen` that
/// renders the same name twice is a [`PipedagError::NameCollision`]. An empty
/// `with_items` list yields zero children; dependents of such a task treat
/// the dependency as satisfied.
pub fn expand_pipeline(pipeline: &PipelineSpec, engine: &TemplateEngine) -> Result<Vec<TaskSpec>> {
    let mut concrete: Vec<TaskSpec> = Vec::with_capacity(pipeline.tasks.len());
    // Declared name -> concrete child names, for tasks that were expanded.
    let mut children_of: HashMap<String, Vec<String>> = HashMap::new();

    for task in pipeline.tasks.iter() {
        if let Some(items) = &task.with_items {
            let namegen = task.namegen.as_deref().unwrap_or_default();
            let mut names = Vec::with_capacity(items.len());

            for item in items.iter() {
                let child = make_child(task, item.clone());
                let name = engine.render(namegen, &child.params)?;
                names.push(name.clone());
                concrete.push(TaskSpec { name, ..child });
            }

            children_of.insert(task.name.clone(), names);
        } else if let Some(range) = &task.with_range {
            let step = range.effective_step();
            if step <= 0 {
                return Err(PipedagError::Config(format!(
                    "task '{}' has with_range step {step} (must be positive)",
                    task.name
                )));
            }

            let mut names = Vec::new();
            let mut i = range.from;

            while i <= range.to {
                let child = make_child(task, ParamValue::Int(i));
                let name = match task.namegen.as_deref() {
                    Some(namegen) if !namegen.is_empty() => {
                        engine.render(namegen, &child.params)?
                    }
                    _ => format!("{}_{}", task.name, i),
                };
                names.push(name.clone());
                concrete.push(TaskSpec { name, ..child });
                i += step;
            }

            children_of.insert(task.name.clone(), names);
        } else {
            concrete.push(task.clone());
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for task in concrete.iter() {
        if !seen.insert(task.name.as_str()) {
            return Err(PipedagError::NameCollision(task.name.clone()));
        }
    }

    // Fan-in: a dependency on an expanded parent becomes a dependency on all
    // of its children.
    for task in concrete.iter_mut() {
        let deps = std::mem::take(&mut task.deps);
        task.deps = deps
            .into_iter()
            .flat_map(|dep| match children_of.get(&dep) {
                Some(names) => names.clone(),
                None => vec![dep],
            })
            .collect();
    }

    Ok(concrete)
}

/// A concrete child of a parametric task, before its name is assigned.
fn make_child(parent: &TaskSpec, item: ParamValue) -> TaskSpec {
    let mut child = parent.clone();
    child.with_items = None;
    child.with_range = None;
    child.namegen = None;
    child.params.insert("item".to_string(), item);
    child
}
