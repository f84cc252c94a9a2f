// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::config::model::TaskSpec;
use crate::errors::{PipedagError, Result};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<String>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<String>,
}

/// In-memory DAG of concrete tasks keyed by task name.
///
/// Built after expansion, so every dependency here refers to a concrete
/// task. Declaration order is preserved so the topological sort is
/// deterministic across runs.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<String, DagNode>,
    /// Task names in declaration order; used as the tie-break for toposort.
    declared: Vec<String>,
}

impl DagGraph {
    /// Build a DAG from concrete (post-expansion) tasks.
    ///
    /// Every dependency must name another concrete task; anything else is an
    /// [`PipedagError::UnknownDependency`].
    pub fn from_tasks(tasks: &[TaskSpec]) -> Result<Self> {
        let mut nodes: HashMap<String, DagNode> = HashMap::new();
        let mut declared = Vec::with_capacity(tasks.len());

        for task in tasks {
            declared.push(task.name.clone());
            nodes.insert(
                task.name.clone(),
                DagNode {
                    deps: task.deps.clone(),
                    dependents: Vec::new(),
                },
            );
        }

        for task in tasks {
            for dep in task.deps.iter() {
                match nodes.get_mut(dep) {
                    Some(dep_node) => dep_node.dependents.push(task.name.clone()),
                    None => {
                        return Err(PipedagError::UnknownDependency {
                            task: task.name.clone(),
                            dep: dep.clone(),
                        })
                    }
                }
            }
        }

        Ok(Self { nodes, declared })
    }

    /// Return all task names in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Topological order with dependencies before dependents.
    ///
    /// Ties are broken by declaration index, so the order is stable across
    /// runs of the same pipeline. Fails with [`PipedagError::Cycle`] naming a
    /// cycle participant.
    pub fn toposort(&self) -> Result<Vec<String>> {
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut order: Vec<String> = Vec::with_capacity(self.declared.len());

        while order.len() < self.declared.len() {
            let before = order.len();

            for name in self.declared.iter() {
                if emitted.contains(name.as_str()) {
                    continue;
                }
                let ready = self
                    .dependencies_of(name)
                    .iter()
                    .all(|dep| emitted.contains(dep.as_str()));
                if ready {
                    emitted.insert(name.as_str());
                    order.push(name.clone());
                }
            }

            if order.len() == before {
                // No progress: every remaining task waits on another
                // remaining task, so each of them sits on a cycle path.
                let stuck = self
                    .declared
                    .iter()
                    .find(|n| !emitted.contains(n.as_str()))
                    .cloned()
                    .unwrap_or_default();
                return Err(PipedagError::Cycle(stuck));
            }
        }

        Ok(order)
    }
}
