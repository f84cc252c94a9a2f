// tests/property_scheduler.rs

mod common;

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use proptest::prelude::*;

use common::builders::TaskBuilder;

use pipedag::config::model::TaskSpec;
use pipedag::engine::{Scheduler, TaskCompletion, TaskStatus};

// Strategy to generate a valid task set.
// Acyclicity is ensured by only allowing task N to depend on tasks 0..N-1.
fn tasks_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<TaskSpec>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        );

        deps_strat.prop_map(move |raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential_deps)| {
                    let name = format!("task_{i}");
                    let mut builder = TaskBuilder::new(&name, &format!("echo {name}"));

                    // Sanitize dependencies: only allow deps < i.
                    let mut valid_deps = HashSet::new();
                    for dep_idx in potential_deps {
                        if i > 0 {
                            valid_deps.insert(dep_idx % i);
                        }
                    }
                    let mut valid_deps: Vec<usize> = valid_deps.into_iter().collect();
                    valid_deps.sort_unstable();

                    for dep_idx in valid_deps {
                        builder = builder.dep(&format!("task_{dep_idx}"));
                    }
                    builder.build()
                })
                .collect()
        })
    })
}

/// True if `name` transitively depends on a failed task.
fn has_failed_ancestor(
    name: &str,
    deps: &HashMap<String, Vec<String>>,
    scheduler: &Scheduler,
) -> bool {
    let mut stack: Vec<&str> = deps.get(name).map(|d| d.iter().map(String::as_str).collect()).unwrap_or_default();
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(dep) = stack.pop() {
        if !visited.insert(dep) {
            continue;
        }
        match scheduler.status_of(dep) {
            Some(TaskStatus::Failed) => return true,
            Some(TaskStatus::New) => {
                if let Some(more) = deps.get(dep) {
                    stack.extend(more.iter().map(String::as_str));
                }
            }
            _ => {}
        }
    }
    false
}

proptest! {
    #[test]
    fn completions_respect_dependencies_and_runs_terminate(
        tasks in tasks_strategy(10),
        failing_indices in proptest::collection::vec(0..10usize, 0..5),
    ) {
        let names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
        let deps: HashMap<String, Vec<String>> = tasks
            .iter()
            .map(|t| (t.name.clone(), t.deps.clone()))
            .collect();
        let failing: HashSet<String> = failing_indices
            .iter()
            .filter(|&&i| i < names.len())
            .map(|&i| names[i].clone())
            .collect();

        // Declaration order is already topological here (deps only point
        // backwards).
        let mut scheduler = Scheduler::new(tasks, names.clone());

        let mut queue: Vec<_> = scheduler.take_ready();
        let mut handed: HashSet<String> = HashSet::new();
        for t in queue.iter() {
            prop_assert!(handed.insert(t.name.clone()), "task {} seeded twice", t.name);
        }

        let mut steps = 0usize;
        while !queue.is_empty() {
            steps += 1;
            prop_assert!(steps <= 1000, "simulation did not terminate");

            let task = queue.remove(0);

            // Every dependency of a handed-out task must already be settled.
            for dep in deps.get(&task.name).unwrap() {
                let status = scheduler.status_of(dep).unwrap();
                prop_assert!(
                    matches!(status, TaskStatus::Done | TaskStatus::Skipped),
                    "task {} handed out while dep {} is {:?}",
                    task.name,
                    dep,
                    status
                );
            }

            scheduler.on_started(&task.name, Utc::now());
            let completion = if failing.contains(&task.name) {
                TaskCompletion::Failed("injected failure".to_string())
            } else {
                TaskCompletion::Done
            };

            for newly_ready in scheduler.on_completed(&task.name, completion, Utc::now()) {
                prop_assert!(
                    handed.insert(newly_ready.name.clone()),
                    "task {} handed out twice",
                    newly_ready.name
                );
                queue.push(newly_ready);
            }
        }

        // At the end: no task is running, and every task is either done,
        // failed, or still new behind a failed ancestor.
        for name in names.iter() {
            match scheduler.status_of(name).unwrap() {
                TaskStatus::Done | TaskStatus::Failed => {}
                TaskStatus::New => {
                    prop_assert!(
                        has_failed_ancestor(name, &deps, &scheduler),
                        "task {name} left new without a failed ancestor"
                    );
                }
                other => prop_assert!(false, "task {name} ended as {other:?}"),
            }
        }
    }
}
