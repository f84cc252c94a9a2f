// tests/graph_toposort.rs

mod common;

use common::builders::{PipelineBuilder, TaskBuilder};

use pipedag::dag::DagGraph;
use pipedag::errors::PipedagError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn independent_tasks_keep_declaration_order() -> TestResult {
    let pipeline = PipelineBuilder::new("flat")
        .with_task(TaskBuilder::new("zeta", "echo z").build())
        .with_task(TaskBuilder::new("yankee", "echo y").build())
        .with_task(TaskBuilder::new("xray", "echo x").build())
        .build();

    let graph = DagGraph::from_tasks(&pipeline.tasks)?;
    assert_eq!(graph.toposort()?, vec!["zeta", "yankee", "xray"]);
    Ok(())
}

#[test]
fn dependencies_come_before_dependents() -> TestResult {
    // Declared sink-first, so the sort has to reorder.
    let pipeline = PipelineBuilder::new("diamond")
        .with_task(TaskBuilder::new("d", "echo d").dep("b").dep("c").build())
        .with_task(TaskBuilder::new("b", "echo b").dep("a").build())
        .with_task(TaskBuilder::new("c", "echo c").dep("a").build())
        .with_task(TaskBuilder::new("a", "echo a").build())
        .build();

    let graph = DagGraph::from_tasks(&pipeline.tasks)?;
    let order = graph.toposort()?;

    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(pos("a") < pos("b"));
    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("d"));
    assert!(pos("c") < pos("d"));
    // Ties resolve by declaration index.
    assert!(pos("b") < pos("c"));
    Ok(())
}

#[test]
fn the_order_is_stable_across_calls() -> TestResult {
    let pipeline = PipelineBuilder::new("stable")
        .with_task(TaskBuilder::new("root", "echo r").build())
        .with_task(TaskBuilder::new("m1", "echo 1").dep("root").build())
        .with_task(TaskBuilder::new("m2", "echo 2").dep("root").build())
        .with_task(TaskBuilder::new("sink", "echo s").dep("m1").dep("m2").build())
        .build();

    let graph = DagGraph::from_tasks(&pipeline.tasks)?;
    let first = graph.toposort()?;
    let second = graph.toposort()?;

    assert_eq!(first, second);
    assert_eq!(first, vec!["root", "m1", "m2", "sink"]);
    Ok(())
}

#[test]
fn a_cycle_is_reported_with_a_participant() -> TestResult {
    let pipeline = PipelineBuilder::new("cyclic")
        .with_task(TaskBuilder::new("a", "echo a").dep("c").build())
        .with_task(TaskBuilder::new("b", "echo b").dep("a").build())
        .with_task(TaskBuilder::new("c", "echo c").dep("b").build())
        .build();

    let graph = DagGraph::from_tasks(&pipeline.tasks)?;
    let err = graph.toposort().unwrap_err();

    assert!(
        matches!(err, PipedagError::Cycle(name) if ["a", "b", "c"].contains(&name.as_str()))
    );
    Ok(())
}

#[test]
fn adjacency_is_exposed_in_both_directions() -> TestResult {
    let pipeline = PipelineBuilder::new("adjacency")
        .with_task(TaskBuilder::new("a", "echo a").build())
        .with_task(TaskBuilder::new("b", "echo b").dep("a").build())
        .with_task(TaskBuilder::new("c", "echo c").dep("a").build())
        .build();

    let graph = DagGraph::from_tasks(&pipeline.tasks)?;
    assert_eq!(graph.dependencies_of("b"), &["a".to_string()]);
    assert_eq!(graph.dependents_of("a"), &["b".to_string(), "c".to_string()]);
    assert!(graph.dependencies_of("a").is_empty());
    Ok(())
}

#[test]
fn unknown_dependencies_fail_graph_construction() {
    let pipeline = PipelineBuilder::new("dangling")
        .with_task(TaskBuilder::new("a", "echo a").dep("missing").build())
        .build();

    let err = DagGraph::from_tasks(&pipeline.tasks).unwrap_err();
    assert!(
        matches!(err, PipedagError::UnknownDependency { task, dep } if task == "a" && dep == "missing")
    );
}
