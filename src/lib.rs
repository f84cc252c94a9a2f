// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod logging;
pub mod stage;
pub mod template;

use std::sync::Arc;

use tracing::info;

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::PipelineSpec;
use crate::dag::DagGraph;
use crate::engine::{RunReport, Runtime, RuntimeOptions, Scheduler, WorkerContext};
use crate::errors::Result;
use crate::exec::{BackendRouter, TaskBackend};
use crate::expand::expand_pipeline;
use crate::stage::{S3Stager, Stager};
use crate::template::TemplateEngine;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline loading and validation
/// - expansion and graph construction
/// - the scheduler / worker pool runtime
/// - the production staging adapter and backend dispatcher
pub async fn run(args: CliArgs) -> Result<RunReport> {
    let Command::Run {
        file,
        workers,
        dry_run,
    } = args.command;

    let pipeline = load_and_validate(&file)?;
    info!(
        pipeline = %pipeline.name,
        tasks = pipeline.tasks.len(),
        "pipeline loaded"
    );

    if dry_run {
        print_dry_run(&pipeline)?;
        return Ok(RunReport {
            states: Vec::new(),
            failed: Vec::new(),
            never_ran: Vec::new(),
        });
    }

    let report = execute_pipeline(
        &pipeline,
        Arc::new(S3Stager::new()),
        Arc::new(BackendRouter::new()),
        RuntimeOptions {
            worker_count: workers,
        },
    )
    .await?;

    print_summary(&report);
    Ok(report)
}

/// Execute an already-validated pipeline with the given staging adapter and
/// backend dispatcher.
///
/// This is the seam integration tests use to substitute fakes for the object
/// store and the execution backends.
pub async fn execute_pipeline(
    pipeline: &PipelineSpec,
    stager: Arc<dyn Stager>,
    backend: Arc<dyn TaskBackend>,
    options: RuntimeOptions,
) -> Result<RunReport> {
    let engine = TemplateEngine::new()?;

    let concrete = expand_pipeline(pipeline, &engine)?;
    let graph = DagGraph::from_tasks(&concrete)?;
    let order = graph.toposort()?;

    let scheduler = Scheduler::new(concrete, order);
    let ctx = Arc::new(WorkerContext {
        pipeline_params: pipeline.params.clone(),
        pipeline_envs: pipeline.envs.clone(),
        default_task_type: pipeline.task_type,
        default_image: pipeline.docker_image.clone(),
        timeout: pipeline.effective_timeout(),
        engine,
        stager,
        backend,
    });

    Runtime::new(scheduler, ctx, options).run().await
}

/// Print the expanded task list without executing anything.
fn print_dry_run(pipeline: &PipelineSpec) -> Result<()> {
    let engine = TemplateEngine::new()?;
    let concrete = expand_pipeline(pipeline, &engine)?;
    let graph = DagGraph::from_tasks(&concrete)?;
    let order = graph.toposort()?;

    println!("pipedag dry-run: {} ({} tasks)", pipeline.name, order.len());
    for name in order.iter() {
        let Some(task) = concrete.iter().find(|t| &t.name == name) else {
            continue;
        };
        println!("  - {name}");
        println!(
            "      backend: {}",
            task.effective_task_type(pipeline.task_type)
        );
        println!("      cmd: {}", task.command);
        if !task.deps.is_empty() {
            println!("      deps: {:?}", task.deps);
        }
        if !task.when.is_empty() {
            println!("      when: {} clause(s)", task.when.len());
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    if report.success() {
        println!("pipeline succeeded ({} tasks)", report.states.len());
        return;
    }

    eprintln!("pipeline failed:");
    for (name, reason) in report.failed.iter() {
        eprintln!("  - {name}: {reason}");
    }
    for name in report.never_ran.iter() {
        eprintln!("  - {name}: never ran (blocked by a failed dependency)");
    }
}
