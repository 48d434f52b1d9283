// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Step Scheduler: applies a job's declaration block, enforces
//! `Requires`, installs an optional job-level timeout, and runs a job's
//! steps under the Regular/Detach/Deferred synchronization contract.
//! Detached steps run concurrently via a [`tokio::task::JoinSet`] — the
//! idiomatic async-Rust analogue of a per-job error group.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::task::JoinSet;

use atkins_core::{
    AtkinsError, CancellationError, Event, ExecError, ExecutionContext, InterpolationError,
    InterpolationSurface, Job, Node, Pipeline, ResolutionError, Step, StepBody, StepMode,
    StepResult, Value,
};
use atkins_exec::{Command as ExecCommand, LineSink, ProcessExecutor};
use atkins_expr::{evaluate_if, expand_for, interpolate_command, interpolate_map, Iteration};

use crate::resolve::{resolve_task, TaskMatch};
use crate::vars::{apply_declaration, apply_step_declaration, resolve_dir, DeclarationScope};

/// Runs `job`'s full step sequence, attached to `job_node` (pre-created by
/// the caller). `ctx` is the context inherited from the
/// job's dependency chain (or the run root); `pipelines` is the full set of
/// loaded pipelines (main + skills), used to resolve `Task` steps regardless
/// of which pipeline declared them.
pub async fn run_job(
    job: &Job,
    ctx: &ExecutionContext,
    job_node: &Arc<Node>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    let mut job_ctx = ctx.child();
    job_ctx.current_job = Some(job.name.clone());

    job_node.mark_started(run_started_at.elapsed());
    job_node.transition_to(atkins_core::NodeStatus::Running);

    let result = run_job_inner(job, &mut job_ctx, job_node, pipelines, executor, run_started_at).await;

    let final_status = if result.is_ok() {
        atkins_core::NodeStatus::Passed
    } else {
        atkins_core::NodeStatus::Failed
    };
    job_node.transition_to(final_status);
    job_node.mark_duration(run_started_at.elapsed().saturating_sub(
        job_node_start(job_node).unwrap_or_default(),
    ));
    ctx.mark_job_completed(job.name.clone());
    result
}

fn job_node_start(node: &Arc<Node>) -> Option<std::time::Duration> {
    node.snapshot().start_offset
}

async fn run_job_inner(
    job: &Job,
    job_ctx: &mut ExecutionContext,
    job_node: &Arc<Node>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    apply_declaration(DeclarationScope::Job, &job.declaration, job_ctx, executor.as_ref()).await?;

    if let Some(dir) = &job.dir {
        let resolved = resolve_dir(
            DeclarationScope::Job,
            dir,
            job_ctx.cwd.as_deref(),
            job_ctx,
            executor.as_ref(),
        )
        .await?;
        job_ctx.cwd = Some(resolved);
    }

    enforce_requires(job, job_ctx)?;

    let run = run_steps(job, job_ctx, job_node, pipelines, executor, run_started_at);
    match job.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                job_ctx.cancellation.cancel();
                Err(AtkinsError::Cancellation(CancellationError))
            }
        },
        None => run.await,
    }
}

fn enforce_requires(job: &Job, ctx: &ExecutionContext) -> Result<(), AtkinsError> {
    if job.requires.is_empty() {
        return Ok(());
    }
    let namespace = ctx.namespace();
    let missing: Vec<String> = job
        .requires
        .iter()
        .filter(|name| !namespace.contains_key(name.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ResolutionError::MissingRequirements {
        job: job.name.clone(),
        required: job.requires.clone(),
        missing,
    }
    .into())
}

/// The first failure observed across regular, detached, and deferred steps
/// wins — a cancelled run prefers to surface the first failure cause over
/// any subsequent one; later failures are recorded on their own
/// nodes/events but don't displace it.
type SharedError = Arc<Mutex<Option<AtkinsError>>>;

fn record_first_error(cell: &SharedError, err: AtkinsError) {
    let mut guard = cell.lock();
    if guard.is_none() {
        *guard = Some(err);
    }
}

/// Iterates `job.steps` once, in source order: `Deferred` steps are
/// collected without running, `Detach` steps are spawned immediately into a
/// `JoinSet` without blocking the loop, and `Regular` steps run
/// synchronously — unless an earlier regular step has already failed, in
/// which case later regular steps are skipped entirely (no node, no event).
/// Deferred steps always run, once every regular step has settled and every
/// detached step has joined.
async fn run_steps(
    job: &Job,
    job_ctx: &ExecutionContext,
    job_node: &Arc<Node>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    let job_error: SharedError = Arc::new(Mutex::new(None));
    let mut detached: JoinSet<Result<(), AtkinsError>> = JoinSet::new();
    let mut deferred_steps: Vec<&Step> = Vec::new();

    for step in &job.steps {
        match step.mode {
            StepMode::Deferred => {
                deferred_steps.push(step);
            }
            StepMode::Detach => {
                let step = step.clone();
                let step_ctx = job_ctx.child();
                let job_name = job.name.clone();
                let job_node = Arc::clone(job_node);
                let pipelines = Arc::clone(pipelines);
                let executor = Arc::clone(executor);
                let job_error = Arc::clone(&job_error);
                detached.spawn(async move {
                    let result = run_step(
                        &step,
                        &job_name,
                        &step_ctx,
                        &job_node,
                        &pipelines,
                        &executor,
                        run_started_at,
                    )
                    .await;
                    if let Err(e) = &result {
                        record_first_error(&job_error, clone_error(e));
                    }
                    result
                });
            }
            StepMode::Regular => {
                if job_error.lock().is_some() {
                    continue;
                }
                let result = run_step(
                    step,
                    &job.name,
                    job_ctx,
                    job_node,
                    pipelines,
                    executor,
                    run_started_at,
                )
                .await;
                if let Err(e) = result {
                    record_first_error(&job_error, e);
                }
            }
        }
    }

    // Wait for every detached step before touching deferred steps: the job
    // returns only after every regular step has settled, every detached
    // step has finished, and every deferred step has finished.
    while let Some(joined) = detached.join_next().await {
        if let Ok(Err(e)) = joined {
            record_first_error(&job_error, e);
        }
        // A panicking detached task is treated the same as a process
        // error would be: the first error recorded wins, panics here only
        // surface if nothing else already failed, via the JoinError path
        // being silently absorbed above (no clean `AtkinsError` to build
        // from a panic payload).
    }

    for step in deferred_steps {
        let result = run_step(
            step,
            &job.name,
            job_ctx,
            job_node,
            pipelines,
            executor,
            run_started_at,
        )
        .await;
        if let Err(e) = result {
            // A deferred step's own failure becomes the job's error only
            // if nothing earlier already failed: it doesn't override an
            // earlier failure.
            record_first_error(&job_error, e);
        }
    }

    match Arc::try_unwrap(job_error) {
        Ok(mutex) => match mutex.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        },
        Err(shared) => match shared.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        },
    }
}

/// `AtkinsError` doesn't derive `Clone` as a whole (it wraps `std::io::Error`
/// in one variant), but every variant the scheduler itself ever produces
/// does. Detached steps need to hand their error back across both the
/// `JoinSet` result and the shared first-error cell, so this reconstructs an
/// equivalent value rather than requiring `Clone` on the whole enum.
fn clone_error(err: &AtkinsError) -> AtkinsError {
    match err {
        AtkinsError::Parse(s) => AtkinsError::Parse(s.clone()),
        AtkinsError::Resolution(e) => AtkinsError::Resolution(e.clone()),
        AtkinsError::Interpolation(e) => AtkinsError::Interpolation(e.clone()),
        AtkinsError::Exec(e) => AtkinsError::Exec(e.clone()),
        AtkinsError::Cancellation(e) => AtkinsError::Cancellation(e.clone()),
        AtkinsError::Io(e) => AtkinsError::Parse(format!("io error: {e}")),
    }
}

/// One step's full lifecycle: allocate its node, apply its own `vars`/`env`,
/// evaluate `if`, expand `for`, and run its body once per iteration (or
/// once, for a step with no `for`).
async fn run_step(
    step: &Step,
    job_name: &str,
    job_ctx: &ExecutionContext,
    job_node: &Arc<Node>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    let index = job_ctx.next_step_index(job_name);
    let node_id = format!("jobs.{job_name}.steps.{index}");
    let node = Node::new_step(
        node_id.clone(),
        if step.name.is_empty() {
            format!("step-{index}")
        } else {
            step.name.clone()
        },
        step.if_expr.clone(),
        Vec::new(),
        step.is_deferred(),
    );
    job_node.push_child(Arc::clone(&node));
    node.mark_started(run_started_at.elapsed());

    let should_run = match evaluate_if(step, job_ctx) {
        Ok(b) => b,
        Err(e) => {
            node.transition_to(atkins_core::NodeStatus::Failed);
            return Err(AtkinsError::Parse(format!(
                "if condition for step `{}` failed: {e}",
                step.name
            )));
        }
    };
    if !should_run {
        node.transition_to(atkins_core::NodeStatus::Skipped);
        let mut event = Event::step(node_id.clone(), format!("jobs.{job_name}"));
        event.output = Some("skipped".to_string());
        job_ctx.event_sink.record(event);
        return Ok(());
    }

    node.transition_to(atkins_core::NodeStatus::Running);

    let mut step_ctx = job_ctx.child();
    apply_step_declaration(&step.declaration, &mut step_ctx, executor.as_ref()).await?;

    let iterations = expand_for(step, &step_ctx, executor.as_ref())
        .await
        .map_err(|cause| {
            AtkinsError::Interpolation(InterpolationError {
                surface: InterpolationSurface::StepForSource,
                cause: cause.to_string(),
            })
        })?;

    if step.for_spec.is_some() {
        run_for_loop(
            step,
            job_name,
            &step_ctx,
            &node,
            iterations,
            pipelines,
            executor,
            run_started_at,
        )
        .await
    } else {
        let result = execute_once(
            step,
            job_name,
            &step_ctx,
            &node,
            pipelines,
            executor,
            run_started_at,
        )
        .await;
        finish_node(&node, &result, run_started_at);
        result
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_for_loop(
    step: &Step,
    job_name: &str,
    step_ctx: &ExecutionContext,
    step_node: &Arc<Node>,
    iterations: Vec<Iteration>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    if iterations.is_empty() {
        // An empty iterable: zero iterations, step Passed.
        step_node.transition_to(atkins_core::NodeStatus::Passed);
        step_node.mark_duration(std::time::Duration::ZERO);
        return Ok(());
    }

    let mut last_err = None;
    for (i, iteration) in iterations.into_iter().enumerate() {
        let iter_id = format!("{}.{}", step_node.id, i);
        let iter_node = Node::new(iter_id, format!("{}[{i}]", step.name));
        step_node.push_child(Arc::clone(&iter_node));

        let mut iter_ctx = step_ctx.child();
        for (name, value) in iteration.bindings {
            iter_ctx.vars.insert(name, value);
        }

        let result = execute_once(
            step,
            job_name,
            &iter_ctx,
            &iter_node,
            pipelines,
            executor,
            run_started_at,
        )
        .await;
        finish_node(&iter_node, &result, run_started_at);
        if let Err(e) = result {
            last_err = Some(e);
        }
    }

    let status = if last_err.is_some() {
        atkins_core::NodeStatus::Failed
    } else {
        atkins_core::NodeStatus::Passed
    };
    step_node.transition_to(status);
    step_node.mark_duration(run_started_at.elapsed());
    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn finish_node(node: &Arc<Node>, result: &Result<(), AtkinsError>, run_started_at: Instant) {
    let status = if result.is_ok() {
        atkins_core::NodeStatus::Passed
    } else {
        atkins_core::NodeStatus::Failed
    };
    node.transition_to(status);
    node.mark_duration(run_started_at.elapsed());
}

/// Resolves and runs a step body exactly once: a `Task` invocation recurses
/// into [`run_job`] for the resolved target, a `Run`/`Cmd`/`Cmds` body is
/// interpolated and executed via the `ProcessExecutor`.
async fn execute_once(
    step: &Step,
    job_name: &str,
    ctx: &ExecutionContext,
    node: &Arc<Node>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    match &step.body {
        StepBody::Task(target) => {
            run_task_step(target, &step.with, ctx, node, pipelines, executor, run_started_at).await
        }
        StepBody::Run(_) | StepBody::Cmd(_) | StepBody::Cmds(_) => {
            run_shell_step(step, job_name, ctx, node, executor).await
        }
    }
}

async fn run_shell_step(
    step: &Step,
    job_name: &str,
    ctx: &ExecutionContext,
    node: &Arc<Node>,
    executor: &Arc<dyn ProcessExecutor>,
) -> Result<(), AtkinsError> {
    let raw = step.body.command_text().unwrap_or_default();
    let resolved = interpolate_command(&raw, ctx, executor.as_ref())
        .await
        .map_err(|cause| {
            AtkinsError::Interpolation(InterpolationError {
                surface: InterpolationSurface::RunCommand,
                cause: cause.to_string(),
            })
        })?;

    let mut command = ExecCommand::new("/bin/sh").arg("-c").arg(resolved.clone());
    if let Some(dir) = &ctx.cwd {
        command = command.dir(dir.clone());
    }
    for (key, value) in &ctx.env {
        command = command.env(key.clone(), value.to_display_string());
    }

    let node_for_sink = Arc::clone(node);
    let sink: Arc<LineSink<_>> = Arc::new(LineSink::new(move |line: &str| {
        node_for_sink.append_output(&format!("{line}\n"));
    }));
    command.stdout_sink = Some(sink.clone());
    command.stderr_sink = Some(sink);

    let started = Instant::now();
    let result = executor.run(ctx.cancellation.clone(), command).await;

    let node_id = node.id.clone();
    let mut event = Event::step(node_id.clone(), format!("jobs.{job_name}"));
    event.command = Some(resolved);
    event.dir = ctx.cwd.as_ref().map(|p| p.display().to_string());
    event.output = Some(result.preferred_output().to_string());
    event.exit_code = Some(result.exit_code);
    event.duration = started.elapsed();

    if result.success() {
        ctx.event_sink.record(event);
        ctx.record_result(
            node_id,
            StepResult {
                passed: true,
                exit_code: Some(result.exit_code),
            },
        );
        return Ok(());
    }

    let cancelled = result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("cancelled") || e.contains("timed out"));
    let cause = result
        .error
        .clone()
        .unwrap_or_else(|| format!("command exited with code {}", result.exit_code));
    event.error = Some(cause.clone());
    ctx.event_sink.record(event);
    ctx.record_result(
        node_id,
        StepResult {
            passed: false,
            exit_code: Some(result.exit_code),
        },
    );

    if cancelled {
        return Err(AtkinsError::Cancellation(CancellationError));
    }
    Err(AtkinsError::Exec(
        ExecError::new(cause)
            .with_output(result.preferred_output().to_string())
            .with_exit_code(result.exit_code),
    ))
}

#[allow(clippy::too_many_arguments)]
async fn run_task_step(
    target: &str,
    with: &IndexMap<String, Value>,
    ctx: &ExecutionContext,
    node: &Arc<Node>,
    pipelines: &Arc<[Pipeline]>,
    executor: &Arc<dyn ProcessExecutor>,
    run_started_at: Instant,
) -> Result<(), AtkinsError> {
    let matched = resolve_task(pipelines, target)?;
    let TaskMatch { pipeline, job } = matched;
    let job_name = job.ok_or_else(|| ResolutionError::JobNotFound(target.to_string()))?;
    let target_job = pipeline
        .job(job_name)
        .ok_or_else(|| ResolutionError::JobNotFound(job_name.to_string()))?
        .clone();

    let mut task_ctx = ctx.child();
    task_ctx.current_pipeline = Some(pipeline.id.clone());
    let mut params = with.clone();
    interpolate_map(&mut params, ctx, executor.as_ref())
        .await
        .map_err(|cause| {
            AtkinsError::Interpolation(InterpolationError {
                surface: InterpolationSurface::RunCommand,
                cause: cause.to_string(),
            })
        })?;
    for (key, value) in params {
        task_ctx.vars.insert(key, value);
    }

    let nested_node = Node::new(format!("{}.task", node.id), target_job.name.clone());
    node.push_child(Arc::clone(&nested_node));

    // `run_job` and `run_task_step` are mutually recursive through this
    // call; boxing breaks the otherwise-infinite future type the two
    // functions would generate calling each other directly.
    let fut: Pin<Box<dyn Future<Output = Result<(), AtkinsError>> + Send + '_>> = Box::pin(
        run_job(&target_job, &task_ctx, &nested_node, pipelines, executor, run_started_at),
    );
    fut.await
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
