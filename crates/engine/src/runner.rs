// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Runner Entry: ties the Task/Dependency resolvers and the Step
//! Scheduler into a single run — resolving the target, pre-creating job
//! nodes in dependency order, running every job in the resolved chain, and
//! finalizing the event log.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use atkins_core::{
    AtkinsError, EventSink, ExecutionContext, ExecutionTree, IdGen, InterpolationError,
    InterpolationSurface, Node, NodeSnapshot, NodeStatus, Pipeline, ResolutionError, RunResult,
    Summary, UuidIdGen,
};
use atkins_exec::{ExecutorDefaults, ProcessExecutor};
use tracing::{error, info, info_span, Instrument};

use crate::error::EngineError;
use crate::resolve::{resolve_dependency_chain, resolve_task};
use crate::scheduler::run_job;
use crate::vars::{apply_declaration, resolve_dir, DeclarationScope};

/// What a resolved run should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Execute every job in the resolved dependency chain.
    Run,
    /// Resolve and validate the target and its chain without running
    /// anything — a misconfigured `depends_on`/missing job surfaces the same
    /// error it would at run time.
    Lint,
    /// Same resolution as `Lint`, for a caller that wants to print the job
    /// list a real run would execute.
    List,
}

/// Assembled by the binary from flags/environment and handed to
/// [`run_target`] as one value, built and passed whole to the adapter
/// constructor rather than threaded field by field.
#[derive(Clone)]
pub struct RunnerConfig {
    pub executor: Arc<dyn ProcessExecutor>,
    pub event_sink: Arc<dyn EventSink>,
    pub defaults: ExecutorDefaults,
    pub cwd: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
}

/// What `run_target` hands back. `tree`/`summary` are populated once
/// execution actually starts (`RunMode::Run`); `error`, if set, is the first
/// failure a job surfaced — the caller renders the final tree frame before
/// printing it.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub pipeline_name: String,
    pub jobs: Vec<String>,
    pub tree: Option<NodeSnapshot>,
    pub summary: Option<Summary>,
    pub result: RunResult,
    pub error: Option<AtkinsError>,
}

impl RunOutcome {
    /// Exit code for the process boundary: 0 on success, an `ExecError`'s
    /// captured exit code when one bubbled up, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match &self.error {
            Some(e) => e.exit_code(),
            None => 0,
        }
    }
}

/// Resolves `target` against `pipelines` (the main pipeline plus any loaded
/// skills), resolves the matched job's dependency chain, and — in
/// `RunMode::Run` — runs every job in the chain in order.
pub async fn run_target(
    pipelines: Arc<[Pipeline]>,
    target: Option<&str>,
    mode: RunMode,
    config: RunnerConfig,
) -> Result<RunOutcome, EngineError> {
    let span = info_span!("run_target", target = target.unwrap_or("default"));
    run_target_inner(pipelines, target, mode, config)
        .instrument(span)
        .await
}

async fn run_target_inner(
    pipelines: Arc<[Pipeline]>,
    target: Option<&str>,
    mode: RunMode,
    config: RunnerConfig,
) -> Result<RunOutcome, EngineError> {
    let mut enabled = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines.iter() {
        if pipeline_enabled(pipeline, config.cwd.as_deref(), &config.executor)
            .await
            .map_err(EngineError::Execution)?
        {
            enabled.push(pipeline.clone());
        }
    }

    let main_disabled = pipelines
        .iter()
        .find(|p| p.id.is_empty())
        .is_some_and(|main| !enabled.iter().any(|p| p.id.is_empty() && p.name == main.name));
    if main_disabled {
        let name = pipelines
            .iter()
            .find(|p| p.id.is_empty())
            .map(|p| p.name.clone())
            .unwrap_or_default();
        return Err(EngineError::Disabled(name));
    }

    let enabled: Arc<[Pipeline]> = enabled.into();
    let (pipeline, starting) = resolve_entry(&enabled, target)?;

    let chain = resolve_dependency_chain(pipeline.jobs(), starting.as_deref())
        .map_err(EngineError::Execution)?;

    let run_id = UuidIdGen.next();
    if mode != RunMode::Run {
        info!(jobs = chain.len(), "resolved job chain");
        return Ok(RunOutcome {
            run_id,
            pipeline_name: pipeline.name.clone(),
            jobs: chain,
            tree: None,
            summary: None,
            result: RunResult::Passed,
            error: None,
        });
    }

    let executor = Arc::clone(&config.executor);
    let event_sink = Arc::clone(&config.event_sink);

    let tree = ExecutionTree::new(&pipeline.name);
    let mut job_nodes = HashMap::new();
    for name in &chain {
        let Some(job) = pipeline.job(name) else {
            continue;
        };
        let node_id = format!("jobs.{name}");
        let node = if job.is_nested() {
            Node::new_conditional(node_id, name.clone())
        } else {
            Node::new(node_id, name.clone())
        };
        tree.root.push_child(Arc::clone(&node));
        job_nodes.insert(name.clone(), node);
    }

    let mut root_ctx = ExecutionContext::new(Arc::clone(&event_sink));
    root_ctx.cwd = config.cwd.clone();
    if let Some(dir) = &pipeline.dir {
        let resolved = resolve_dir(
            DeclarationScope::Pipeline,
            dir,
            root_ctx.cwd.as_deref(),
            &root_ctx,
            executor.as_ref(),
        )
        .await
        .map_err(EngineError::Execution)?;
        root_ctx.cwd = Some(resolved);
    }
    apply_declaration(
        DeclarationScope::Pipeline,
        &pipeline.declaration,
        &mut root_ctx,
        executor.as_ref(),
    )
    .await
    .map_err(EngineError::Execution)?;

    let run_started_at = Instant::now();
    let mut first_error: Option<AtkinsError> = None;

    for name in &chain {
        if first_error.is_some() {
            break;
        }
        let Some(job) = pipeline.job(name) else {
            continue;
        };
        let Some(job_node) = job_nodes.get(name) else {
            continue;
        };
        node_transition_to_pending(job_node);

        let job_span = info_span!("job", job = %name);
        let started = Instant::now();
        let result = run_job(job, &root_ctx, job_node, &enabled, &executor, run_started_at)
            .instrument(job_span)
            .await;
        match &result {
            Ok(()) => info!(job = %name, elapsed_ms = started.elapsed().as_millis() as u64, "job passed"),
            Err(e) => error!(job = %name, elapsed_ms = started.elapsed().as_millis() as u64, error = %e, "job failed"),
        }
        if let Err(e) = result {
            first_error = Some(e);
        }
    }

    let mut counts = StepCounts::default();
    let snapshot = tree.snapshot();
    count_step_statuses(&snapshot, &mut counts);
    let summary = Summary::compute(
        run_started_at.elapsed(),
        counts.total,
        counts.passed,
        counts.failed,
        counts.skipped,
    );
    event_sink.finalize(summary.clone());

    Ok(RunOutcome {
        run_id,
        pipeline_name: pipeline.name.clone(),
        jobs: chain,
        result: summary.result,
        tree: Some(snapshot),
        summary: Some(summary),
        error: first_error,
    })
}

/// Job nodes pre-created for a nested job start `Conditional`; move it to
/// `Pending` immediately before it runs, since by the time it's reached in
/// the resolved chain the dependency resolver has already decided it runs.
fn node_transition_to_pending(node: &Arc<Node>) {
    node.transition_to(NodeStatus::Pending);
}

#[derive(Default)]
struct StepCounts {
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
}

/// Counts only "plain" step nodes (`jobs.<job>.steps.<n>`, four dot-segments)
/// so a for-loop step's own aggregate status is counted once rather than
/// once per iteration child (`jobs.<job>.steps.<n>.<i>`, five segments).
fn count_step_statuses(node: &NodeSnapshot, counts: &mut StepCounts) {
    if node.id.split('.').count() == 4 && node.id.starts_with("jobs.") {
        counts.total += 1;
        match node.status {
            NodeStatus::Passed => counts.passed += 1,
            NodeStatus::Failed => counts.failed += 1,
            NodeStatus::Skipped => counts.skipped += 1,
            _ => {}
        }
    }
    for child in &node.children {
        count_step_statuses(child, counts);
    }
}

/// Picks the `(pipeline, starting job)` pair `resolve_dependency_chain` runs
/// from: an explicit `target` goes through the Task Resolver's full
/// precedence list; no target at all defers straight to the Dependency
/// Resolver's own `default`-job lookup against the main pipeline.
fn resolve_entry<'a>(
    pipelines: &'a Arc<[Pipeline]>,
    target: Option<&str>,
) -> Result<(&'a Pipeline, Option<String>), EngineError> {
    match target {
        Some(input) => {
            let matched = resolve_task(pipelines, input).map_err(EngineError::Execution)?;
            let job = matched.job.ok_or_else(|| {
                EngineError::Execution(AtkinsError::Resolution(ResolutionError::JobNotFound(
                    input.to_string(),
                )))
            })?;
            Ok((matched.pipeline, Some(job.to_string())))
        }
        None => {
            let main = pipelines
                .iter()
                .find(|p| p.id.is_empty())
                .ok_or_else(|| {
                    EngineError::Execution(AtkinsError::Parse(
                        "no main pipeline loaded".to_string(),
                    ))
                })?;
            Ok((main, None))
        }
    }
}

/// A pipeline is enabled iff at least one `when.files` pattern resolves to an
/// existing file, walking upward from `cwd` to the filesystem root. Patterns
/// may themselves contain `$(...)` substitutions, resolved before the
/// filesystem search runs.
async fn pipeline_enabled(
    pipeline: &Pipeline,
    cwd: Option<&Path>,
    executor: &Arc<dyn ProcessExecutor>,
) -> Result<bool, AtkinsError> {
    if pipeline.when.is_always_enabled() {
        return Ok(true);
    }
    let mut ctx = ExecutionContext::new(Arc::new(atkins_core::NullEventSink));
    ctx.cwd = cwd.map(Path::to_path_buf);
    for pattern in &pipeline.when.files {
        let resolved = atkins_expr::interpolate_string(pattern, &ctx, executor.as_ref())
            .await
            .map_err(|cause| {
                AtkinsError::Interpolation(InterpolationError {
                    surface: InterpolationSurface::PipelineDir,
                    cause: cause.to_string(),
                })
            })?;
        if walk_up_exists(&resolved, cwd) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn walk_up_exists(pattern: &str, start: Option<&Path>) -> bool {
    let candidate = PathBuf::from(pattern);
    if candidate.is_absolute() {
        return candidate.exists();
    }
    let mut dir = start.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    loop {
        if dir.join(&candidate).exists() {
            return true;
        }
        if !dir.pop() {
            return false;
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
