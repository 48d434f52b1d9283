// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn sh(script: &str) -> Command {
    Command::new("/bin/sh").arg("-c").arg(script)
}

#[tokio::test]
async fn run_captures_stdout_on_success() {
    let executor = OsProcessExecutor::new();
    let result = executor.run(CancellationToken::new(), sh("echo hello")).await;
    assert!(result.success());
    assert_eq!(result.stdout.trim(), "hello");
}

#[tokio::test]
async fn run_reports_nonzero_exit() {
    let executor = OsProcessExecutor::new();
    let result = executor
        .run(CancellationToken::new(), sh("echo stdout error output; exit 1"))
        .await;
    assert!(!result.success());
    assert_eq!(result.exit_code, 1);
    assert!(result.stdout.contains("stdout error output"));
}

#[tokio::test]
async fn run_captures_stderr_separately() {
    let executor = OsProcessExecutor::new();
    let result = executor
        .run(
            CancellationToken::new(),
            sh("echo stderr error output >&2; exit 1"),
        )
        .await;
    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("stderr error output"));
    assert_eq!(result.preferred_output(), result.stderr.as_str());
}

#[tokio::test]
async fn run_spawn_failure_is_not_a_panic() {
    let executor = OsProcessExecutor::new();
    let command = Command::new("/nonexistent/binary-xyz");
    let result = executor.run(CancellationToken::new(), command).await;
    assert!(result.error.is_some());
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn run_timeout_kills_and_reports_cancellation() {
    let executor = OsProcessExecutor::new();
    let command = sh("sleep 10").timeout(Duration::from_millis(100));
    let result = executor.run(CancellationToken::new(), command).await;
    assert!(result.error.is_some());
    assert!(result.error.unwrap().contains("cancelled or timed out"));
}

#[tokio::test]
async fn run_external_cancellation_stops_the_process() {
    let executor = OsProcessExecutor::new();
    let token = CancellationToken::new();
    let child_token = token.clone();
    let handle = tokio::spawn(async move {
        OsProcessExecutor::new()
            .run(child_token, sh("sleep 10"))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    let result = handle.await.unwrap();
    assert!(result.error.is_some());
}

#[tokio::test]
async fn env_defaults_and_command_env_both_apply_last_wins() {
    let executor = OsProcessExecutor::new();
    let mut command = sh("echo $FOO-$BAR");
    command.env.push(("FOO".to_string(), "one".to_string()));
    command.env.push(("FOO".to_string(), "two".to_string()));
    command.env.push(("BAR".to_string(), "baz".to_string()));
    let result = executor.run(CancellationToken::new(), command).await;
    assert_eq!(result.stdout.trim(), "two-baz");
}

#[tokio::test]
async fn shell_command_helper_produces_sh_dash_c() {
    let defaults = ExecutorDefaults::default();
    let command = defaults.shell_command("echo via-default-shell");
    let executor = OsProcessExecutor::new();
    let result = executor.run(CancellationToken::new(), command).await;
    assert_eq!(result.stdout.trim(), "via-default-shell");
}

#[tokio::test]
async fn run_with_pty_combines_stdout_and_stderr() {
    let executor = OsProcessExecutor::new();
    let command = sh("echo on-stdout; echo on-stderr >&2").pty(true);
    let result = executor.run(CancellationToken::new(), command).await;
    assert!(result.stdout.contains("on-stdout"));
    assert_eq!(result.stderr, "");
}

#[tokio::test]
async fn start_exposes_pid_and_wait() {
    let executor = OsProcessExecutor::new();
    let process = executor
        .start(CancellationToken::new(), sh("echo started; sleep 0.05"))
        .await
        .expect("start should succeed");
    assert!(process.pid().is_some());
    let result = process.wait().await;
    assert!(result.stdout.contains("started"));
}
