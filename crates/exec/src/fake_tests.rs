// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio_util::sync::CancellationToken;

async fn assert_scripted(script: &str, exit_code: i32, stdout: &str) {
    let fake = FakeProcessExecutor::new();
    fake.on(
        script,
        ExecResult {
            exit_code,
            stdout: stdout.to_string(),
            ..Default::default()
        },
    );
    let command = Command::new("sh").arg("-c").arg(script);
    let result = fake.run(CancellationToken::new(), command).await;
    assert_eq!(result.exit_code, exit_code);
    assert_eq!(result.stdout, stdout);
}

#[tokio::test]
async fn scripted_success_matches_registered_substring() {
    assert_scripted("echo hi", 0, "hi").await;
}

#[tokio::test]
async fn scripted_failure_matches_registered_substring() {
    assert_scripted("exit 1", 7, "").await;
}

#[tokio::test]
async fn unmatched_command_falls_back_to_default_result() {
    let fake = FakeProcessExecutor::new();
    fake.set_default(ExecResult {
        exit_code: 0,
        stdout: "default".to_string(),
        ..Default::default()
    });
    let result = fake
        .run(CancellationToken::new(), Command::new("anything"))
        .await;
    assert_eq!(result.stdout, "default");
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let fake = FakeProcessExecutor::new();
    fake.run(CancellationToken::new(), Command::new("first"))
        .await;
    fake.run(CancellationToken::new(), Command::new("second"))
        .await;
    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, "first");
    assert_eq!(calls[1].program, "second");
}
