// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real `ProcessExecutor`: `tokio::process::Command` for the common,
//! non-interactive case, and a PTY (`pty.rs`) whenever `use_pty`/
//! `interactive` is requested or bidirectional I/O is needed.

use crate::command::{Command, OutputSink, StdinSource};
use crate::error::ExecutorError;
use crate::executor::ProcessExecutor;
use crate::process::{Process, Signal};
use crate::pty;
use crate::result::ExecResult;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct OsProcessExecutor;

impl OsProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessExecutor for OsProcessExecutor {
    async fn run(&self, cancellation: CancellationToken, command: Command) -> ExecResult {
        if command.use_pty {
            return run_via_pty(cancellation, command, None, None).await;
        }
        run_direct(cancellation, command).await
    }

    async fn run_with_io(
        &self,
        cancellation: CancellationToken,
        stdout_sink: Option<Arc<dyn OutputSink>>,
        stdin_source: Option<StdinSource>,
        command: Command,
    ) -> ExecResult {
        run_via_pty(cancellation, command, stdout_sink, stdin_source).await
    }

    async fn start(
        &self,
        cancellation: CancellationToken,
        command: Command,
    ) -> Result<Process, ExecutorError> {
        let process = pty::spawn(&command).await?;
        spawn_cancellation_watchdog(cancellation, command.timeout, process.clone());
        Ok(process)
    }
}

/// Race the process's own completion against the timeout/cancellation
/// signal; on either firing first, escalate `Terminate` then `Kill` the way
/// a real shell job control would, rather than going straight to `SIGKILL`.
fn spawn_cancellation_watchdog(
    cancellation: CancellationToken,
    timeout: Option<Duration>,
    process: Process,
) {
    tokio::spawn(async move {
        let timed_out = match timeout {
            Some(timeout) => {
                tokio::select! {
                    _ = process.done() => return,
                    _ = cancellation.cancelled() => false,
                    _ = tokio::time::sleep(timeout) => true,
                }
            }
            None => {
                tokio::select! {
                    _ = process.done() => return,
                    _ = cancellation.cancelled() => false,
                }
            }
        };
        let _ = process.signal(Signal::Terminate);
        tokio::select! {
            _ = process.done() => {}
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                let _ = process.signal(Signal::Kill);
            }
        }
        let _ = timed_out;
    });
}

async fn run_via_pty(
    cancellation: CancellationToken,
    command: Command,
    extra_stdout_sink: Option<Arc<dyn OutputSink>>,
    stdin_source: Option<StdinSource>,
) -> ExecResult {
    let sink = extra_stdout_sink.or_else(|| command.stdout_sink.clone());
    let timeout = command.timeout;
    let process = match pty::spawn(&command).await {
        Ok(process) => process,
        Err(e) => {
            return ExecResult {
                exit_code: 1,
                error: Some(e.to_string()),
                ..Default::default()
            };
        }
    };
    spawn_cancellation_watchdog(cancellation.clone(), timeout, process.clone());
    process.pipe(sink, stdin_source);

    if cancellation.is_cancelled() {
        let _ = process.signal(Signal::Terminate);
    }
    let mut result = process.wait().await;
    if cancellation.is_cancelled() && result.error.is_none() {
        result.error = Some("cancelled or timed out".to_string());
    }
    result
}

/// The common case: no PTY, stdout/stderr captured separately, stdin either
/// closed, fed a fixed byte string, or inherited.
async fn run_direct(cancellation: CancellationToken, command: Command) -> ExecResult {
    let start = Instant::now();
    let mut cmd = tokio::process::Command::new(&command.program);
    cmd.args(&command.args);
    if let Some(dir) = &command.dir {
        cmd.current_dir(dir);
    }
    for (key, value) in &command.env {
        cmd.env(key, value);
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    match &command.stdin {
        Some(StdinSource::Inherit) => {
            cmd.stdin(Stdio::inherit());
        }
        Some(StdinSource::Bytes(_)) => {
            cmd.stdin(Stdio::piped());
        }
        None => {
            cmd.stdin(Stdio::null());
        }
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ExecResult {
                exit_code: 1,
                error: Some(format!("failed to spawn process: {e}")),
                duration: start.elapsed(),
                ..Default::default()
            };
        }
    };

    if let Some(StdinSource::Bytes(bytes)) = &command.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            let bytes = bytes.clone();
            tokio::spawn(async move {
                let _ = stdin.write_all(&bytes).await;
            });
        }
    }

    let stdout_sink = command.stdout_sink.clone();
    let stderr_sink = command.stderr_sink.clone();
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(sink) = &stdout_sink {
                            sink.on_chunk(&chunk[..n]);
                        }
                    }
                }
            }
        }
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(sink) = &stderr_sink {
                            sink.on_chunk(&chunk[..n]);
                        }
                    }
                }
            }
        }
        buf
    });

    let wait_fut = child.wait();
    let outcome = match command.timeout {
        Some(timeout) => {
            tokio::select! {
                status = wait_fut => WaitOutcome::Exited(status),
                _ = tokio::time::sleep(timeout) => WaitOutcome::TimedOut,
                _ = cancellation.cancelled() => WaitOutcome::Cancelled,
            }
        }
        None => {
            tokio::select! {
                status = wait_fut => WaitOutcome::Exited(status),
                _ = cancellation.cancelled() => WaitOutcome::Cancelled,
            }
        }
    };

    let error = match &outcome {
        WaitOutcome::Exited(Err(e)) => Some(format!("wait failed: {e}")),
        WaitOutcome::TimedOut | WaitOutcome::Cancelled => {
            let _ = child.start_kill();
            Some("cancelled or timed out".to_string())
        }
        WaitOutcome::Exited(Ok(_)) => None,
    };
    let exit_code = match &outcome {
        WaitOutcome::Exited(Ok(status)) => status.code().unwrap_or(1),
        _ => {
            let _ = child.wait().await;
            1
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    ExecResult {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        duration: start.elapsed(),
        error,
    }
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}
