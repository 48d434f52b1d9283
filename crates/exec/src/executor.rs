// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `ProcessExecutor` trait: the one seam the rest of the workspace
//! depends on to run a shell command.

use crate::command::{Command, OutputSink, StdinSource};
use crate::error::ExecutorError;
use crate::process::Process;
use crate::result::ExecResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Thin adapter over OS process creation. Implemented by `OsProcessExecutor`
/// for real runs and by `FakeProcessExecutor` (behind `test-support`) for
/// every other crate's tests.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run `command` to completion, honoring `command.timeout` and
    /// cancellation via `cancellation`. Never returns `Err`: every failure
    /// mode is folded into the returned `ExecResult`.
    async fn run(&self, cancellation: CancellationToken, command: Command) -> ExecResult;

    /// Bidirectional bridge: always allocates a PTY regardless of
    /// `command.use_pty`, relays `stdin_source` in, mirrors output to
    /// `stdout_sink` as it streams, and returns the final result.
    async fn run_with_io(
        &self,
        cancellation: CancellationToken,
        stdout_sink: Option<std::sync::Arc<dyn OutputSink>>,
        stdin_source: Option<StdinSource>,
        command: Command,
    ) -> ExecResult;

    /// Start `command` and return a handle without waiting for completion.
    async fn start(
        &self,
        cancellation: CancellationToken,
        command: Command,
    ) -> Result<Process, ExecutorError>;
}
