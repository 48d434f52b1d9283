// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory `ProcessExecutor` for other crates' tests: scripted
//! responses keyed by a substring match on the command line, so the
//! expression layer and step scheduler can be tested without spawning real
//! shells.

use crate::command::{Command, OutputSink, StdinSource};
use crate::error::ExecutorError;
use crate::executor::ProcessExecutor;
use crate::process::Process;
use crate::result::ExecResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One recorded invocation, for assertions like "the for-loop source was run
/// with the interpolated command".
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<std::path::PathBuf>,
}

struct Script {
    /// Matched against `program` + `" "` + `args.join(" ")` via `contains`.
    matches: String,
    result: ExecResult,
}

#[derive(Default)]
pub struct FakeProcessExecutor {
    scripts: Mutex<Vec<Script>>,
    default_result: Mutex<ExecResult>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose full command line contains `substring` return `result`.
    /// First matching script (in registration order) wins.
    pub fn on(&self, substring: impl Into<String>, result: ExecResult) -> &Self {
        self.scripts.lock().push(Script {
            matches: substring.into(),
            result,
        });
        self
    }

    pub fn on_success(&self, substring: impl Into<String>, stdout: impl Into<String>) -> &Self {
        self.on(
            substring,
            ExecResult {
                exit_code: 0,
                stdout: stdout.into(),
                ..Default::default()
            },
        )
    }

    pub fn on_failure(&self, substring: impl Into<String>, exit_code: i32) -> &Self {
        self.on(
            substring,
            ExecResult {
                exit_code,
                ..Default::default()
            },
        )
    }

    pub fn set_default(&self, result: ExecResult) {
        *self.default_result.lock() = result;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn resolve(&self, command: &Command) -> ExecResult {
        let line = format!("{} {}", command.program, command.args.join(" "));
        self.calls.lock().push(RecordedCall {
            program: command.program.clone(),
            args: command.args.clone(),
            dir: command.dir.clone(),
        });
        for script in self.scripts.lock().iter() {
            if line.contains(&script.matches) {
                return script.result.clone();
            }
        }
        self.default_result.lock().clone()
    }
}

#[async_trait]
impl ProcessExecutor for FakeProcessExecutor {
    async fn run(&self, _cancellation: CancellationToken, command: Command) -> ExecResult {
        self.resolve(&command)
    }

    async fn run_with_io(
        &self,
        _cancellation: CancellationToken,
        _stdout_sink: Option<Arc<dyn OutputSink>>,
        _stdin_source: Option<StdinSource>,
        command: Command,
    ) -> ExecResult {
        self.resolve(&command)
    }

    async fn start(
        &self,
        _cancellation: CancellationToken,
        _command: Command,
    ) -> Result<Process, ExecutorError> {
        Err(ExecutorError::Spawn(
            "FakeProcessExecutor does not support start()".to_string(),
        ))
    }
}
