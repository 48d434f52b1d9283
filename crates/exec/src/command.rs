// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Command` value the executor runs, and the small defaults struct a
//! caller seeds it from.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Where a command's stdin comes from. Absent means the child inherits no
/// stdin (closed), matching the non-interactive default for job steps.
#[derive(Debug, Clone)]
pub enum StdinSource {
    /// A fixed byte string written once, then stdin is closed.
    Bytes(Vec<u8>),
    /// Inherit the calling process's stdin (used for `Interactive` steps).
    Inherit,
}

/// Receives output bytes as they arrive, in addition to the executor's own
/// capture buffer. Used by the scheduler to mirror a step's output into its
/// execution-tree node as it streams, rather than only after the command
/// finishes.
pub trait OutputSink: Send + Sync {
    fn on_chunk(&self, chunk: &[u8]);
}

/// An `OutputSink` that forwards complete lines instead of raw chunks,
/// buffering a partial trailing line across calls.
pub struct LineSink<F: Fn(&str) + Send + Sync> {
    buffer: parking_lot::Mutex<String>,
    on_line: F,
}

impl<F: Fn(&str) + Send + Sync> LineSink<F> {
    pub fn new(on_line: F) -> Self {
        Self {
            buffer: parking_lot::Mutex::new(String::new()),
            on_line,
        }
    }
}

impl<F: Fn(&str) + Send + Sync> OutputSink for LineSink<F> {
    fn on_chunk(&self, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        let mut buffer = self.buffer.lock();
        buffer.push_str(&text);
        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            (self.on_line)(line.trim_end_matches(['\r', '\n']));
        }
    }
}

/// One command to run. Constructed by a caller (the step scheduler, or a
/// `ShellCommand` helper) and handed to a `ProcessExecutor`.
#[derive(Clone)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    /// `KEY=VALUE` pairs layered on top of the executor's defaults; last
    /// write for a given key wins.
    pub env: Vec<(String, String)>,
    pub stdin: Option<StdinSource>,
    pub stdout_sink: Option<Arc<dyn OutputSink>>,
    pub stderr_sink: Option<Arc<dyn OutputSink>>,
    pub timeout: Option<Duration>,
    pub use_pty: bool,
    pub interactive: bool,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            env: Vec::new(),
            stdin: None,
            stdout_sink: None,
            stderr_sink: None,
            timeout: None,
            use_pty: false,
            interactive: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pty(mut self, use_pty: bool) -> Self {
        self.use_pty = use_pty;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self.use_pty = self.use_pty || interactive;
        self
    }
}

/// Per-executor defaults: every `Command` built from a run script starts
/// here and layers its own env on top.
#[derive(Debug, Clone)]
pub struct ExecutorDefaults {
    pub dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub shell: String,
}

impl Default for ExecutorDefaults {
    fn default() -> Self {
        Self {
            dir: None,
            env: Vec::new(),
            timeout: None,
            shell: "/bin/sh".to_string(),
        }
    }
}

impl ExecutorDefaults {
    /// A `Command` equivalent to `<shell> -c <script>`, seeded with the
    /// default dir/env/timeout.
    pub fn shell_command(&self, script: impl Into<String>) -> Command {
        Command {
            program: self.shell.clone(),
            args: vec!["-c".to_string(), script.into()],
            dir: self.dir.clone(),
            env: self.env.clone(),
            stdin: None,
            stdout_sink: None,
            stderr_sink: None,
            timeout: self.timeout,
            use_pty: false,
            interactive: false,
        }
    }
}
