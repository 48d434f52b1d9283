// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Process`: a running handle returned by `ProcessExecutor::start`, exposing
//! direct PTY I/O, resize, signal delivery, and a completion future.
//!
//! There is exactly one reader of a process's PTY master: the background
//! loop `os.rs` spawns in `start()`. `Process::pipe`/`on_output` only change
//! *where that loop's bytes go* (the capture buffer always gets them; an
//! external sink optionally also does); nothing else ever reads the PTY
//! directly, so two readers can never race over the same bytes.

use crate::command::{OutputSink, StdinSource};
use crate::result::ExecResult;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Notify;

/// A signal deliverable to a running process. Kept as a closed enum (rather
/// than a raw `i32`) since the only signals the scheduler/CLI ever need to
/// send are these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
    Kill,
}

#[cfg(unix)]
impl Signal {
    fn as_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal as NixSignal;
        match self {
            Signal::Interrupt => NixSignal::SIGINT,
            Signal::Terminate => NixSignal::SIGTERM,
            Signal::Kill => NixSignal::SIGKILL,
        }
    }
}

/// Shared state behind a `Process` handle.
pub(crate) struct ProcessShared {
    pub(crate) pid: Option<u32>,
    pub(crate) master: Mutex<Box<dyn portable_pty::MasterPty + Send>>,
    pub(crate) writer: Mutex<Box<dyn Write + Send>>,
    /// Every byte the background reader loop has seen so far, combined
    /// stdout+stderr (PTY mode has no separate stderr stream).
    pub(crate) capture: Mutex<Vec<u8>>,
    /// Set by `pipe`/`on_output` so the one reader loop also mirrors chunks
    /// out as they arrive, instead of only at completion.
    pub(crate) sink: Mutex<Option<Arc<dyn OutputSink>>>,
    pub(crate) done: Notify,
    pub(crate) result: Mutex<Option<ExecResult>>,
}

/// A running child process, started with a PTY attached. Cloning a `Process`
/// shares the same underlying child; it is the handle type returned from
/// `ProcessExecutor::start` and threaded through interactive step handling.
#[derive(Clone)]
pub struct Process {
    pub(crate) shared: Arc<ProcessShared>,
}

impl Process {
    pub fn pid(&self) -> Option<u32> {
        self.shared.pid
    }

    /// Resize the PTY's window. Errors (e.g. the child already exited) are
    /// surfaced to the caller rather than swallowed, so an interactive
    /// relay loop can decide whether to keep trying.
    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), String> {
        self.shared
            .master
            .lock()
            .resize(portable_pty::PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| e.to_string())
    }

    /// Deliver `signal` to the process. Unix-only: the executor's PTY path
    /// only runs on Unix (see `os.rs`).
    #[cfg(unix)]
    pub fn signal(&self, signal: Signal) -> Result<(), String> {
        let Some(pid) = self.shared.pid else {
            return Ok(());
        };
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal.as_nix())
            .map_err(|e| e.to_string())
    }

    /// Write directly to the PTY (used by `RunWithIO`/interactive relaying).
    pub fn write_input(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.shared.writer.lock().write_all(bytes)
    }

    /// Install a sink the background reader loop mirrors every chunk to, in
    /// addition to the always-on capture buffer.
    pub fn on_output(&self, sink: Arc<dyn OutputSink>) {
        *self.shared.sink.lock() = Some(sink);
    }

    /// Resolves once the process has exited, returning the same `ExecResult`
    /// every caller of `wait` sees (idempotent: safe to call more than once,
    /// from more than one task).
    pub async fn wait(&self) -> ExecResult {
        loop {
            if let Some(result) = self.shared.result.lock().clone() {
                return result;
            }
            self.shared.done.notified().await;
        }
    }

    /// A future that resolves when the process has exited, without
    /// extracting the result (used by callers that only need to know
    /// completion happened, e.g. the detached-step error group).
    pub async fn done(&self) {
        self.wait().await;
    }

    /// Bidirectional bridge: relays `stdin_source` in immediately, installs
    /// `stdout_sink` on the reader loop, and returns a handle that resolves
    /// once the process exits.
    pub fn pipe(
        &self,
        stdout_sink: Option<Arc<dyn OutputSink>>,
        stdin_source: Option<StdinSource>,
    ) -> tokio::task::JoinHandle<ExecResult> {
        if let Some(sink) = stdout_sink {
            self.on_output(sink);
        }
        if let Some(source) = stdin_source {
            match source {
                StdinSource::Bytes(bytes) => {
                    let _ = self.write_input(&bytes);
                }
                StdinSource::Inherit => {
                    // Relaying the controlling terminal's live stdin is the
                    // CLI's concern; it drives `write_input` itself.
                }
            }
        }
        let this = self.clone();
        tokio::spawn(async move { this.wait().await })
    }
}
