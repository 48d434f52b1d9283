// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY allocation and the single background reader/waiter loop every
//! `Process` is built around.

use crate::command::Command;
use crate::error::ExecutorError;
use crate::process::{Process, ProcessShared};
use crate::result::ExecResult;
use parking_lot::Mutex;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::io::Read;
use std::time::Instant;
use tokio::sync::Notify;

const DEFAULT_ROWS: u16 = 24;
const DEFAULT_COLS: u16 = 80;

/// Allocate a PTY, spawn `command` attached to its slave side, and start the
/// one background loop that drains the master and, once the child's session
/// leader has exited and the PTY EOFs, reaps the child and records the
/// final `ExecResult`. Relies on the session leader's exit to close the
/// controlling side of the PTY.
pub(crate) async fn spawn(command: &Command) -> Result<Process, ExecutorError> {
    let program = command.program.clone();
    let args = command.args.clone();
    let dir = command.dir.clone();
    let env = command.env.clone();

    let (pair, child, pid) = tokio::task::spawn_blocking(move || -> Result<_, String> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: DEFAULT_ROWS,
                cols: DEFAULT_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| e.to_string())?;

        let mut builder = CommandBuilder::new(program);
        builder.args(args);
        if let Some(dir) = dir {
            builder.cwd(dir);
        }
        for (key, value) in env {
            builder.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| e.to_string())?;
        let pid = child.process_id();
        Ok((pair, child, pid))
    })
    .await
    .map_err(|e| ExecutorError::Spawn(e.to_string()))?
    .map_err(ExecutorError::PtyAllocation)?;

    // The slave side is only needed to spawn the child; dropping it here is
    // what lets the master side observe EOF once the child (and anything it
    // forked) has exited.
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| ExecutorError::PtyAllocation(e.to_string()))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| ExecutorError::PtyAllocation(e.to_string()))?;

    let shared = std::sync::Arc::new(ProcessShared {
        pid,
        master: Mutex::new(pair.master),
        writer: Mutex::new(writer),
        capture: Mutex::new(Vec::new()),
        sink: Mutex::new(None),
        done: Notify::new(),
        result: Mutex::new(None),
    });

    spawn_reader_and_waiter(std::sync::Arc::clone(&shared), reader, child);

    Ok(Process { shared })
}

fn spawn_reader_and_waiter(
    shared: std::sync::Arc<ProcessShared>,
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn portable_pty::Child + Send + Sync>,
) {
    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    shared.capture.lock().extend_from_slice(&buf[..n]);
                    if let Some(sink) = shared.sink.lock().as_ref() {
                        sink.on_chunk(&buf[..n]);
                    }
                }
                Err(_) => break,
            }
        }

        let exit_code = match child.wait() {
            Ok(status) => status.exit_code() as i32,
            Err(_) => 1,
        };
        let stdout = String::from_utf8_lossy(&shared.capture.lock()).into_owned();
        let result = ExecResult {
            exit_code,
            stdout,
            stderr: String::new(),
            duration: start.elapsed(),
            error: None,
        };
        *shared.result.lock() = Some(result);
        shared.done.notify_waiters();
    });
}
