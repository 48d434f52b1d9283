// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors a `ProcessExecutor` can surface from `start()`. `run`/`run_with_io`
//! never return `Err`: every failure mode they can hit is folded into the
//! returned `ExecResult`'s `error` field instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to allocate pseudo-terminal: {0}")]
    PtyAllocation(String),

    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error("failed to enter raw terminal mode: {0}")]
    RawMode(String),
}
