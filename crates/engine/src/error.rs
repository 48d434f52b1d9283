// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runner-level error type: every failure mode a caller of
//! [`crate::runner::run_target`] can see, folding the loader's parse
//! failures and the data model's error taxonomy into one enum.

use atkins_core::AtkinsError;
use thiserror::Error;

use crate::loader::LoaderError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load pipeline: {0}")]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Execution(#[from] AtkinsError),

    #[error("pipeline `{0}` is disabled by its `when` clause")]
    Disabled(String),
}

impl EngineError {
    /// Exit code this error should produce at the process boundary: an
    /// execution failure passes its step's exit code through; every other
    /// kind is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Execution(e) => e.exit_code(),
            _ => 1,
        }
    }
}
