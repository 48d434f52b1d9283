// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors the expression layer can surface. Expression-substitution
//! (`${{ }}`) failures are deliberately *not* represented here: a failing
//! `${{ expr }}` leaves the literal text in place rather than failing the
//! run, so it never needs an error variant.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ExprError {
    /// A `$(...)` command substitution's process failed.
    #[error("command execution failed in $({command}): {cause}")]
    CommandSubstitution { command: String, cause: String },

    /// An `if`/`for`-source expression failed to compile or evaluate.
    /// Unlike `${{ }}` template substitution, `EvaluateIf`/`ExpandFor`
    /// propagate this as a real error.
    #[error("failed to evaluate `{expr}`: {cause}")]
    Condition { expr: String, cause: String },
}
