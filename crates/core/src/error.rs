// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every layer of the execution engine.
//!
//! Every category named here is a variant (or a nested, `#[from]`-convertible
//! enum) of [`AtkinsError`], the one error type that crosses crate
//! boundaries. Lower layers (expression evaluation, process execution) have
//! their own focused error enums; they convert into `AtkinsError` at the
//! point where a caller needs to fold them into step/job/run results.

use thiserror::Error;

/// Identifies which interpolation surface failed, for error messages that
/// must say e.g. "in pipeline var `foo`" or "in step `for` source".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpolationSurface {
    PipelineVar(String),
    PipelineEnv(String),
    PipelineDir,
    JobVar(String),
    JobEnv(String),
    JobDir,
    StepVar(String),
    StepEnv(String),
    StepDir,
    StepForSource,
    RunCommand,
}

impl std::fmt::Display for InterpolationSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpolationSurface::PipelineVar(name) => write!(f, "pipeline var `{name}`"),
            InterpolationSurface::PipelineEnv(name) => write!(f, "pipeline env `{name}`"),
            InterpolationSurface::PipelineDir => write!(f, "pipeline dir"),
            InterpolationSurface::JobVar(name) => write!(f, "job var `{name}`"),
            InterpolationSurface::JobEnv(name) => write!(f, "job env `{name}`"),
            InterpolationSurface::JobDir => write!(f, "job dir"),
            InterpolationSurface::StepVar(name) => write!(f, "step var `{name}`"),
            InterpolationSurface::StepEnv(name) => write!(f, "step env `{name}`"),
            InterpolationSurface::StepDir => write!(f, "step dir"),
            InterpolationSurface::StepForSource => write!(f, "step for-source"),
            InterpolationSurface::RunCommand => write!(f, "run command"),
        }
    }
}

/// Failure to interpolate a `${{ }}`/`$(...)` bearing string.
#[derive(Debug, Error, Clone)]
#[error("interpolation failed in {surface}: {cause}")]
pub struct InterpolationError {
    pub surface: InterpolationSurface,
    pub cause: String,
}

/// Failure executing a step's resolved command.
#[derive(Debug, Error, Clone, Default)]
#[error("{message}")]
pub struct ExecError {
    pub message: String,
    /// Captured process output, stderr preferred over stdout when both are
    /// available.
    pub output: String,
    pub last_exit_code: Option<i32>,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: String::new(),
            last_exit_code: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.last_exit_code = Some(code);
        self
    }
}

/// Failure resolving a task invocation to a concrete job, or a job's
/// dependency chain.
#[derive(Debug, Error, Clone)]
pub enum ResolutionError {
    #[error("job '{0}' not found")]
    JobNotFound(String),

    #[error("skill '{0}' not found")]
    SkillNotFound(String),

    #[error(
        "ambiguous task '{query}': matches {candidates:?}"
    )]
    FuzzyMatch {
        query: String,
        candidates: Vec<String>,
    },

    #[error("job '{job}' depends on unknown job '{dependency}'")]
    MissingDependency { job: String, dependency: String },

    #[error("no default job found in pipeline; candidate jobs: {candidates:?}")]
    NoDefaultJob { candidates: Vec<String> },

    #[error("job '{job}' requires variables {required:?} but missing: {missing:?}")]
    MissingRequirements {
        job: String,
        required: Vec<String>,
        missing: Vec<String>,
    },
}

/// The cooperative-cancellation failure mode: a step's process was killed
/// because the run (or an ancestor job timeout) was cancelled.
#[derive(Debug, Error, Clone)]
#[error("cancelled or timed out")]
pub struct CancellationError;

/// Top-level error type returned by the engine's public operations.
#[derive(Debug, Error)]
pub enum AtkinsError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Cancellation(#[from] CancellationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AtkinsError {
    /// Exit code this error should produce at the process boundary: an
    /// `Exec` failure passes its captured exit code through (falling back to
    /// 1 if the process didn't exit with a code, e.g. it was signalled),
    /// every other kind is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AtkinsError::Exec(e) => e.last_exit_code.unwrap_or(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
