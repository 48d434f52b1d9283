// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Step` entity: one unit of work inside a job.

use crate::compiled::CompiledSlot;
use crate::declaration::StepDeclaration;
use indexmap::IndexMap;

/// A step's executable form, resolved to exactly one variant by the loader
/// before a `Step` is ever constructed. The loader applies the
/// `Task > Run > Cmd > Cmds` priority when the loose YAML form set more than
/// one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum StepBody {
    /// Invoke another job by name (or `skill:job`), resolved through the
    /// task resolver.
    Task(String),
    /// A single shell command.
    Run(String),
    /// Alias for `Run` kept distinct only so the loader can tell which
    /// legacy key produced the canonical form (useful for error messages);
    /// behaves identically to `Run` at execution time.
    Cmd(String),
    /// Several shell commands, joined with `&&` at resolution time.
    Cmds(Vec<String>),
}

impl StepBody {
    /// The resolved single command line, prior to interpolation. `Task`
    /// variants have no command line of their own; callers must route them
    /// through the task resolver instead.
    pub fn command_text(&self) -> Option<String> {
        match self {
            StepBody::Task(_) => None,
            StepBody::Run(cmd) | StepBody::Cmd(cmd) => Some(cmd.clone()),
            StepBody::Cmds(cmds) => Some(cmds.join(" && ")),
        }
    }
}

/// A `for`-loop attached to a step.
#[derive(Debug, Clone, PartialEq)]
pub enum ForSpec {
    /// `<var> in <source>`: bind one loop variable per iteration.
    Single { var: String, source: String },
    /// `(<a>,<b>) in <source>`: bind two loop variables per iteration.
    Pair {
        first: String,
        second: String,
        source: String,
    },
}

/// How a step participates in the scheduler's synchronization contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Runs in source order; a failure stops subsequent regular steps.
    #[default]
    Regular,
    /// Runs concurrently with siblings and later non-detached/non-deferred
    /// steps, in a per-job error group.
    Detach,
    /// Runs at job end, after all regular and detached steps settle,
    /// regardless of whether the job already failed.
    Deferred,
}

#[derive(Debug, Clone, Default)]
pub struct Step {
    pub name: String,
    pub desc: String,
    pub body: StepBody,
    /// Source text of the `if` expression, `None` when absent (step always
    /// runs). Compiled and cached in `compiled_if` on first evaluation.
    pub if_expr: Option<String>,
    pub for_spec: Option<ForSpec>,
    pub declaration: StepDeclaration,
    /// Parameters passed to a `Task` invocation (the `with` key).
    pub with: IndexMap<String, crate::value::Value>,
    pub mode: StepMode,
    pub hide_prefix: bool,
    compiled_if: CompiledSlot,
}

// The compiled-expression cache is not part of a step's identity: two steps
// with identical declared fields are equal regardless of whether one has
// already evaluated its `if` expression.
impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.desc == other.desc
            && self.body == other.body
            && self.if_expr == other.if_expr
            && self.for_spec == other.for_spec
            && self.declaration == other.declaration
            && self.with == other.with
            && self.mode == other.mode
            && self.hide_prefix == other.hide_prefix
    }
}

impl Default for StepBody {
    fn default() -> Self {
        StepBody::Run(String::new())
    }
}

impl Step {
    pub fn new(name: impl Into<String>, body: StepBody) -> Self {
        Self {
            name: name.into(),
            body,
            ..Default::default()
        }
    }

    pub fn is_detached(&self) -> bool {
        self.mode == StepMode::Detach
    }

    pub fn is_deferred(&self) -> bool {
        self.mode == StepMode::Deferred
    }

    /// Access to the compile-once cache backing `EvaluateIf`. The expression
    /// layer is the only caller that ever populates this; `atkins-core` only
    /// owns storage.
    pub fn compiled_if_slot(&self) -> &CompiledSlot {
        &self.compiled_if
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
