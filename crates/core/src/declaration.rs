// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declaration blocks: the `vars`/`env`/`include` triple attached to a
//! pipeline, a job, and a step.

use crate::value::Value;
use indexmap::IndexMap;

/// A `vars`/`include` pair, used both at the top level of a declaration
/// block and, recursively, inside its `env` sub-declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarBlock {
    pub vars: IndexMap<String, Value>,
    /// Paths to additional YAML files contributing more entries to `vars`.
    /// Later files (and later inline entries) overwrite earlier ones.
    pub include: Vec<String>,
}

impl VarBlock {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.include.is_empty()
    }
}

/// `Vars`/`Include`/`Env` attached to a pipeline or job. Steps carry the
/// lighter [`StepDeclaration`] instead, since a step's `env`/`include` never
/// nest another env sub-declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declaration {
    pub vars: VarBlock,
    pub env: VarBlock,
}

impl Declaration {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.env.is_empty()
    }
}

/// The declaration block a `Step` carries: `vars`/`include` plus a flat
/// `env` map (steps set concrete environment values directly, they don't
/// load a nested env declaration from files).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepDeclaration {
    pub vars: IndexMap<String, Value>,
    pub include: Vec<String>,
    pub env: IndexMap<String, Value>,
}

impl StepDeclaration {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.include.is_empty() && self.env.is_empty()
    }
}

#[cfg(test)]
#[path = "declaration_tests.rs"]
mod tests;
