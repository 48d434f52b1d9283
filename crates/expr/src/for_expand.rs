// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ExpandFor`: turns a step's `for` spec into the list of loop-variable
//! overlays the scheduler runs the step body under once per element.

use crate::error::ExprError;
use crate::eval::evaluate;
use crate::interpolate::run_command_substitution;
use crate::parser::parse;
use atkins_core::{ExecutionContext, ForSpec, Step, Value};
use atkins_exec::ProcessExecutor;
use indexmap::IndexMap;

/// One loop iteration's variable overlay, applied on top of the parent
/// context's variables shallow-copied with the loop bindings overlaid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Iteration {
    pub bindings: IndexMap<String, Value>,
}

/// Expands `step.for_spec` into its iterations. A step with no `for` has
/// exactly one (empty-bindings) iteration, matching "run once" at the
/// scheduler's call site.
pub async fn expand_for(
    step: &Step,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<Vec<Iteration>, ExprError> {
    let Some(for_spec) = &step.for_spec else {
        return Ok(vec![Iteration::default()]);
    };
    match for_spec {
        ForSpec::Single { var, source } => {
            let resolved = resolve_source(source, ctx, executor).await?;
            Ok(as_list(resolved)
                .into_iter()
                .map(|item| {
                    let mut bindings = IndexMap::new();
                    bindings.insert(var.clone(), item);
                    Iteration { bindings }
                })
                .collect())
        }
        ForSpec::Pair {
            first,
            second,
            source,
        } => {
            let resolved = resolve_source(source, ctx, executor).await?;
            Ok(expand_pair(first, second, resolved))
        }
    }
}

/// The Open Question §9 decision: a resolved source that is itself a single
/// mapping binds `(key, value)` pairs over its entries; any other resolved
/// shape (a list, or a bare scalar treated as a one-element list) binds
/// `(index, element)`.
fn expand_pair(first: &str, second: &str, resolved: Value) -> Vec<Iteration> {
    match resolved {
        Value::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                let mut bindings = IndexMap::new();
                bindings.insert(first.to_string(), Value::String(key));
                bindings.insert(second.to_string(), value);
                Iteration { bindings }
            })
            .collect(),
        other => as_list(other)
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let mut bindings = IndexMap::new();
                bindings.insert(first.to_string(), Value::Number(index as f64));
                bindings.insert(second.to_string(), value);
                Iteration { bindings }
            })
            .collect(),
    }
}

fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Map(map) => map.into_values().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Resolves a `for` source: a bare context variable name, an inline
/// literal-list expression, or `$(<cmd>)` whose stdout is split into
/// non-empty, trimmed lines.
async fn resolve_source(
    source: &str,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<Value, ExprError> {
    let trimmed = source.trim();
    if let Some(inner) = trimmed.strip_prefix("$(").and_then(|s| s.strip_suffix(')')) {
        let output = run_command_substitution(inner.to_string(), ctx, executor).await?;
        let lines = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Value::from)
            .collect();
        return Ok(Value::List(lines));
    }

    let namespace = ctx.namespace();
    if let Some(value) = namespace.get(trimmed) {
        return Ok(value.clone());
    }

    let expr = parse(trimmed).map_err(|cause| ExprError::Condition {
        expr: trimmed.to_string(),
        cause,
    })?;
    evaluate(&expr, &namespace).map_err(|cause| ExprError::Condition {
        expr: trimmed.to_string(),
        cause,
    })
}

#[cfg(test)]
#[path = "for_expand_tests.rs"]
mod tests;
