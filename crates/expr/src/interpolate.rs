// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `InterpolateString`/`InterpolateCommand`/`InterpolateMap`/`EvaluateIf`:
//! the single left-to-right pass that rewrites `$(...)` command
//! substitutions and `${{ expr }}` expression substitutions in a source
//! string.

use crate::ast::Expr;
use crate::error::ExprError;
use crate::eval::evaluate;
use crate::parser::parse;
use crate::scanner::{find_command_substitutions, find_expression_spans, Span};
use atkins_core::{Event, ExecutionContext, Step, Value};
use atkins_exec::{Command as ExecCommand, ProcessExecutor};
use indexmap::IndexMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

/// Rewrites every top-level `$(...)` and `${{ }}` span in `s`, left to
/// right. The two grammars are scanned together so that, say, a `${{ }}`
/// appearing before a `$(...)` in the same string is resolved first even
/// though it's a different kind of span.
pub async fn interpolate_string(
    s: &str,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<String, ExprError> {
    let mut out = String::new();
    let mut rest = s;
    loop {
        let next_command = find_command_substitutions(rest).into_iter().next();
        let next_expr = find_expression_spans(rest).into_iter().next();
        match earliest(next_command, next_expr) {
            None => {
                out.push_str(rest);
                break;
            }
            Some(Next::Command(span)) => {
                out.push_str(&rest[..span.start]);
                let inner = rest[span.start + 2..span.end - 1].to_string();
                // Boxed to break the indirect recursion between this
                // function and `run_command_substitution` (each inner
                // `$(...)` may itself contain `${{ }}` or nested `$(...)`).
                let fut: Pin<Box<dyn Future<Output = Result<String, ExprError>> + Send + '_>> =
                    Box::pin(run_command_substitution(inner, ctx, executor));
                out.push_str(&fut.await?);
                rest = &rest[span.end..];
            }
            Some(Next::Expression(span)) => {
                out.push_str(&rest[..span.start]);
                let literal = span.whole(rest);
                let expr_src = span.expr_inner(rest);
                out.push_str(&evaluate_expression_substitution(literal, expr_src, ctx));
                rest = &rest[span.end..];
            }
        }
    }
    Ok(out)
}

/// Alias used at step-command resolution time; identical to
/// `interpolate_string`.
pub async fn interpolate_command(
    s: &str,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<String, ExprError> {
    interpolate_string(s, ctx, executor).await
}

/// Recursively interpolates every string leaf of a `vars`/`with`-shaped map
/// in place.
pub async fn interpolate_map(
    map: &mut IndexMap<String, Value>,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<(), ExprError> {
    for value in map.values_mut() {
        interpolate_value(value, ctx, executor).await?;
    }
    Ok(())
}

fn interpolate_value<'a>(
    value: &'a mut Value,
    ctx: &'a ExecutionContext,
    executor: &'a dyn ProcessExecutor,
) -> Pin<Box<dyn Future<Output = Result<(), ExprError>> + Send + 'a>> {
    Box::pin(async move {
        match value {
            Value::String(s) => {
                *s = interpolate_string(s, ctx, executor).await?;
            }
            Value::List(items) => {
                for item in items.iter_mut() {
                    interpolate_value(item, ctx, executor).await?;
                }
            }
            Value::Map(map) => {
                for item in map.values_mut() {
                    interpolate_value(item, ctx, executor).await?;
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
        Ok(())
    })
}

/// Compiles (once, cached on the step) and evaluates a step's `if`
/// expression against the context's merged namespace, coercing the result
/// to bool via `Value::is_truthy`. Absent `If` always evaluates to `true`.
pub fn evaluate_if(step: &Step, ctx: &ExecutionContext) -> Result<bool, ExprError> {
    let Some(if_src) = step.if_expr.as_deref() else {
        return Ok(true);
    };
    let compiled: &Expr = step.compiled_if_slot().get_or_try_init(|| {
        parse(if_src).map_err(|cause| ExprError::Condition {
            expr: if_src.to_string(),
            cause,
        })
    })?;
    let namespace = ctx.namespace();
    let value = evaluate(compiled, &namespace).map_err(|cause| ExprError::Condition {
        expr: if_src.to_string(),
        cause,
    })?;
    Ok(value.is_truthy())
}

enum Next {
    Command(Span),
    Expression(Span),
}

fn earliest(command: Option<Span>, expression: Option<Span>) -> Option<Next> {
    match (command, expression) {
        (None, None) => None,
        (Some(c), None) => Some(Next::Command(c)),
        (None, Some(e)) => Some(Next::Expression(e)),
        (Some(c), Some(e)) => {
            if c.start <= e.start {
                Some(Next::Command(c))
            } else {
                Some(Next::Expression(e))
            }
        }
    }
}

/// Evaluates one `${{ expr }}` span. Any failure to parse or evaluate —
/// including referencing a variable absent from the namespace — leaves
/// `literal` (the original `${{ expr }}` text) untouched rather than
/// erroring the whole interpolation.
fn evaluate_expression_substitution(literal: &str, expr_src: &str, ctx: &ExecutionContext) -> String {
    let namespace = ctx.namespace();
    let Ok(parsed) = parse(expr_src) else {
        return literal.to_string();
    };
    // A bare identifier reference that isn't in the namespace at all is
    // "undefined", not merely nil: `${{ x }}` on missing `x` leaves the
    // literal in place, whereas `${{ x ?? y }}` already treats a
    // namespace-resolved nil the same as undefined inside `evaluate`.
    if let Expr::Path(segments) = &parsed {
        if let Some(root) = segments.first() {
            if !namespace.contains_key(root) {
                return literal.to_string();
            }
        }
    }
    match evaluate(&parsed, &namespace) {
        Ok(value) => value.to_display_string(),
        Err(_) => literal.to_string(),
    }
}

/// Runs one `$(...)`'s inner text: first interpolates it fully (so a
/// `${{ }}` nested inside a command substitution is resolved before the
/// shell ever sees it), then executes it via the `ProcessExecutor` using the
/// context's env and working directory, trimming trailing whitespace from
/// stdout before splicing it into the surrounding string. Emits one
/// `Substitution` event regardless of outcome.
pub(crate) async fn run_command_substitution(
    raw_inner: String,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<String, ExprError> {
    let interpolated = interpolate_string(&raw_inner, ctx, executor).await?;

    let mut command = ExecCommand::new("/bin/sh").arg("-c").arg(interpolated.clone());
    if let Some(dir) = &ctx.cwd {
        command = command.dir(dir.clone());
    }
    for (key, value) in &ctx.env {
        command = command.env(key.clone(), value.to_display_string());
    }

    let sub_id = format!("sub-{}", ctx.next_step_index("__substitution__"));
    let mut event = Event::substitution(sub_id, interpolated.clone());
    let started = Instant::now();
    let result = executor.run(ctx.cancellation.clone(), command).await;
    event.duration = started.elapsed();
    event.exit_code = Some(result.exit_code);
    event.output = Some(result.preferred_output().to_string());

    if !result.success() {
        let cause = result
            .error
            .clone()
            .unwrap_or_else(|| format!("exit code {}", result.exit_code));
        event.error = Some(cause.clone());
        ctx.event_sink.record(event);
        return Err(ExprError::CommandSubstitution {
            command: interpolated,
            cause,
        });
    }
    ctx.event_sink.record(event);
    Ok(result.stdout.trim_end().to_string())
}

#[cfg(test)]
#[path = "interpolate_tests.rs"]
mod tests;
