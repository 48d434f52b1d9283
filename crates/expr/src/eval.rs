// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluates a parsed `Expr` against a namespace.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use atkins_core::Value;
use indexmap::IndexMap;

pub type Namespace = IndexMap<String, Value>;

pub fn evaluate(expr: &Expr, namespace: &Namespace) -> Result<Value, String> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Path(segments) => Ok(resolve_path(segments, namespace)),
        Expr::Unary(op, inner) => eval_unary(*op, inner, namespace),
        Expr::Binary(left, BinaryOp::Coalesce, right) => {
            let left_val = evaluate(left, namespace)?;
            if left_val.is_null() {
                evaluate(right, namespace)
            } else {
                Ok(left_val)
            }
        }
        Expr::Binary(left, BinaryOp::Or, right) => {
            let left_val = evaluate(left, namespace)?;
            if left_val.is_truthy() {
                Ok(left_val)
            } else {
                evaluate(right, namespace)
            }
        }
        Expr::Binary(left, BinaryOp::And, right) => {
            let left_val = evaluate(left, namespace)?;
            if !left_val.is_truthy() {
                Ok(left_val)
            } else {
                evaluate(right, namespace)
            }
        }
        Expr::Binary(left, op, right) => {
            let left_val = evaluate(left, namespace)?;
            let right_val = evaluate(right, namespace)?;
            eval_binary(*op, &left_val, &right_val)
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| evaluate(a, namespace))
                .collect::<Result<Vec<_>, _>>()?;
            eval_call(name, &values)
        }
        Expr::List(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, namespace))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
    }
}

fn resolve_path(segments: &[String], namespace: &Namespace) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return Value::Null;
    };
    let mut current = match namespace.get(head) {
        Some(v) => v.clone(),
        None => return Value::Null,
    };
    for segment in rest {
        current = match current.as_map().and_then(|m| m.get(segment)) {
            Some(v) => v.clone(),
            None => return Value::Null,
        };
    }
    current
}

fn eval_unary(op: UnaryOp, inner: &Expr, namespace: &Namespace) -> Result<Value, String> {
    let value = evaluate(inner, namespace)?;
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => as_number(&value).map(|n| Value::Number(-n)),
    }
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    use BinaryOp::*;
    match op {
        Eq => Ok(Value::Bool(values_equal(left, right))),
        Ne => Ok(Value::Bool(!values_equal(left, right))),
        Lt | Le | Gt | Ge => {
            let l = as_number(left)?;
            let r = as_number(right)?;
            let result = match op {
                Lt => l < r,
                Le => l <= r,
                Gt => l > r,
                Ge => l >= r,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        Add => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Ok(Value::String(format!(
                    "{}{}",
                    left.to_display_string(),
                    right.to_display_string()
                )))
            } else {
                Ok(Value::Number(as_number(left)? + as_number(right)?))
            }
        }
        Sub => Ok(Value::Number(as_number(left)? - as_number(right)?)),
        Mul => Ok(Value::Number(as_number(left)? * as_number(right)?)),
        Div => {
            let divisor = as_number(right)?;
            if divisor == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Number(as_number(left)? / divisor))
        }
        Coalesce | Or | And => unreachable!("short-circuit operators handled in evaluate()"),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_number(left), as_number(right)), (Ok(l), Ok(r)) if l == r)
        }
        _ => left.to_display_string() == right.to_display_string(),
    }
}

fn as_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| format!("cannot coerce '{s}' to a number")),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(format!("cannot coerce {other:?} to a number")),
    }
}

fn eval_call(name: &str, args: &[Value]) -> Result<Value, String> {
    match name {
        "contains" => {
            let [haystack, needle] = args else {
                return Err("contains(haystack, needle) takes 2 arguments".to_string());
            };
            Ok(Value::Bool(match haystack {
                Value::List(items) => items
                    .iter()
                    .any(|item| item.to_display_string() == needle.to_display_string()),
                other => other
                    .to_display_string()
                    .contains(&needle.to_display_string()),
            }))
        }
        "startsWith" => {
            let [s, prefix] = args else {
                return Err("startsWith(s, prefix) takes 2 arguments".to_string());
            };
            Ok(Value::Bool(
                s.to_display_string()
                    .starts_with(&prefix.to_display_string()),
            ))
        }
        "endsWith" => {
            let [s, suffix] = args else {
                return Err("endsWith(s, suffix) takes 2 arguments".to_string());
            };
            Ok(Value::Bool(
                s.to_display_string()
                    .ends_with(&suffix.to_display_string()),
            ))
        }
        "length" => {
            let [value] = args else {
                return Err("length(value) takes 1 argument".to_string());
            };
            let len = match value {
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::String(s) => s.chars().count(),
                Value::Null => 0,
                _ => value.to_display_string().chars().count(),
            };
            Ok(Value::Number(len as f64))
        }
        other => Err(format!("unknown function '{other}'")),
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
