// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Variable & Env Resolver: turns a pipeline's, job's, or step's
//! declaration block into overlays on an [`ExecutionContext`]'s `vars`/`env`
//! maps.

use atkins_core::{
    AtkinsError, Declaration, ExecutionContext, InterpolationError, InterpolationSurface,
    StepDeclaration, Value, VarBlock,
};
use atkins_exec::ProcessExecutor;
use atkins_expr::interpolate_map;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Which level of the pipeline/job/step hierarchy a declaration block
/// belongs to, used only to pick the right [`InterpolationSurface`] variant
/// for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationScope {
    Pipeline,
    Job,
    Step,
}

impl DeclarationScope {
    fn var_surface(self, name: &str) -> InterpolationSurface {
        match self {
            DeclarationScope::Pipeline => InterpolationSurface::PipelineVar(name.to_string()),
            DeclarationScope::Job => InterpolationSurface::JobVar(name.to_string()),
            DeclarationScope::Step => InterpolationSurface::StepVar(name.to_string()),
        }
    }

    fn env_surface(self, name: &str) -> InterpolationSurface {
        match self {
            DeclarationScope::Pipeline => InterpolationSurface::PipelineEnv(name.to_string()),
            DeclarationScope::Job => InterpolationSurface::JobEnv(name.to_string()),
            DeclarationScope::Step => InterpolationSurface::StepEnv(name.to_string()),
        }
    }

    fn dir_surface(self) -> InterpolationSurface {
        match self {
            DeclarationScope::Pipeline => InterpolationSurface::PipelineDir,
            DeclarationScope::Job => InterpolationSurface::JobDir,
            DeclarationScope::Step => InterpolationSurface::StepDir,
        }
    }
}

/// Applies a pipeline or job declaration block (`vars`/`include`, then the
/// nested `env` sub-declaration) onto `ctx`. Variables land in `ctx.vars`
/// before `env` is resolved, so env values may reference them.
pub async fn apply_declaration(
    scope: DeclarationScope,
    decl: &Declaration,
    ctx: &mut ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<(), AtkinsError> {
    let vars = resolve_var_block(scope, &decl.vars, false, ctx, executor).await?;
    for (key, value) in vars {
        ctx.vars.insert(key, value);
    }

    if !decl.env.is_empty() {
        let env = resolve_var_block(scope, &decl.env, true, ctx, executor).await?;
        for (key, value) in env {
            ctx.env.insert(key, Value::String(value.to_display_string()));
        }
    }
    Ok(())
}

/// Applies a step's lighter declaration block: `vars`/`include` (YAML
/// files, same as the job/pipeline form) plus a flat `env` map with no
/// further `include` of its own (steps set concrete environment values
/// directly rather than loading a nested env declaration).
pub async fn apply_step_declaration(
    decl: &StepDeclaration,
    ctx: &mut ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<(), AtkinsError> {
    let mut working = load_includes(&decl.include, false).await?;
    let mut vars = decl.vars.clone();
    interpolate_named(&mut vars, ctx, executor, |name| {
        DeclarationScope::Step.var_surface(name)
    })
    .await?;
    working.extend(vars);
    for (key, value) in working {
        ctx.vars.insert(key, value);
    }

    let mut env = decl.env.clone();
    interpolate_named(&mut env, ctx, executor, |name| {
        DeclarationScope::Step.env_surface(name)
    })
    .await?;
    for (key, value) in env {
        ctx.env.insert(key, Value::String(value.to_display_string()));
    }
    Ok(())
}

/// Resolves a `dir` override: interpolates it, expands environment
/// references in the result, then joins it against `base` if it isn't
/// already absolute.
pub async fn resolve_dir(
    scope: DeclarationScope,
    raw: &str,
    base: Option<&Path>,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<PathBuf, AtkinsError> {
    let interpolated = atkins_expr::interpolate_string(raw, ctx, executor)
        .await
        .map_err(|cause| {
            AtkinsError::Interpolation(InterpolationError {
                surface: scope.dir_surface(),
                cause: cause.to_string(),
            })
        })?;
    let expanded = PathBuf::from(expand_env_path(&interpolated));
    Ok(if expanded.is_absolute() {
        expanded
    } else {
        match base {
            Some(base) => base.join(expanded),
            None => expanded,
        }
    })
}

async fn resolve_var_block(
    scope: DeclarationScope,
    block: &VarBlock,
    is_env: bool,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
) -> Result<IndexMap<String, Value>, AtkinsError> {
    let mut working = load_includes(&block.include, is_env).await?;
    let mut vars = block.vars.clone();
    let surface_for = |name: &str| {
        if is_env {
            scope.env_surface(name)
        } else {
            scope.var_surface(name)
        }
    };
    interpolate_named(&mut vars, ctx, executor, surface_for).await?;
    working.extend(vars);
    Ok(working)
}

/// Loads every file in `paths` in order, later files overwriting earlier
/// ones, parsing each as YAML (`is_env == false`) or as a dotenv-style
/// `KEY=VALUE` file (`is_env == true`).
async fn load_includes(paths: &[String], is_env: bool) -> Result<IndexMap<String, Value>, AtkinsError> {
    let mut working = IndexMap::new();
    for raw_path in paths {
        let path = expand_env_path(raw_path);
        let parsed = if is_env {
            parse_env_file(&path).await?
        } else {
            parse_yaml_file(&path).await?
        };
        working.extend(parsed);
    }
    Ok(working)
}

async fn parse_yaml_file(path: &str) -> Result<IndexMap<String, Value>, AtkinsError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(AtkinsError::Io)?;
    serde_yaml::from_str(&contents)
        .map_err(|e| AtkinsError::Parse(format!("invalid include file `{path}`: {e}")))
}

/// Parses a dotenv-style file: `KEY=VALUE` lines, `#` comments, blank lines
/// ignored, single- or double-quoted values unwrapped. An empty file is an
/// error.
async fn parse_env_file(path: &str) -> Result<IndexMap<String, Value>, AtkinsError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(AtkinsError::Io)?;
    if contents.trim().is_empty() {
        return Err(AtkinsError::Parse(format!("env file `{path}` is empty")));
    }
    let mut map = IndexMap::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(eq) = trimmed.find('=') else {
            continue;
        };
        let key = trimmed[..eq].trim().to_string();
        let value = unquote(trimmed[eq + 1..].trim());
        if !key.is_empty() {
            map.insert(key, Value::String(value));
        }
    }
    Ok(map)
}

fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Simple `$VAR`/`${VAR}` environment expansion over a path string, applied
/// before every include/env-file open. A hand-written scanner rather than a
/// regex, matching the expression layer's scanning style
/// (`atkins-expr::scanner`).
fn expand_env_path(raw: &str) -> String {
    let mut out = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                for c2 in chars.by_ref() {
                    if c2 == '}' {
                        break;
                    }
                    name.push(c2);
                }
                out.push_str(&std::env::var(&name).unwrap_or_default());
            }
            Some(c2) if c2.is_ascii_alphabetic() || c2 == '_' => {
                let mut name = String::new();
                while let Some(&c2) = chars.peek() {
                    if c2.is_ascii_alphanumeric() || c2 == '_' {
                        name.push(c2);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&std::env::var(&name).unwrap_or_default());
            }
            _ => out.push('$'),
        }
    }
    out
}

/// Interpolates every value of `map` independently, so an interpolation
/// failure can be attributed to the specific key that caused it rather than
/// the whole block.
async fn interpolate_named(
    map: &mut IndexMap<String, Value>,
    ctx: &ExecutionContext,
    executor: &dyn ProcessExecutor,
    surface_for: impl Fn(&str) -> InterpolationSurface,
) -> Result<(), AtkinsError> {
    let keys: Vec<String> = map.keys().cloned().collect();
    for key in keys {
        let Some(value) = map.get(&key).cloned() else {
            continue;
        };
        let mut single = IndexMap::new();
        single.insert(key.clone(), value);
        interpolate_map(&mut single, ctx, executor)
            .await
            .map_err(|cause| {
                AtkinsError::Interpolation(InterpolationError {
                    surface: surface_for(&key),
                    cause: cause.to_string(),
                })
            })?;
        if let Some(interpolated) = single.remove(&key) {
            map.insert(key, interpolated);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
