// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Dependency Resolver: expands a starting job into its full transitive
//! dependency chain, depth-first post-order, or picks the implicit
//! `default` job when no starting job is given.

use atkins_core::{AtkinsError, Job, ResolutionError};
use indexmap::{IndexMap, IndexSet};

/// Resolves `starting` (or, if absent, the pipeline's `default` job) to its
/// full dependency chain: every job that must run before and including it,
/// in an order where a job always appears after everything it depends on.
pub fn resolve_dependency_chain(
    jobs: &IndexMap<String, Job>,
    starting: Option<&str>,
) -> Result<Vec<String>, AtkinsError> {
    let start = match starting {
        Some(name) => name.to_string(),
        None => find_default(jobs)?,
    };
    if !jobs.contains_key(&start) {
        return Err(ResolutionError::JobNotFound(start).into());
    }

    let mut visited = IndexSet::new();
    let mut stack = Vec::new();
    visit(&start, jobs, &mut visited, &mut stack)?;
    Ok(visited.into_iter().collect())
}

/// By literal name `default`, else the first job whose `Aliases` contains
/// `default`. Nested jobs (name contains `:`) are excluded from the
/// candidate list surfaced on failure since they aren't runnable by
/// default in the first place.
fn find_default(jobs: &IndexMap<String, Job>) -> Result<String, AtkinsError> {
    if jobs.contains_key("default") {
        return Ok("default".to_string());
    }
    if let Some(job) = jobs.values().find(|j| j.has_alias("default")) {
        return Ok(job.name.clone());
    }
    Err(ResolutionError::NoDefaultJob {
        candidates: jobs
            .keys()
            .filter(|name| !name.contains(':'))
            .cloned()
            .collect(),
    }
    .into())
}

/// Depth-first post-order visit: `name`'s dependencies are fully resolved
/// (and appended to `visited`) before `name` itself is. `stack` guards
/// against infinite recursion on a dependency cycle; the spec names no
/// cycle-error mode, so a job already on the stack is treated as already
/// satisfied rather than erroring.
fn visit(
    name: &str,
    jobs: &IndexMap<String, Job>,
    visited: &mut IndexSet<String>,
    stack: &mut Vec<String>,
) -> Result<(), AtkinsError> {
    if visited.contains(name) || stack.iter().any(|s| s == name) {
        return Ok(());
    }
    stack.push(name.to_string());
    if let Some(job) = jobs.get(name) {
        for dep in &job.depends_on {
            if !jobs.contains_key(dep) {
                return Err(ResolutionError::MissingDependency {
                    job: name.to_string(),
                    dependency: dep.clone(),
                }
                .into());
            }
            visit(dep, jobs, visited, stack)?;
        }
    }
    stack.pop();
    visited.insert(name.to_string());
    Ok(())
}

#[cfg(test)]
#[path = "deps_tests.rs"]
mod tests;
