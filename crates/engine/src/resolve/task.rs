// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Task Resolver: given a list of pipelines (the main pipeline plus any
//! loaded skills) and a user-supplied task name, resolves to a `(pipeline,
//! job)` pair via a strict, ordered precedence list.

use atkins_core::{AtkinsError, Job, Pipeline, ResolutionError};

/// A resolved target. `job` is `None` only for the "skill ID without a
/// default job" case, used by list mode to show a skill's jobs without
/// picking one to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMatch<'a> {
    pub pipeline: &'a Pipeline,
    pub job: Option<&'a str>,
}

/// The main pipeline is the one loaded directly from the invocation
/// directory, identified by an empty `id` (skill pipelines derive theirs
/// from their source filename).
fn is_main_pipeline(pipeline: &Pipeline) -> bool {
    pipeline.id.is_empty()
}

fn find_skill<'a>(pipelines: &'a [Pipeline], skill_id: &str) -> Option<&'a Pipeline> {
    pipelines.iter().find(|p| p.id == skill_id)
}

fn find_main(pipelines: &[Pipeline]) -> Option<&Pipeline> {
    pipelines.iter().find(|p| is_main_pipeline(p))
}

fn default_job(pipeline: &Pipeline) -> Option<&Job> {
    pipeline.find_job("default")
}

/// Resolves `input` against `pipelines` via an eight-step precedence list.
/// Pipelines are searched in the order given; the caller is expected to put
/// the main pipeline first.
pub fn resolve_task<'a>(
    pipelines: &'a [Pipeline],
    input: &str,
) -> Result<TaskMatch<'a>, AtkinsError> {
    // 1. Explicit root prefix `:X`.
    if let Some(rest) = input.strip_prefix(':') {
        return resolve_rooted(pipelines, rest);
    }

    // 2. Skill-prefixed `skill:job` (no leading colon) is the same
    // two-segment form as step 1, just without the prefix.
    if let Some((skill, job)) = input.split_once(':') {
        let pipeline = find_skill(pipelines, skill)
            .ok_or_else(|| ResolutionError::SkillNotFound(skill.to_string()))?;
        return Ok(TaskMatch {
            pipeline,
            job: Some(job),
        });
    }

    // 3. Main-pipeline exact match.
    if let Some(main) = find_main(pipelines) {
        if let Some(job) = main.job(input) {
            return Ok(TaskMatch {
                pipeline: main,
                job: Some(job.name.as_str()),
            });
        }
    }

    // 4. Alias match: first job in search order whose Aliases contains the
    // input, across every pipeline.
    for pipeline in pipelines {
        if let Some(job) = pipeline.jobs().values().find(|j| j.has_alias(input)) {
            return Ok(TaskMatch {
                pipeline,
                job: Some(job.name.as_str()),
            });
        }
    }

    // 5/6. Skill ID, with or without a default job.
    if let Some(pipeline) = find_skill(pipelines, input) {
        return Ok(TaskMatch {
            pipeline,
            job: default_job(pipeline).map(|j| j.name.as_str()),
        });
    }

    // 7. Fuzzy match: case-insensitive substring over every job name.
    let needle = input.to_lowercase();
    let mut candidates: Vec<(&Pipeline, &str)> = Vec::new();
    for pipeline in pipelines {
        for job in pipeline.jobs().values() {
            if job.name.to_lowercase().contains(&needle) {
                candidates.push((pipeline, job.name.as_str()));
            }
        }
    }
    match candidates.len() {
        0 => {}
        1 => {
            let (pipeline, job) = candidates[0];
            return Ok(TaskMatch {
                pipeline,
                job: Some(job),
            });
        }
        _ => {
            return Err(ResolutionError::FuzzyMatch {
                query: input.to_string(),
                candidates: candidates.into_iter().map(|(_, j)| j.to_string()).collect(),
            }
            .into());
        }
    }

    // 8. Fallback: first pipeline, job name passed through unchanged.
    let pipeline = pipelines
        .first()
        .ok_or_else(|| ResolutionError::JobNotFound(input.to_string()))?;
    Ok(TaskMatch {
        pipeline,
        job: Some(input),
    })
}

/// Resolves the body of an explicit `:X` root prefix (step 1): a two-segment
/// `skill:job` form behaves like step 2; a bare name looks up the main
/// pipeline directly, skipping every later precedence step.
fn resolve_rooted<'a>(pipelines: &'a [Pipeline], rest: &str) -> Result<TaskMatch<'a>, AtkinsError> {
    if let Some((skill, job)) = rest.split_once(':') {
        let pipeline = find_skill(pipelines, skill)
            .ok_or_else(|| ResolutionError::SkillNotFound(skill.to_string()))?;
        return Ok(TaskMatch {
            pipeline,
            job: Some(job),
        });
    }
    let main = find_main(pipelines).ok_or_else(|| ResolutionError::JobNotFound(rest.to_string()))?;
    Ok(TaskMatch {
        pipeline: main,
        job: Some(rest),
    })
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
