// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The YAML loader: parses a pipeline document with `serde_yaml` into loose
//! `Raw*` shapes, then normalizes them into the canonical `atkins-core`
//! types — collapsing `jobs`/`tasks`, resolving the `Task > Run > Cmd >
//! Cmds` step-body priority, and promoting job-level `cmd`/`run`/`cmds`
//! shorthand into `steps`. The raw `serde_yaml` parse itself is treated as
//! an external collaborator; this normalization pass is the canonicalization
//! step that produces the data model proper.

use atkins_core::{
    Declaration, ForSpec, Job, Pipeline, PullPolicy, Service, Step, StepBody, StepDeclaration,
    StepMode, Value, VarBlock, When,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read pipeline file `{path}`: {cause}")]
    Read { path: String, cause: std::io::Error },

    #[error("failed to parse pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid `for` clause `{raw}`: {reason}")]
    InvalidFor { raw: String, reason: String },

    #[error("invalid `depends_on`/`include` entry: {0}")]
    InvalidShape(String),

    #[error("invalid timeout `{0}`")]
    InvalidTimeout(String),
}

/// A string or a list of strings, collapsed to `Vec<String>` — the shape
/// `depends_on`, `include`, and `when.files` all share.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl From<StringOrList> for Vec<String> {
    fn from(value: StringOrList) -> Self {
        match value {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

fn default_string_or_list() -> Option<StringOrList> {
    None
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawVarBlock {
    #[serde(default)]
    vars: IndexMap<String, Value>,
    #[serde(default = "default_string_or_list")]
    include: Option<StringOrList>,
}

impl RawVarBlock {
    fn into_core(self) -> VarBlock {
        VarBlock {
            vars: self.vars,
            include: self.include.map(Into::into).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawDeclaration {
    #[serde(default)]
    vars: IndexMap<String, Value>,
    #[serde(default = "default_string_or_list")]
    include: Option<StringOrList>,
    #[serde(default)]
    env: RawVarBlock,
}

impl RawDeclaration {
    fn into_core(self) -> Declaration {
        Declaration {
            vars: VarBlock {
                vars: self.vars,
                include: self.include.map(Into::into).unwrap_or_default(),
            },
            env: self.env.into_core(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawWhen {
    #[serde(default = "default_string_or_list")]
    files: Option<StringOrList>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawService {
    #[serde(default)]
    image: String,
    #[serde(default)]
    pull: Option<String>,
    #[serde(default = "default_string_or_list")]
    options: Option<StringOrList>,
    #[serde(default = "default_string_or_list")]
    ports: Option<StringOrList>,
    #[serde(default)]
    env: IndexMap<String, String>,
    #[serde(default = "default_string_or_list")]
    networks: Option<StringOrList>,
}

fn services_from_map(raw: IndexMap<String, RawService>) -> Vec<Service> {
    raw.into_iter()
        .map(|(name, svc)| Service {
            name,
            image: svc.image,
            pull: svc.pull.as_deref().map(PullPolicy::parse).unwrap_or_default(),
            options: svc.options.map(Into::into).unwrap_or_default(),
            ports: svc.ports.map(Into::into).unwrap_or_default(),
            env: svc.env,
            networks: svc.networks.map(Into::into).unwrap_or_default(),
        })
        .collect()
}

/// A step as written in YAML: either a bare string (shorthand `run`) or a
/// full mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawStepOrString {
    Bare(String),
    Full(Box<RawStep>),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawStep {
    #[serde(default)]
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    run: Option<String>,
    #[serde(default)]
    cmd: Option<String>,
    #[serde(default)]
    cmds: Option<Vec<String>>,
    #[serde(default)]
    task: Option<String>,
    /// `uses` is accepted as an alias for `task`, the way a GitHub-Actions
    /// style pipeline step names a reusable target.
    #[serde(default)]
    uses: Option<String>,
    #[serde(default)]
    with: IndexMap<String, Value>,
    #[serde(default, rename = "if")]
    if_: Option<String>,
    #[serde(default, rename = "for")]
    for_: Option<String>,
    #[serde(default)]
    env: IndexMap<String, Value>,
    #[serde(default = "default_string_or_list")]
    include: Option<StringOrList>,
    #[serde(default)]
    vars: IndexMap<String, Value>,
    #[serde(default)]
    detach: bool,
    #[serde(default)]
    defer: Option<String>,
    #[serde(default)]
    deferred: bool,
}

fn step_body(raw: &RawStep) -> StepBody {
    if let Some(target) = raw.task.clone().or_else(|| raw.uses.clone()) {
        return StepBody::Task(target);
    }
    if let Some(run) = &raw.run {
        return StepBody::Run(run.clone());
    }
    if let Some(cmd) = &raw.cmd {
        return StepBody::Cmd(cmd.clone());
    }
    if let Some(cmds) = &raw.cmds {
        return StepBody::Cmds(cmds.clone());
    }
    StepBody::Run(String::new())
}

fn parse_for_spec(raw: &str) -> Result<ForSpec, LoaderError> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('(') {
        let close = rest.find(')').ok_or_else(|| LoaderError::InvalidFor {
            raw: trimmed.to_string(),
            reason: "unmatched `(` in pair binding".to_string(),
        })?;
        let (pair, after) = rest.split_at(close);
        let after = after[1..].trim();
        let mut parts = pair.splitn(2, ',');
        let first = parts
            .next()
            .ok_or_else(|| LoaderError::InvalidFor {
                raw: trimmed.to_string(),
                reason: "missing first binding".to_string(),
            })?
            .trim()
            .to_string();
        let second = parts
            .next()
            .ok_or_else(|| LoaderError::InvalidFor {
                raw: trimmed.to_string(),
                reason: "missing second binding".to_string(),
            })?
            .trim()
            .to_string();
        let source = after.strip_prefix("in").map(str::trim).ok_or_else(|| {
            LoaderError::InvalidFor {
                raw: trimmed.to_string(),
                reason: "expected `in` after pair binding".to_string(),
            }
        })?;
        return Ok(ForSpec::Pair {
            first,
            second,
            source: source.to_string(),
        });
    }

    let mut parts = trimmed.splitn(2, " in ");
    let var = parts
        .next()
        .ok_or_else(|| LoaderError::InvalidFor {
            raw: trimmed.to_string(),
            reason: "missing loop variable".to_string(),
        })?
        .trim()
        .to_string();
    let source = parts.next().ok_or_else(|| LoaderError::InvalidFor {
        raw: trimmed.to_string(),
        reason: "expected `<var> in <source>`".to_string(),
    })?;
    Ok(ForSpec::Single {
        var,
        source: source.trim().to_string(),
    })
}

fn normalize_step(name: String, raw: RawStep) -> Result<Step, LoaderError> {
    let mode = if raw.deferred || raw.defer.is_some() {
        StepMode::Deferred
    } else if raw.detach {
        StepMode::Detach
    } else {
        StepMode::Regular
    };
    let for_spec = raw
        .for_
        .as_deref()
        .map(parse_for_spec)
        .transpose()?;
    Ok(Step {
        name: if raw.name.is_empty() { name } else { raw.name.clone() },
        desc: raw.desc.clone(),
        body: step_body(&raw),
        if_expr: raw.if_.clone(),
        for_spec,
        declaration: StepDeclaration {
            vars: raw.vars,
            include: raw.include.map(Into::into).unwrap_or_default(),
            env: raw.env,
        },
        with: raw.with,
        mode,
        hide_prefix: false,
        ..Default::default()
    })
}

fn normalize_step_or_string(index: usize, raw: RawStepOrString) -> Result<Step, LoaderError> {
    match raw {
        RawStepOrString::Bare(cmd) => Ok(Step::new(format!("step-{index}"), StepBody::Run(cmd))),
        RawStepOrString::Full(step) => normalize_step(format!("step-{index}"), *step),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawJob {
    #[serde(default)]
    desc: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default = "default_string_or_list")]
    depends_on: Option<StringOrList>,
    #[serde(default = "default_string_or_list")]
    requires: Option<StringOrList>,
    #[serde(default)]
    timeout: Option<String>,
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    run: Option<String>,
    #[serde(default)]
    cmd: Option<String>,
    #[serde(default)]
    cmds: Option<Vec<String>>,
    #[serde(default)]
    steps: Vec<RawStepOrString>,
    #[serde(default)]
    vars: IndexMap<String, Value>,
    #[serde(default = "default_string_or_list")]
    include: Option<StringOrList>,
    #[serde(default)]
    env: RawVarBlock,
    #[serde(default)]
    services: IndexMap<String, RawService>,
    // `runs_on`/`container` are accepted and ignored: container-backed job
    // execution is out of scope for this runner.
    #[serde(default)]
    runs_on: Option<Value>,
    #[serde(default)]
    container: Option<Value>,
}

/// A job as written in YAML: either a bare string (shorthand single `run`
/// step) or a full mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawJobOrString {
    Bare(String),
    Full(Box<RawJob>),
}

fn parse_timeout(raw: &str) -> Result<Duration, LoaderError> {
    let trimmed = raw.trim();
    let (number, unit) = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|idx| trimmed.split_at(idx))
        .unwrap_or((trimmed, "s"));
    let value: f64 = number
        .parse()
        .map_err(|_| LoaderError::InvalidTimeout(raw.to_string()))?;
    let seconds = match unit.trim() {
        "" | "s" => value,
        "ms" => value / 1000.0,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => {
            return Err(LoaderError::InvalidTimeout(format!(
                "unknown unit `{other}` in `{raw}`"
            )))
        }
    };
    Ok(Duration::from_secs_f64(seconds.max(0.0)))
}

fn normalize_job(name: String, raw: RawJob) -> Result<Job, LoaderError> {
    let mut steps: Vec<Step> = raw
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, s)| normalize_step_or_string(i, s))
        .collect::<Result<_, _>>()?;

    // A job-level `cmd`/`run` (without `steps`/`cmds`) synthesizes a single
    // hidden-prefix step; a `cmds` list at job level is equivalent to
    // `steps` with each entry promoted into a Step.
    if steps.is_empty() {
        if let Some(cmds) = raw.cmds {
            steps = cmds
                .into_iter()
                .enumerate()
                .map(|(i, cmd)| Step::new(format!("step-{i}"), StepBody::Run(cmd)))
                .collect();
        } else if let Some(run) = raw.run.or(raw.cmd) {
            let mut step = Step::new(name.clone(), StepBody::Run(run));
            step.hide_prefix = true;
            steps.push(step);
        }
    }

    let timeout = raw.timeout.as_deref().map(parse_timeout).transpose()?;

    Ok(Job {
        name: name.clone(),
        desc: raw.desc,
        aliases: raw.aliases,
        depends_on: raw.depends_on.map(Into::into).unwrap_or_default(),
        requires: raw.requires.map(Into::into).unwrap_or_default(),
        timeout,
        dir: raw.dir,
        steps,
        declaration: Declaration {
            vars: VarBlock {
                vars: raw.vars,
                include: raw.include.map(Into::into).unwrap_or_default(),
            },
            env: raw.env.into_core(),
        },
        services: services_from_map(raw.services),
    })
}

fn normalize_job_or_string(name: String, raw: RawJobOrString) -> Result<Job, LoaderError> {
    match raw {
        RawJobOrString::Bare(cmd) => {
            let mut step = Step::new(name.clone(), StepBody::Run(cmd));
            step.hide_prefix = true;
            Ok(Job {
                name,
                steps: vec![step],
                ..Default::default()
            })
        }
        RawJobOrString::Full(job) => normalize_job(name, *job),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPipeline {
    #[serde(default)]
    name: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    vars: IndexMap<String, Value>,
    #[serde(default = "default_string_or_list")]
    include: Option<StringOrList>,
    #[serde(default)]
    env: RawVarBlock,
    #[serde(default)]
    when: RawWhen,
    #[serde(default)]
    services: IndexMap<String, RawService>,
    #[serde(default)]
    jobs: IndexMap<String, RawJobOrString>,
    #[serde(default)]
    tasks: IndexMap<String, RawJobOrString>,
}

/// Parses and normalizes a pipeline document. `id` seeds `Pipeline::id`
/// when the document itself doesn't declare one — the main pipeline passes
/// an empty string; a skill pipeline passes the id derived from its source
/// filename.
pub fn load_pipeline_str(yaml: &str, default_id: &str) -> Result<Pipeline, LoaderError> {
    let raw: RawPipeline = serde_yaml::from_str(yaml)?;
    normalize_pipeline(raw, default_id)
}

pub fn load_pipeline_file(path: &Path, default_id: &str) -> Result<Pipeline, LoaderError> {
    let contents = std::fs::read_to_string(path).map_err(|cause| LoaderError::Read {
        path: path.display().to_string(),
        cause,
    })?;
    load_pipeline_str(&contents, default_id)
}

fn normalize_pipeline(raw: RawPipeline, default_id: &str) -> Result<Pipeline, LoaderError> {
    // At most one of `jobs`/`tasks` is meant to be populated; when both are
    // present (a malformed document), `jobs` wins and `tasks` entries are
    // appended after, so nothing is silently dropped.
    let mut job_table = raw.jobs;
    for (name, job) in raw.tasks {
        job_table.entry(name).or_insert(job);
    }

    let mut jobs = IndexMap::new();
    for (name, raw_job) in job_table {
        jobs.insert(name.clone(), normalize_job_or_string(name, raw_job)?);
    }

    let mut pipeline = Pipeline {
        name: if raw.name.is_empty() {
            default_id.to_string()
        } else {
            raw.name
        },
        id: if raw.id.is_empty() {
            default_id.to_string()
        } else {
            raw.id
        },
        dir: raw.dir,
        declaration: Declaration {
            vars: VarBlock {
                vars: raw.vars,
                include: raw.include.map(Into::into).unwrap_or_default(),
            },
            env: raw.env.into_core(),
        },
        when: When {
            files: raw.when.files.map(Into::into).unwrap_or_default(),
        },
        services: services_from_map(raw.services),
        ..Default::default()
    };
    for job in jobs.into_values() {
        pipeline.insert_job(job);
    }
    Ok(pipeline)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
