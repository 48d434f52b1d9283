// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atkins_core::StepBody;

#[test]
fn bare_string_job_becomes_single_hidden_step() {
    let yaml = r#"
jobs:
  default: "echo hello"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    let job = pipeline.job("default").unwrap();
    assert_eq!(job.steps.len(), 1);
    assert!(job.steps[0].hide_prefix);
    assert_eq!(job.steps[0].body, StepBody::Run("echo hello".to_string()));
}

#[test]
fn job_level_cmd_synthesizes_hidden_step() {
    let yaml = r#"
jobs:
  build:
    cmd: "make build"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    let job = pipeline.job("build").unwrap();
    assert_eq!(job.steps.len(), 1);
    assert!(job.steps[0].hide_prefix);
    assert_eq!(job.steps[0].body, StepBody::Run("make build".to_string()));
}

#[test]
fn job_level_cmds_list_promotes_to_steps() {
    let yaml = r#"
jobs:
  build:
    cmds:
      - "echo one"
      - "echo two"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    let job = pipeline.job("build").unwrap();
    assert_eq!(job.steps.len(), 2);
    assert_eq!(job.steps[0].body, StepBody::Run("echo one".to_string()));
    assert_eq!(job.steps[1].body, StepBody::Run("echo two".to_string()));
}

#[test]
fn steps_list_accepts_bare_strings_and_mappings() {
    let yaml = r#"
jobs:
  build:
    steps:
      - "echo one"
      - name: two
        run: "echo two"
        detach: true
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    let job = pipeline.job("build").unwrap();
    assert_eq!(job.steps.len(), 2);
    assert_eq!(job.steps[0].body, StepBody::Run("echo one".to_string()));
    assert_eq!(job.steps[1].name, "two");
    assert!(job.steps[1].is_detached());
}

#[test]
fn step_body_priority_is_task_run_cmd_cmds() {
    let yaml = r#"
jobs:
  build:
    steps:
      - task: other:job
        run: "echo ignored"
        cmd: "echo also ignored"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    let job = pipeline.job("build").unwrap();
    assert_eq!(job.steps[0].body, StepBody::Task("other:job".to_string()));
}

#[test]
fn uses_is_an_alias_for_task() {
    let yaml = r#"
jobs:
  build:
    steps:
      - uses: other:job
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    let job = pipeline.job("build").unwrap();
    assert_eq!(job.steps[0].body, StepBody::Task("other:job".to_string()));
}

#[test]
fn single_variable_for_clause_parses() {
    let spec = parse_for_spec("item in things").unwrap();
    assert_eq!(
        spec,
        ForSpec::Single {
            var: "item".to_string(),
            source: "things".to_string(),
        }
    );
}

#[test]
fn pair_variable_for_clause_parses() {
    let spec = parse_for_spec("(i, item) in things").unwrap();
    assert_eq!(
        spec,
        ForSpec::Pair {
            first: "i".to_string(),
            second: "item".to_string(),
            source: "things".to_string(),
        }
    );
}

#[test]
fn for_clause_missing_in_is_an_error() {
    assert!(parse_for_spec("item things").is_err());
}

#[test]
fn depends_on_accepts_string_or_list() {
    let yaml = r#"
jobs:
  a: "echo a"
  b:
    depends_on: a
    run: "echo b"
  c:
    depends_on: [a, b]
    run: "echo c"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    assert_eq!(pipeline.job("b").unwrap().depends_on, vec!["a".to_string()]);
    assert_eq!(
        pipeline.job("c").unwrap().depends_on,
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn jobs_and_tasks_collapse_into_one_table() {
    let yaml = r#"
tasks:
  default: "echo hello"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    assert!(pipeline.job("default").is_some());
    assert!(pipeline.tasks().get("default").is_some());
}

#[test]
fn when_files_accepts_string_or_list() {
    let yaml = r#"
when:
  files: "Cargo.toml"
jobs:
  default: "echo hello"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    assert_eq!(pipeline.when.files, vec!["Cargo.toml".to_string()]);
}

#[test]
fn skill_pipeline_gets_id_from_default_when_undeclared() {
    let yaml = r#"
jobs:
  default: "echo hello"
"#;
    let pipeline = load_pipeline_str(yaml, "deploy").unwrap();
    assert_eq!(pipeline.id, "deploy");
}

#[test]
fn timeout_parses_duration_suffixes() {
    let yaml = r#"
jobs:
  build:
    timeout: "30s"
    run: "echo hi"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    assert_eq!(
        pipeline.job("build").unwrap().timeout,
        Some(std::time::Duration::from_secs(30))
    );
}

#[test]
fn vars_include_and_env_round_trip() {
    let yaml = r#"
vars:
  name: atkins
env:
  vars:
    APP: "${{ name }}"
jobs:
  default: "echo hi"
"#;
    let pipeline = load_pipeline_str(yaml, "").unwrap();
    assert_eq!(
        pipeline.declaration.vars.vars.get("name"),
        Some(&atkins_core::Value::from("atkins"))
    );
    assert_eq!(
        pipeline.declaration.env.vars.get("APP"),
        Some(&atkins_core::Value::from("${{ name }}"))
    );
}

#[test]
fn invalid_yaml_is_reported() {
    let err = load_pipeline_str("not: [valid", "");
    assert!(err.is_err());
}
