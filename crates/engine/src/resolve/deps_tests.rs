// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atkins_core::{AtkinsError, Job, ResolutionError};

fn jobs_map(jobs: Vec<Job>) -> IndexMap<String, Job> {
    let mut map = IndexMap::new();
    for j in jobs {
        map.insert(j.name.clone(), j);
    }
    map
}

fn job_with_deps(name: &str, deps: &[&str]) -> Job {
    let mut j = Job::new(name);
    j.depends_on = deps.iter().map(|d| d.to_string()).collect();
    j
}

#[test]
fn starting_job_with_no_dependencies_chain_is_itself() {
    let jobs = jobs_map(vec![Job::new("build")]);
    let chain = resolve_dependency_chain(&jobs, Some("build")).unwrap();
    assert_eq!(chain, vec!["build".to_string()]);
}

#[test]
fn linear_chain_orders_dependencies_before_dependents() {
    let jobs = jobs_map(vec![
        Job::new("fmt"),
        job_with_deps("lint", &["fmt"]),
        job_with_deps("build", &["lint"]),
    ]);
    let chain = resolve_dependency_chain(&jobs, Some("build")).unwrap();
    assert_eq!(chain, vec!["fmt", "lint", "build"]);
}

#[test]
fn diamond_dependency_visits_shared_ancestor_once() {
    let jobs = jobs_map(vec![
        Job::new("base"),
        job_with_deps("left", &["base"]),
        job_with_deps("right", &["base"]),
        job_with_deps("top", &["left", "right"]),
    ]);
    let chain = resolve_dependency_chain(&jobs, Some("top")).unwrap();
    assert_eq!(chain, vec!["base", "left", "right", "top"]);
}

#[test]
fn missing_dependency_errors_naming_both_jobs() {
    let jobs = jobs_map(vec![job_with_deps("build", &["nonexistent"])]);
    let err = resolve_dependency_chain(&jobs, Some("build")).unwrap_err();
    match err {
        AtkinsError::Resolution(ResolutionError::MissingDependency { job, dependency }) => {
            assert_eq!(job, "build");
            assert_eq!(dependency, "nonexistent");
        }
        other => panic!("expected MissingDependency, got {other:?}"),
    }
}

#[test]
fn unknown_starting_job_is_job_not_found() {
    let jobs = jobs_map(vec![Job::new("build")]);
    let err = resolve_dependency_chain(&jobs, Some("ghost")).unwrap_err();
    assert!(matches!(
        err,
        AtkinsError::Resolution(ResolutionError::JobNotFound(s)) if s == "ghost"
    ));
}

#[test]
fn dependency_cycle_does_not_infinite_loop() {
    let jobs = jobs_map(vec![
        job_with_deps("a", &["b"]),
        job_with_deps("b", &["a"]),
    ]);
    let chain = resolve_dependency_chain(&jobs, Some("a")).unwrap();
    assert_eq!(chain.len(), 2);
    assert!(chain.contains(&"a".to_string()));
    assert!(chain.contains(&"b".to_string()));
}

#[test]
fn no_starting_job_picks_default_by_name() {
    let jobs = jobs_map(vec![Job::new("default"), Job::new("build")]);
    let chain = resolve_dependency_chain(&jobs, None).unwrap();
    assert_eq!(chain, vec!["default".to_string()]);
}

#[test]
fn no_starting_job_picks_default_by_alias_when_no_literal_default() {
    let mut main = Job::new("main");
    main.aliases.push("default".to_string());
    let jobs = jobs_map(vec![main]);
    let chain = resolve_dependency_chain(&jobs, None).unwrap();
    assert_eq!(chain, vec!["main".to_string()]);
}

#[test]
fn no_starting_job_and_no_default_is_an_error_excluding_nested_jobs() {
    let jobs = jobs_map(vec![Job::new("ci:build"), Job::new("ci:test")]);
    let err = resolve_dependency_chain(&jobs, None).unwrap_err();
    match err {
        AtkinsError::Resolution(ResolutionError::NoDefaultJob { candidates }) => {
            assert!(candidates.is_empty());
        }
        other => panic!("expected NoDefaultJob, got {other:?}"),
    }
}
