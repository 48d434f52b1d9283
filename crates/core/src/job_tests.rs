// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn nested_is_derived_from_colon_in_name() {
    assert!(Job::new("ci:build").is_nested());
    assert!(!Job::new("build").is_nested());
}

#[test]
fn has_alias_checks_membership() {
    let mut job = Job::new("build");
    job.aliases.push("b".into());
    assert!(job.has_alias("b"));
    assert!(!job.has_alias("x"));
}
