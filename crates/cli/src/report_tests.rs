// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atkins_core::{Node, NodeStatus};
use std::time::Duration;

#[test]
fn build_includes_metadata_state_events_and_summary() {
    let metadata = RunMetadata::new("run-1", "demo");
    let root = Node::new("root", "demo");
    let step = Node::new("jobs.build.steps.0", "one");
    step.transition_to(NodeStatus::Running);
    step.transition_to(NodeStatus::Passed);
    root.push_child(step);
    let snapshot = root.snapshot();

    let event = Event::step("evt-1", "jobs.build.steps.0");
    let summary = Summary::compute(Duration::from_secs(2), 1, 1, 0, 0);

    let doc = build(&metadata, &snapshot, &[event], Some(&summary));
    assert_eq!(doc["metadata"]["run_id"], "run-1");
    assert_eq!(doc["state"]["name"], "demo");
    assert_eq!(doc["state"]["children"][0]["result"], "pass");
    assert_eq!(doc["events"][0]["id"], "evt-1");
    assert_eq!(doc["summary"]["result"], "pass");
}

#[test]
fn non_terminal_node_has_null_result() {
    let node = Node::new("jobs.build", "build");
    let doc = node_json(&node.snapshot());
    assert!(doc["result"].is_null());
}
