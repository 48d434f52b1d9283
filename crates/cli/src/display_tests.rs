// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use atkins_core::{Node, NodeStatus};

#[test]
fn render_tree_includes_root_and_child_names() {
    let root = Node::new("root", "demo");
    let job = Node::new("jobs.build", "build");
    job.transition_to(NodeStatus::Running);
    job.transition_to(NodeStatus::Passed);
    root.push_child(job);

    let snapshot = root.snapshot();
    let rendered = render_tree(&snapshot);
    assert!(rendered.contains("demo"));
    assert!(rendered.contains("build"));
}

#[test]
fn render_frame_wraps_with_ansi_only_when_tty() {
    let tty = render_frame("hello", true);
    assert!(tty.starts_with(CURSOR_HOME));
    assert!(tty.ends_with(CLEAR_TO_END));

    let plain = render_frame("hello", false);
    assert_eq!(plain, "hello");
}

#[test]
fn failure_footer_mentions_pipeline_and_exit_code() {
    let footer = failure_footer("demo", 1, "boom");
    assert!(footer.contains("demo"));
    assert!(footer.contains("exit code: 1"));
    assert!(footer.contains("    boom"));
}

#[test]
fn count_passed_steps_counts_only_plain_step_nodes() {
    let root = Node::new("root", "demo");
    let job = Node::new("jobs.build", "build");
    let step0 = Node::new("jobs.build.steps.0", "one");
    step0.transition_to(NodeStatus::Running);
    step0.transition_to(NodeStatus::Passed);
    let step1 = Node::new("jobs.build.steps.1", "two");
    step1.transition_to(NodeStatus::Running);
    step1.transition_to(NodeStatus::Failed);
    let iteration = Node::new("jobs.build.steps.1.0", "iter");
    step1.push_child(iteration);
    job.push_child(step0);
    job.push_child(step1);
    root.push_child(job);

    let (passed, total) = count_passed_steps(&root.snapshot());
    assert_eq!((passed, total), (1, 2));
}
