// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_node_starts_pending() {
    let node = Node::new("n1", "build");
    assert_eq!(node.status(), NodeStatus::Pending);
}

#[test]
fn pending_to_running_to_passed_succeeds() {
    let node = Node::new("n1", "build");
    assert!(node.transition_to(NodeStatus::Running));
    assert!(node.transition_to(NodeStatus::Passed));
    assert_eq!(node.status(), NodeStatus::Passed);
}

#[test]
fn terminal_status_never_reverts() {
    let node = Node::new("n1", "build");
    assert!(node.transition_to(NodeStatus::Running));
    assert!(node.transition_to(NodeStatus::Failed));
    assert!(!node.transition_to(NodeStatus::Running));
    assert!(!node.transition_to(NodeStatus::Passed));
    assert_eq!(node.status(), NodeStatus::Failed);
}

#[test]
fn pending_cannot_jump_straight_to_passed() {
    let node = Node::new("n1", "build");
    assert!(!node.transition_to(NodeStatus::Passed));
    assert_eq!(node.status(), NodeStatus::Pending);
}

#[test]
fn conditional_node_can_become_pending_then_run() {
    let node = Node::new_conditional("n1", "nested:job");
    assert_eq!(node.status(), NodeStatus::Conditional);
    assert!(node.transition_to(NodeStatus::Pending));
    assert!(node.transition_to(NodeStatus::Running));
    assert!(node.transition_to(NodeStatus::Passed));
}

#[test]
fn children_are_visible_in_snapshot() {
    let root = Node::new("root", "pipeline");
    root.push_child(Node::new("root.steps.0", "step one"));
    let snapshot = root.snapshot();
    assert_eq!(snapshot.children.len(), 1);
    assert_eq!(snapshot.children[0].name, "step one");
}

#[test]
fn snapshot_is_a_disconnected_copy() {
    let node = Node::new("n1", "build");
    let snapshot = node.snapshot();
    node.transition_to(NodeStatus::Running);
    assert_eq!(snapshot.status, NodeStatus::Pending);
    assert_eq!(node.status(), NodeStatus::Running);
}

#[test]
fn execution_tree_elapsed_is_nonnegative() {
    let tree = ExecutionTree::new("ci");
    assert!(tree.elapsed() >= Duration::ZERO);
}

#[test]
fn new_step_populates_declared_fields_before_sharing() {
    let node = Node::new_step(
        "jobs.build.steps.0",
        "compile",
        Some("1 == 1".to_string()),
        vec!["fmt".to_string()],
        true,
    );
    assert_eq!(node.if_expr.as_deref(), Some("1 == 1"));
    assert_eq!(node.dependencies, vec!["fmt".to_string()]);
    assert!(node.deferred);
    assert_eq!(node.status(), NodeStatus::Pending);
}
