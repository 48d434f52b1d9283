// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution tree: the live, mutable structure the scheduler updates as
//! a run progresses, and the structure a display layer reads to render
//! progress.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// A node's lifecycle status. Transitions are monotone: `Pending` ->
/// `Running` -> one of the terminal statuses. `Conditional` is a special
/// initial status for nested job nodes awaiting the dependency resolver's
/// decision on whether they run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    Conditional,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Passed | NodeStatus::Failed | NodeStatus::Skipped
        )
    }

    /// Whether `self -> next` is a legal transition. `Conditional` may move
    /// to `Pending` once the resolver decides the job runs after all; every
    /// other non-terminal status only moves forward towards a terminal one,
    /// and no terminal status ever moves again.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        use NodeStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Conditional, Pending) => true,
            (Conditional, Running) => true,
            (Pending, Running) => true,
            (Pending, Skipped) => true,
            (Running, Passed) | (Running, Failed) | (Running, Skipped) => true,
            (same, next) if same == next => true,
            _ => false,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Passed => "passed",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
            NodeStatus::Conditional => "conditional",
        };
        write!(f, "{s}")
    }
}

/// Mutable node state, guarded by a single mutex per node so every mutation
/// (status transition, timing update, child append, output append) is one
/// atomic critical section instead of several independently-locked fields
/// that could be observed torn.
struct NodeState {
    status: NodeStatus,
    updated_at: SystemTime,
    start_offset: Option<Duration>,
    duration: Option<Duration>,
    output: String,
    children: Vec<Arc<Node>>,
}

pub struct Node {
    pub name: String,
    pub id: String,
    pub if_expr: Option<String>,
    pub dependencies: Vec<String>,
    pub deferred: bool,
    pub created_at: SystemTime,
    state: Mutex<NodeState>,
}

/// A read-only, fully-owned copy of a node's current state, for display
/// layers and the event log writer. Copy-on-read: snapshotting never blocks
/// or is blocked by further mutation of the live tree.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub name: String,
    pub id: String,
    pub status: NodeStatus,
    pub if_expr: Option<String>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub start_offset: Option<Duration>,
    pub duration: Option<Duration>,
    pub output: String,
    pub deferred: bool,
    pub children: Vec<NodeSnapshot>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Arc<Self> {
        let now = SystemTime::now();
        Arc::new(Self {
            name: name.into(),
            id: id.into(),
            if_expr: None,
            dependencies: Vec::new(),
            deferred: false,
            created_at: now,
            state: Mutex::new(NodeState {
                status: NodeStatus::Pending,
                updated_at: now,
                start_offset: None,
                duration: None,
                output: String::new(),
                children: Vec::new(),
            }),
        })
    }

    pub fn new_conditional(id: impl Into<String>, name: impl Into<String>) -> Arc<Self> {
        let node = Self::new(id, name);
        node.state.lock().status = NodeStatus::Conditional;
        node
    }

    /// Builds a step node with its declared `if`/`dependencies`/`deferred`
    /// fields populated, for the scheduler to attach to its job's node.
    /// These fields are set once, before the node is ever shared, via
    /// `Arc::get_mut` on the still-uniquely-owned `Arc` `Node::new` returns.
    #[allow(clippy::expect_used)]
    pub fn new_step(
        id: impl Into<String>,
        name: impl Into<String>,
        if_expr: Option<String>,
        dependencies: Vec<String>,
        deferred: bool,
    ) -> Arc<Self> {
        let mut node = Self::new(id, name);
        let inner = Arc::get_mut(&mut node).expect("freshly constructed Arc has one owner");
        inner.if_expr = if_expr;
        inner.dependencies = dependencies;
        inner.deferred = deferred;
        node
    }

    pub fn status(&self) -> NodeStatus {
        self.state.lock().status
    }

    /// Attempts the transition, returning whether it was applied. Illegal
    /// transitions (in particular, any attempt to move away from a terminal
    /// status) are rejected rather than silently applied, preserving the
    /// "terminal statuses never revert" invariant.
    pub fn transition_to(&self, next: NodeStatus) -> bool {
        let mut state = self.state.lock();
        if !state.status.can_transition_to(next) {
            return false;
        }
        state.status = next;
        state.updated_at = SystemTime::now();
        true
    }

    pub fn mark_started(&self, start_offset: Duration) {
        let mut state = self.state.lock();
        state.start_offset = Some(start_offset);
        state.updated_at = SystemTime::now();
    }

    pub fn mark_duration(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.duration = Some(duration);
        state.updated_at = SystemTime::now();
    }

    pub fn append_output(&self, chunk: &str) {
        let mut state = self.state.lock();
        state.output.push_str(chunk);
    }

    pub fn push_child(&self, child: Arc<Node>) {
        self.state.lock().children.push(child);
    }

    pub fn children(&self) -> Vec<Arc<Node>> {
        self.state.lock().children.clone()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let state = self.state.lock();
        NodeSnapshot {
            name: self.name.clone(),
            id: self.id.clone(),
            status: state.status,
            if_expr: self.if_expr.clone(),
            created_at: self.created_at,
            updated_at: state.updated_at,
            start_offset: state.start_offset,
            duration: state.duration,
            output: state.output.clone(),
            deferred: self.deferred,
            children: state.children.iter().map(|c| c.snapshot()).collect(),
        }
    }
}

/// The root of a single run's execution state.
pub struct ExecutionTree {
    pub root: Arc<Node>,
    /// Monotonic clock anchor for every node's `start_offset`.
    pub started_at: Instant,
}

impl ExecutionTree {
    pub fn new(pipeline_name: &str) -> Self {
        Self {
            root: Node::new("root", pipeline_name.to_string()),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        self.root.snapshot()
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
