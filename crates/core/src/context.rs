// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ExecutionContext`: the value every resolver, the expression layer, and
//! the scheduler thread through a run.

use crate::event::EventSink;
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The outcome recorded for a completed step, keyed by node ID, so later
/// expressions (and a future "needs.<step>.output"-style feature) can refer
/// back to it. Kept intentionally small: callers that need the full output
/// read it from the execution tree node instead.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub passed: bool,
    pub exit_code: Option<i32>,
}

/// A run's shared, mutable execution state, cloned ("copied") at job and
/// iteration boundaries.
///
/// Cloning is deliberately asymmetric: `vars`/`env` are deep-copied so a
/// child job or loop iteration can overlay its own bindings without
/// affecting a sibling, while `results`, `completed_jobs`, and the event
/// sink are reference-counted and shared, since they accumulate facts about
/// the *whole* run rather than one branch of it.
pub struct ExecutionContext {
    pub cancellation: CancellationToken,
    pub vars: IndexMap<String, Value>,
    pub env: IndexMap<String, Value>,
    pub current_pipeline: Option<String>,
    pub current_job: Option<String>,
    pub current_step: Option<String>,
    /// Working directory command substitution, step commands, and for-source
    /// shell-outs run in: the overlay of pipeline/job/step `dir` overrides
    /// resolved so far. `None` means "inherit the process's own cwd".
    pub cwd: Option<PathBuf>,
    pub depth: usize,
    results: Arc<Mutex<IndexMap<String, StepResult>>>,
    completed_jobs: Arc<Mutex<HashSet<String>>>,
    step_counters: Arc<Mutex<HashMap<String, u64>>>,
    pub event_sink: Arc<dyn EventSink>,
}

impl ExecutionContext {
    pub fn new(event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            vars: IndexMap::new(),
            env: IndexMap::new(),
            current_pipeline: None,
            current_job: None,
            current_step: None,
            cwd: None,
            depth: 0,
            results: Arc::new(Mutex::new(IndexMap::new())),
            completed_jobs: Arc::new(Mutex::new(HashSet::new())),
            step_counters: Arc::new(Mutex::new(HashMap::new())),
            event_sink,
        }
    }

    /// Deep-copy variables/env, share everything else, and derive a child
    /// cancellation token so a job-level timeout cancelling this copy never
    /// cancels the parent (but the parent cancelling still cancels every
    /// child, since `CancellationToken::child_token` propagates downward).
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            vars: self.vars.clone(),
            env: self.env.clone(),
            current_pipeline: self.current_pipeline.clone(),
            current_job: self.current_job.clone(),
            current_step: self.current_step.clone(),
            cwd: self.cwd.clone(),
            depth: self.depth + 1,
            results: Arc::clone(&self.results),
            completed_jobs: Arc::clone(&self.completed_jobs),
            step_counters: Arc::clone(&self.step_counters),
            event_sink: Arc::clone(&self.event_sink),
        }
    }

    /// The union namespace `${{ }}` evaluates against: variables and env,
    /// env winning on key collision.
    pub fn namespace(&self) -> IndexMap<String, Value> {
        let mut merged = self.vars.clone();
        for (k, v) in &self.env {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    pub fn record_result(&self, node_id: impl Into<String>, result: StepResult) {
        self.results.lock().insert(node_id.into(), result);
    }

    pub fn result(&self, node_id: &str) -> Option<StepResult> {
        self.results.lock().get(node_id).cloned()
    }

    pub fn mark_job_completed(&self, job_name: impl Into<String>) {
        self.completed_jobs.lock().insert(job_name.into());
    }

    pub fn is_job_completed(&self, job_name: &str) -> bool {
        self.completed_jobs.lock().contains(job_name)
    }

    /// Allocates the next step index for `job_name`, starting at zero. Used
    /// to build stable node IDs like `jobs.<job>.steps.<index>`.
    pub fn next_step_index(&self, job_name: &str) -> u64 {
        let mut counters = self.step_counters.lock();
        let counter = counters.entry(job_name.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
