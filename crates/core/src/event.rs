// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The append-only event log and the `EventSink` abstraction that records
//! into it.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Step,
    Substitution,
    Interpolation,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::Step => "step",
            EventType::Substitution => "substitution",
            EventType::Interpolation => "interpolation",
        };
        write!(f, "{s}")
    }
}

/// One entry in the append-only event log. Type-specific fields are plain
/// `Option`s rather than a per-variant enum: the set of fields a `Step`
/// event vs. a `Substitution` event populates is small and fixed, and a flat
/// struct serializes to one JSON document shape without an internally-tagged
/// enum's extra `type` bookkeeping.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub start: SystemTime,
    pub duration: Duration,
    pub error: Option<String>,
    /// The node this event concerns, e.g. `jobs.build.steps.0`.
    pub parent_id: Option<String>,
    pub command: Option<String>,
    pub dir: Option<String>,
    pub output: Option<String>,
    pub exit_code: Option<i32>,
}

impl Event {
    pub fn step(id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type: EventType::Step,
            start: SystemTime::now(),
            duration: Duration::ZERO,
            error: None,
            parent_id: Some(parent_id.into()),
            command: None,
            dir: None,
            output: None,
            exit_code: None,
        }
    }

    pub fn substitution(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type: EventType::Substitution,
            start: SystemTime::now(),
            duration: Duration::ZERO,
            error: None,
            parent_id: None,
            command: Some(command.into()),
            dir: None,
            output: None,
            exit_code: None,
        }
    }

    pub fn interpolation(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_type: EventType::Interpolation,
            start: SystemTime::now(),
            duration: Duration::ZERO,
            error: None,
            parent_id: None,
            command: None,
            dir: None,
            output: None,
            exit_code: None,
        }
    }
}

/// Identifying metadata for a single run. `git_info` is deliberately left as
/// an opaque, optional string: capturing it is out of scope for the core
/// engine, but the field exists so a caller that already has the
/// information (a wrapping CLI, say) can attach it without changing the
/// log's shape.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub run_id: String,
    pub created_at: SystemTime,
    pub pipeline_name: String,
    pub source_file: Option<PathBuf>,
    pub module_path: Option<String>,
    pub git_info: Option<String>,
}

impl RunMetadata {
    pub fn new(run_id: impl Into<String>, pipeline_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            created_at: SystemTime::now(),
            pipeline_name: pipeline_name.into(),
            source_file: None,
            module_path: None,
            git_info: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunResult::Passed => "pass",
            RunResult::Failed => "fail",
            RunResult::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub duration: Duration,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub result: RunResult,
}

impl Summary {
    pub fn compute(duration: Duration, total: usize, passed: usize, failed: usize, skipped: usize) -> Self {
        let result = if failed > 0 {
            RunResult::Failed
        } else if passed == 0 && skipped > 0 {
            RunResult::Skipped
        } else {
            RunResult::Passed
        };
        Self {
            duration,
            total,
            passed,
            failed,
            skipped,
            result,
        }
    }
}

/// Where a run's events are recorded. Implemented by [`EventLogger`] for a
/// real run and by [`NullEventSink`] when nothing should be recorded; every
/// caller just holds a `dyn EventSink` and never branches on "is there a
/// logger", the same effect a nil-safe logger interface gives a caller,
/// achieved here through dispatch rather than a null check.
pub trait EventSink: Send + Sync {
    fn record(&self, event: Event);
    fn finalize(&self, summary: Summary);
}

#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn record(&self, _event: Event) {}
    fn finalize(&self, _summary: Summary) {}
}

/// A real, in-memory append-only event log. `events` and `summary` share one
/// mutex: the log is small and short-lived enough (one run) that contention
/// is not a concern, and a single lock keeps "append a new event" and "read
/// everything for the final write" trivially consistent.
pub struct EventLogger {
    pub metadata: RunMetadata,
    inner: Mutex<EventLoggerState>,
}

#[derive(Default)]
struct EventLoggerState {
    events: Vec<Event>,
    summary: Option<Summary>,
}

impl EventLogger {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            inner: Mutex::new(EventLoggerState::default()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    pub fn summary(&self) -> Option<Summary> {
        self.inner.lock().summary.clone()
    }
}

impl EventSink for EventLogger {
    fn record(&self, event: Event) {
        self.inner.lock().events.push(event);
    }

    fn finalize(&self, summary: Summary) {
        self.inner.lock().summary = Some(summary);
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
