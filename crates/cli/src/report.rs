// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the structured event-log document
//! (`metadata`/`state`/`events`/`summary`) as a `serde_json::Value` —
//! JSON-first, written with `serde_json::to_writer_pretty`.

use atkins_core::{Event, NodeSnapshot, RunMetadata, RunResult, Summary};
use serde_json::{json, Value};

pub fn build(metadata: &RunMetadata, state: &NodeSnapshot, events: &[Event], summary: Option<&Summary>) -> Value {
    json!({
        "metadata": metadata_json(metadata),
        "state": node_json(state),
        "events": events.iter().map(event_json).collect::<Vec<_>>(),
        "summary": summary.map(summary_json),
    })
}

fn metadata_json(metadata: &RunMetadata) -> Value {
    json!({
        "run_id": metadata.run_id,
        "created_at": system_time_json(metadata.created_at),
        "pipeline_name": metadata.pipeline_name,
        "source_file": metadata.source_file.as_ref().map(|p| p.display().to_string()),
        "module_path": metadata.module_path,
        "git_info": metadata.git_info,
    })
}

fn node_json(node: &NodeSnapshot) -> Value {
    json!({
        "name": node.name,
        "id": node.id,
        "status": node.status.to_string(),
        "result": node_result(node.status),
        "if": node.if_expr,
        "created_at": system_time_json(node.created_at),
        "updated_at": system_time_json(node.updated_at),
        "start": node.start_offset.map(|d| d.as_secs_f64()),
        "duration": node.duration.map(|d| d.as_secs_f64()),
        "deferred": node.deferred,
        "output": node.output,
        "children": node.children.iter().map(node_json).collect::<Vec<_>>(),
    })
}

/// The lowercase `pass`/`fail`/`skipped` label for a node's `result` field,
/// distinct from its raw `status` label — only terminal statuses have a
/// result; non-terminal nodes get `null`.
fn node_result(status: atkins_core::NodeStatus) -> Option<&'static str> {
    use atkins_core::NodeStatus::*;
    match status {
        Passed => Some("pass"),
        Failed => Some("fail"),
        Skipped => Some("skipped"),
        Pending | Running | Conditional => None,
    }
}

fn event_json(event: &Event) -> Value {
    json!({
        "id": event.id,
        "type": event.event_type.to_string(),
        "start": system_time_json(event.start),
        "duration": event.duration.as_secs_f64(),
        "error": event.error,
        "parent_id": event.parent_id,
        "command": event.command,
        "dir": event.dir,
        "output": event.output,
        "exit_code": event.exit_code,
    })
}

fn summary_json(summary: &Summary) -> Value {
    json!({
        "duration": summary.duration.as_secs_f64(),
        "total": summary.total,
        "passed": summary.passed,
        "failed": summary.failed,
        "skipped": summary.skipped,
        "result": run_result(summary.result),
    })
}

fn run_result(result: RunResult) -> &'static str {
    match result {
        RunResult::Passed => "pass",
        RunResult::Failed => "fail",
        RunResult::Skipped => "skipped",
    }
}

fn system_time_json(time: std::time::SystemTime) -> Value {
    match time.duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => json!(d.as_secs_f64()),
        Err(_) => Value::Null,
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
