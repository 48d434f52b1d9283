// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal rendering: a display that accepts a tree snapshot and writes
//! frames. `atkins-cli` only needs the frame the engine hands back once a
//! run settles — the final tree frame is rendered on both success and
//! failure — so this is a single-frame renderer rather than the
//! incremental live repaint a long-running TUI would need. The ANSI
//! home/clear sequences are kept anyway so a future live mode can reuse
//! them.

use atkins_core::{NodeSnapshot, NodeStatus};
use std::fmt::Write as _;

use crate::color;

/// ANSI: move cursor to the top-left corner.
pub const CURSOR_HOME: &str = "\x1B[H";
/// ANSI: clear from cursor to end of screen.
pub const CLEAR_TO_END: &str = "\x1B[J";

/// Renders one full frame of a pipeline's execution tree: the root's name,
/// then each job and its steps indented by depth, each line's status
/// colorized per its lowercase status label.
pub fn render_tree(root: &NodeSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", root.name);
    for child in &root.children {
        render_node(&mut out, child, 1);
    }
    out
}

fn render_node(out: &mut String, node: &NodeSnapshot, depth: usize) {
    let indent = "  ".repeat(depth);
    let status = color::node_status(node.status);
    let duration = node
        .duration
        .map(|d| format!(" ({})", atkins_core::format_elapsed(d.as_secs())))
        .unwrap_or_default();
    let _ = writeln!(out, "{indent}{status} {}{duration}", node.name);
    for child in &node.children {
        render_node(out, child, depth + 1);
    }
}

/// Wraps `frame` with a cursor-home + clear-to-end sequence when `is_tty` is
/// true, so a caller repainting the same frame region doesn't leave stale
/// lines below a shorter redraw; a non-TTY caller (piped output, CI logs)
/// gets the frame text unmodified.
pub fn render_frame(frame: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{CURSOR_HOME}{frame}{CLEAR_TO_END}")
    } else {
        frame.to_string()
    }
}

/// The failure footer: `An error occurred in "<pipeline>" pipeline:`
/// followed by the exit code and indented error output.
pub fn failure_footer(pipeline_name: &str, exit_code: i32, output: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        color::red(&format!(
            "An error occurred in \"{pipeline_name}\" pipeline:"
        ))
    );
    let _ = writeln!(out, "exit code: {exit_code}");
    for line in output.lines() {
        let _ = writeln!(out, "    {line}");
    }
    out
}

/// The success footer: a green pass summary with the count of passing
/// steps.
pub fn success_footer(passed: usize, total: usize) -> String {
    color::green(&format!("{passed}/{total} steps passed"))
}

/// Count of "plain" step nodes (`jobs.<job>.steps.<n>`) whose terminal
/// status is `Passed`, matching the counting rule `atkins-engine::runner`
/// uses for the run summary.
pub fn count_passed_steps(node: &NodeSnapshot) -> (usize, usize) {
    let mut passed = 0;
    let mut total = 0;
    count_steps(node, &mut passed, &mut total);
    (passed, total)
}

fn count_steps(node: &NodeSnapshot, passed: &mut usize, total: &mut usize) {
    if node.id.split('.').count() == 4 && node.id.starts_with("jobs.") {
        *total += 1;
        if node.status == NodeStatus::Passed {
            *passed += 1;
        }
    }
    for child in &node.children {
        count_steps(child, passed, total);
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
