// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Colorization utilities: same `NO_COLOR`/`COLOR` precedence and "first
//! word decides the color" approach used elsewhere in the workspace for
//! status text, applied here to node statuses.

use atkins_core::NodeStatus;
use std::io::IsTerminal;

const RESET: &str = "\x1b[0m";

/// Priority: `NO_COLOR=1` disables, `COLOR=1` forces, otherwise a TTY check.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

fn wrap(code: &str, text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    format!("{code}{text}{RESET}")
}

pub fn green(text: &str) -> String {
    wrap("\x1b[32m", text)
}

pub fn red(text: &str) -> String {
    wrap("\x1b[31m", text)
}

pub fn yellow(text: &str) -> String {
    wrap("\x1b[33m", text)
}

pub fn muted(text: &str) -> String {
    wrap("\x1b[38;5;240m", text)
}

/// Colorize a node's status label for tree rendering: green for
/// passed/running, yellow for pending/conditional, red for failed, muted
/// for skipped.
pub fn node_status(status: NodeStatus) -> String {
    let label = status.to_string();
    match status {
        NodeStatus::Passed | NodeStatus::Running => green(&label),
        NodeStatus::Pending | NodeStatus::Conditional => yellow(&label),
        NodeStatus::Failed => red(&label),
        NodeStatus::Skipped => muted(&label),
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
