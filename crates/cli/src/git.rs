// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git/runtime metadata capture for the event log. Best-effort: any failure
//! (not a repo, `git` not on `PATH`, detached worktree) yields `None` rather
//! than aborting the run.

use std::path::Path;
use std::process::Command;

/// A short, human-readable description of the repository state at the
/// working directory used for the run, e.g. `"main@a1b2c3d"` or
/// `"main@a1b2c3d+dirty"`. Attached to [`atkins_core::RunMetadata::git_info`].
pub fn capture(cwd: Option<&Path>) -> Option<String> {
    let branch = run_git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let sha = run_git(cwd, &["rev-parse", "--short", "HEAD"])?;
    let dirty = !run_git(cwd, &["status", "--porcelain"])
        .unwrap_or_default()
        .is_empty();

    Some(if dirty {
        format!("{branch}@{sha}+dirty")
    } else {
        format!("{branch}@{sha}")
    })
}

fn run_git(cwd: Option<&Path>, args: &[&str]) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
