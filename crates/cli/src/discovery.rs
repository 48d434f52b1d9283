// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery of the project root, the main pipeline file, and skill
//! pipeline directories. Kept on the CLI side, separate from the core
//! engine.

use std::path::{Path, PathBuf};

/// Candidate filenames for the main pipeline document, checked in order.
const PIPELINE_FILENAMES: &[&str] = &["atkins.yml", "atkins.yaml", ".atkins.yml", ".atkins.yaml"];

/// Subdirectory (relative to the project root) holding skill pipelines.
const SKILLS_DIR: &str = ".atkins/skills";

/// Walks up from `start` looking for a directory containing one of
/// [`PIPELINE_FILENAMES`]. Returns the matched file's path, not the
/// directory, so the loader can be handed it directly.
pub fn find_pipeline_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start.to_path_buf());
    while let Some(d) = dir {
        for name in PIPELINE_FILENAMES {
            let candidate = d.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        dir = d.parent().map(Path::to_path_buf);
    }
    None
}

/// The project root is the directory holding the resolved pipeline file.
pub fn project_root(pipeline_file: &Path) -> PathBuf {
    pipeline_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Every `*.yml`/`*.yaml` file directly inside `<root>/.atkins/skills`,
/// sorted by filename so discovery order is deterministic. Each file becomes
/// a skill pipeline whose `id` is set from its source filename.
pub fn discover_skill_files(root: &Path) -> Vec<PathBuf> {
    let dir = root.join(SKILLS_DIR);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext == "yml" || ext == "yaml")
        })
        .collect();
    files.sort();
    files
}

/// The `id` a skill pipeline takes on, derived from its filename (the stem,
/// without extension).
pub fn skill_id(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Global (cross-project) config directory, e.g. `~/.config/atkins` on
/// Linux. Returns `None` when the platform has no resolvable config
/// directory (matching `dirs::config_dir`'s own contract).
pub fn global_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("atkins"))
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
