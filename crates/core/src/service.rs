// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service descriptions attached to a pipeline or job.
//!
//! Services describe a sidecar container a job can depend on (a database for
//! integration tests, for example). Starting them is out of scope for this
//! core: the data model only captures the declaration so a future runtime
//! layer has something to act on, and so round-tripping a pipeline through
//! the loader doesn't silently drop the `services` block.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Service {
    pub name: String,
    pub image: String,
    pub pull: PullPolicy,
    pub options: Vec<String>,
    pub ports: Vec<String>,
    pub env: IndexMap<String, String>,
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PullPolicy {
    #[default]
    IfNotPresent,
    Always,
    Never,
}

impl PullPolicy {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "always" => PullPolicy::Always,
            "never" => PullPolicy::Never,
            _ => PullPolicy::IfNotPresent,
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
