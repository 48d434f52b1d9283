// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Pipeline` entity: the root of a loaded YAML document.

use crate::declaration::Declaration;
use crate::job::Job;
use crate::service::Service;
use crate::when::When;
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub name: String,
    /// For skill files, usually derived from the filename rather than
    /// declared inline.
    pub id: String,
    pub dir: Option<String>,
    pub declaration: Declaration,
    pub when: When,
    pub services: Vec<Service>,
    /// The canonical job table. `jobs` and `tasks` are the same underlying
    /// YAML vocabulary (either key is accepted at the top level); the
    /// loader merges whichever was present into this one map so there is
    /// never a second copy to keep in sync.
    jobs: IndexMap<String, Job>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> &IndexMap<String, Job> {
        &self.jobs
    }

    /// Alias accessor: `tasks` and `jobs` expose the same lookup.
    pub fn tasks(&self) -> &IndexMap<String, Job> {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> &mut IndexMap<String, Job> {
        &mut self.jobs
    }

    pub fn insert_job(&mut self, job: Job) {
        self.jobs.insert(job.name.clone(), job);
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    /// All jobs whose name contains `:`, in declaration order.
    pub fn nested_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values().filter(|j| j.is_nested())
    }

    /// First job matching `name` by exact name, else by alias, first match
    /// wins (direct name match always takes priority over an alias match).
    pub fn find_job(&self, name: &str) -> Option<&Job> {
        self.jobs
            .get(name)
            .or_else(|| self.jobs.values().find(|j| j.has_alias(name)))
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
