// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow description: project metadata, targets, and build jobs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project metadata and repository/documentation/hosting credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Global {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_year: u32,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: Vec<String>,
    #[serde(default)]
    pub flowid: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub repo_branch: String,
    #[serde(default)]
    pub repo_user: String,
    #[serde(default)]
    pub repo_pass: String,
    #[serde(default)]
    pub doc_repo_url: String,
    #[serde(default)]
    pub doc_repo_user: String,
    #[serde(default)]
    pub doc_repo_pass: String,
    #[serde(default)]
    pub doc_url: String,
    #[serde(default)]
    pub web_report_repo_url: String,
    #[serde(default)]
    pub web_report_repo_user: String,
    #[serde(default)]
    pub web_report_repo_pass: String,
    #[serde(default)]
    pub hosting_url: String,
    #[serde(default)]
    pub hosting_user: String,
    #[serde(default)]
    pub hosting_pass: String,
    #[serde(default)]
    pub hosting_cert: bool,
    #[serde(default)]
    pub hosting_docpath: String,
    #[serde(default)]
    pub hosting_buildpath: String,
}

fn default_true() -> bool {
    true
}

/// One file or directory tree pulled from the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Repository-relative name.
    pub name: String,
    /// Optional destination subpath; defaults to `name`.
    #[serde(default)]
    pub dest: String,
    /// Documentation URL path segment for header links.
    #[serde(default)]
    pub url: String,
    /// Test executable name, for test targets.
    #[serde(default)]
    pub exec: String,
    /// Prepend the legal header to source files.
    #[serde(default)]
    pub legal: bool,
    /// Run the formatter over source files.
    #[serde(default = "default_true")]
    pub format: bool,
    /// Run static analysis (informational only).
    #[serde(default)]
    pub analyzer: bool,
    /// Last-changed revision, resolved at loop start.
    #[serde(skip)]
    pub repo_vers: Option<u32>,
}

impl Target {
    /// Destination name inside the staging tree.
    pub fn dest_name(&self) -> &str {
        if self.dest.is_empty() {
            &self.name
        } else {
            &self.dest
        }
    }
}

/// One build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Stable id assigned by position in the workflow.
    #[serde(skip)]
    pub id: u32,
    pub priority: u32,
    pub name: String,
    pub config: String,
    pub generator: String,
    #[serde(default)]
    pub opts: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A job picked for the running loop: the workflow job index plus the
/// report-side job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedJob {
    pub job: usize,
    pub id: usize,
}

/// Job priorities live in `1..=MAX_PRIORITY`.
pub const MAX_PRIORITY: u32 = 50;

/// Errors found when validating a loaded workflow file.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("job '{0}' with empty name")]
    EmptyJobName(u32),
    #[error("duplicated job '{0}'")]
    DuplicateJob(String),
    #[error("job '{name}' priority '{priority}' out of range")]
    InvalidPriority { name: String, priority: u32 },
    #[error("duplicated target '{0}'")]
    DuplicateTarget(String),
}

/// A complete workflow file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub global: Global,
    /// Repository-relative file holding the project version.
    #[serde(default)]
    pub version: String,
    /// Repository-relative path of the revision marker file.
    #[serde(default)]
    pub build: String,
    /// Regular expressions for repository paths to skip.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub sources: Vec<Target>,
    #[serde(default)]
    pub tests: Vec<Target>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl Workflow {
    /// Assign job ids and check workflow invariants.
    pub fn validate(&mut self) -> Result<(), WorkflowError> {
        for (i, job) in self.jobs.iter_mut().enumerate() {
            job.id = i as u32;
        }

        for (i, job) in self.jobs.iter().enumerate() {
            if job.name.is_empty() {
                return Err(WorkflowError::EmptyJobName(job.id));
            }
            if job.priority == 0 || job.priority > MAX_PRIORITY {
                return Err(WorkflowError::InvalidPriority {
                    name: job.name.clone(),
                    priority: job.priority,
                });
            }
            if self.jobs[i + 1..].iter().any(|j| j.name == job.name) {
                return Err(WorkflowError::DuplicateJob(job.name.clone()));
            }
        }

        check_unique_targets(&self.sources)?;
        check_unique_targets(&self.tests)?;
        Ok(())
    }

    /// True when any test target names an executable to run.
    pub fn with_test_execs(&self) -> bool {
        self.tests.iter().any(|t| !t.exec.is_empty())
    }

    /// Highest resolved revision across sources and tests, with the
    /// target name that carries it. The revision under build.
    pub fn revision_under_build(&self) -> Option<(u32, &str)> {
        self.sources
            .iter()
            .chain(self.tests.iter())
            .filter_map(|t| t.repo_vers.map(|v| (v, t.name.as_str())))
            .max_by_key(|(v, _)| *v)
    }
}

fn check_unique_targets(targets: &[Target]) -> Result<(), WorkflowError> {
    for (i, target) in targets.iter().enumerate() {
        if targets[i + 1..].iter().any(|t| t.name == target.name) {
            return Err(WorkflowError::DuplicateTarget(target.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
