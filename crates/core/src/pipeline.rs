// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline data model (§3, §9).
//!
//! `Step` is the tagged sum §9 calls for — pattern-matched at the
//! orchestrator, no runtime inheritance. A `Pipeline` is the immutable tree
//! a front end (here, `oj-runbook`'s TOML loader) hands to the orchestrator;
//! the orchestrator never inspects how it was built.

use crate::scope::{BoxFuture, JobScope};
use crate::OjError;
use std::collections::HashMap;
use std::sync::Arc;

/// A suspendable procedure closure receiving the job's [`JobScope`] (§3).
pub type JobBlock = Arc<dyn Fn(JobScope) -> BoxFuture<'static, Result<(), OjError>> + Send + Sync>;

/// A named unit of user-defined work with its own private filesystem view.
#[derive(Clone)]
pub struct Job {
    pub name: String,
    pub description: Option<String>,
    pub block: JobBlock,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A named, ordered composition of steps, starting point of a run.
#[derive(Debug, Clone)]
pub struct Execution {
    pub name: String,
    pub steps: Vec<Step>,
}

/// One node in an execution's step tree (§3, §9).
#[derive(Debug, Clone)]
pub enum Step {
    /// Run the referenced job, by name.
    JobRef(String),
    /// Inline another execution's steps, sequentially, in place.
    ExecutionRef(String),
    /// Run children in order; stop on first failure.
    Sequential(Vec<Step>),
    /// Run children concurrently, each from a fresh layer branching off the
    /// same parent; the block fails if any child fails.
    Parallel(Vec<Step>),
}

/// The immutable tree supplied by the front end (§3).
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub jobs: HashMap<String, Job>,
    pub executions: HashMap<String, Execution>,
}

impl Pipeline {
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    pub fn execution(&self, name: &str) -> Option<&Execution> {
        self.executions.get(name)
    }

    /// Execution and job names in declaration-independent sorted order, for
    /// `oj --list` (§6).
    pub fn execution_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.executions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn job_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.jobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_job(name: &str) -> Job {
        Job {
            name: name.to_string(),
            description: None,
            block: Arc::new(|_scope| Box::pin(async { Ok(()) })),
        }
    }

    #[test]
    fn pipeline_looks_up_jobs_and_executions_by_name() {
        let mut pipeline = Pipeline::default();
        pipeline.jobs.insert("build".to_string(), noop_job("build"));
        pipeline.executions.insert(
            "ci".to_string(),
            Execution { name: "ci".to_string(), steps: vec![Step::JobRef("build".to_string())] },
        );

        assert!(pipeline.job("build").is_some());
        assert!(pipeline.job("missing").is_none());
        assert!(pipeline.execution("ci").is_some());
    }

    #[test]
    fn names_are_sorted() {
        let mut pipeline = Pipeline::default();
        pipeline.jobs.insert("zeta".to_string(), noop_job("zeta"));
        pipeline.jobs.insert("alpha".to_string(), noop_job("alpha"));
        assert_eq!(pipeline.job_names(), vec!["alpha", "zeta"]);
    }
}
