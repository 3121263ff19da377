// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution result data model (§3).

use serde::{Deserialize, Serialize};

/// The outcome of a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub name: String,
    pub success: bool,
    pub message: Option<String>,
}

impl JobResult {
    pub fn ok(name: impl Into<String>) -> Self {
        Self { name: name.into(), success: true, message: None }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), success: false, message: Some(message.into()) }
    }
}

/// The outcome of one `oj <execution>` invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub jobs: Vec<JobResult>,
}

impl ExecutionResult {
    /// `success == all jobs success` (§3).
    pub fn success(&self) -> bool {
        self.jobs.iter().all(|j| j.success)
    }

    pub fn push(&mut self, job: JobResult) {
        self.jobs.push(job);
    }

    /// The first job to fail, if any — used for the single error-level
    /// summary line required by §7.
    pub fn first_failure(&self) -> Option<&JobResult> {
        self.jobs.iter().find(|j| !j.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_true_when_all_jobs_succeed() {
        let mut result = ExecutionResult::default();
        result.push(JobResult::ok("a"));
        result.push(JobResult::ok("b"));
        assert!(result.success());
    }

    #[test]
    fn success_is_false_when_any_job_fails() {
        let mut result = ExecutionResult::default();
        result.push(JobResult::ok("a"));
        result.push(JobResult::failed("b", "boom"));
        assert!(!result.success());
    }

    #[test]
    fn first_failure_returns_the_earliest_failed_job() {
        let mut result = ExecutionResult::default();
        result.push(JobResult::ok("a"));
        result.push(JobResult::failed("b", "boom"));
        result.push(JobResult::failed("c", "also boom"));
        assert_eq!(result.first_failure().unwrap().name, "b");
    }

    #[test]
    fn empty_execution_is_success() {
        assert!(ExecutionResult::default().success());
    }
}
