// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj --list` prints pipeline contents and exits without provisioning a
//! container (§10.4) — the one invocation shape exercisable without Docker.

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.build]
commands = ["cargo build"]

[jobs.test]
commands = ["cargo test"]

[executions.ci]
steps = [ { job = "build" }, { job = "test" } ]
"#;

#[test]
fn list_prints_executions_and_jobs_and_exits_zero() {
    let project = Project::with_pipeline(PIPELINE);
    project
        .oj()
        .args(&["--list"])
        .passes()
        .stdout_has("ci")
        .stdout_has("build")
        .stdout_has("test");
}

#[test]
fn list_does_not_require_a_positional_execution() {
    let project = Project::with_pipeline(PIPELINE);
    project.oj().args(&["--list"]).passes();
}

#[test]
fn missing_execution_without_list_fails() {
    let project = Project::with_pipeline(PIPELINE);
    project.oj().fails().stdout_has("required unless");
}
