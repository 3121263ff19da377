// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline loading happens before the container is ever provisioned
//! (§10.4), so a broken pipeline file fails fast without Docker.

use crate::prelude::*;

#[test]
fn malformed_toml_fails_before_any_container_work() {
    let project = Project::with_pipeline("not valid toml {{{");
    project.oj().args(&["ci"]).fails().stdout_has("loading pipeline");
}

#[test]
fn execution_referencing_an_unknown_job_fails() {
    let project = Project::with_pipeline(
        r#"
        [executions.ci]
        steps = [ { job = "missing" } ]
        "#,
    );
    project.oj().args(&["ci"]).fails().stdout_has("missing");
}

#[test]
fn unknown_execution_name_fails() {
    let project = Project::with_pipeline(
        r#"
        [jobs.build]
        commands = []

        [executions.ci]
        steps = [ { job = "build" } ]
        "#,
    );
    project.oj().args(&["nightly"]).fails();
}
