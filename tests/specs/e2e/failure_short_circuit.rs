// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 scenario: a failing job stops the sequential chain — later jobs
//! never run, and the failure surfaces through `ExecutionResult`, not a
//! process crash.

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.ok]
commands = ["echo ok"]

[jobs.boom]
commands = ["exit 7"]

[jobs.never_runs]
commands = ["echo should-not-print", "mkdir -p out", "echo nope > out/nope.txt"]
artifacts = [ { includes = ["out/*.txt"] } ]

[executions.ci]
steps = [ { job = "ok" }, { job = "boom" }, { job = "never_runs" } ]
"#;

#[test]
#[ignore = "requires a running Docker daemon"]
fn a_failing_job_short_circuits_the_remaining_chain() {
    if !docker_available() {
        eprintln!("skipping: no docker daemon reachable");
        return;
    }
    let project = Project::with_pipeline(PIPELINE);
    let outcome = project.oj().args(&["ci"]).fails();
    outcome.stdout_has("boom");
    assert!(!artifact_path(&project, "out/nope.txt").exists());
}
