// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 scenario: a parallel fan-out whose branches touch disjoint files,
//! merged back into a single layer a following sequential step can see.

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.write_left]
commands = ["mkdir -p out", "echo left > out/left.txt"]

[jobs.write_right]
commands = ["mkdir -p out", "echo right > out/right.txt"]

[jobs.verify_both]
commands = ["test -f out/left.txt", "test -f out/right.txt"]
artifacts = [ { includes = ["out/*.txt"] } ]

[executions.ci]
steps = [
  { parallel = [ { job = "write_left" }, { job = "write_right" } ] },
  { job = "verify_both" },
]
"#;

#[test]
#[ignore = "requires a running Docker daemon"]
fn disjoint_parallel_branches_merge_into_the_next_step() {
    if !docker_available() {
        eprintln!("skipping: no docker daemon reachable");
        return;
    }
    let project = Project::with_pipeline(PIPELINE);
    project.oj().args(&["ci"]).passes();
    assert!(artifact_path(&project, "out/left.txt").exists());
    assert!(artifact_path(&project, "out/right.txt").exists());
}
