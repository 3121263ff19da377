// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 scenario: a sequential chain of jobs, each seeing the filesystem
//! changes the previous job made, inside one build container.

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.write_a]
commands = ["mkdir -p out", "echo a > out/a.txt"]

[jobs.write_b]
commands = ["test -f out/a.txt", "echo b > out/b.txt"]

[jobs.write_c]
commands = ["test -f out/a.txt", "test -f out/b.txt", "echo c > out/c.txt"]
artifacts = [ { includes = ["out/*.txt"] } ]

[executions.ci]
steps = [ { job = "write_a" }, { job = "write_b" }, { job = "write_c" } ]
"#;

#[test]
#[ignore = "requires a running Docker daemon"]
fn sequential_steps_see_each_others_filesystem_changes() {
    if !docker_available() {
        eprintln!("skipping: no docker daemon reachable");
        return;
    }
    let project = Project::with_pipeline(PIPELINE);
    project.oj().args(&["ci"]).passes();
    assert!(artifact_path(&project, "out/a.txt").exists());
    assert!(artifact_path(&project, "out/b.txt").exists());
    assert!(artifact_path(&project, "out/c.txt").exists());
}
