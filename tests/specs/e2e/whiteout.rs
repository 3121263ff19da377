// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 scenario: a parallel branch deletes a file that existed in its
//! parent layer; the deletion must propagate as a whiteout once merged,
//! not silently vanish from the diff (§4.4).

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.seed]
commands = ["echo stale > stale.txt", "echo keep > keep.txt"]

[jobs.remove_stale]
commands = ["rm stale.txt"]

[jobs.verify_removed]
commands = ["test ! -f stale.txt", "cp keep.txt out.txt"]
artifacts = [ { includes = ["out.txt"] } ]

[executions.ci]
steps = [
  { job = "seed" },
  { parallel = [ { job = "remove_stale" } ] },
  { job = "verify_removed" },
]
"#;

#[test]
#[ignore = "requires a running Docker daemon"]
fn deletion_in_a_parallel_branch_propagates_as_a_whiteout() {
    if !docker_available() {
        eprintln!("skipping: no docker daemon reachable");
        return;
    }
    let project = Project::with_pipeline(PIPELINE);
    project.oj().args(&["ci"]).passes();
    assert!(artifact_path(&project, "out.txt").exists());
}
