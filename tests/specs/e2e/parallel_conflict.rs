// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 scenario: two parallel branches write the same path; the
//! last-declared sibling's write must win once merged back (§4.4).

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.write_first]
commands = ["echo first > shared.txt"]

[jobs.write_second]
commands = ["echo second > shared.txt"]

[jobs.read_shared]
commands = ["cp shared.txt out.txt"]
artifacts = [ { includes = ["out.txt"] } ]

[executions.ci]
steps = [
  { parallel = [ { job = "write_first" }, { job = "write_second" } ] },
  { job = "read_shared" },
]
"#;

#[test]
#[ignore = "requires a running Docker daemon"]
fn later_declared_sibling_wins_the_conflicting_write() {
    if !docker_available() {
        eprintln!("skipping: no docker daemon reachable");
        return;
    }
    let project = Project::with_pipeline(PIPELINE);
    project.oj().args(&["ci"]).passes();
    let contents = std::fs::read_to_string(artifact_path(&project, "out.txt")).expect("read artifact");
    assert_eq!(contents.trim(), "second");
}
