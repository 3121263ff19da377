// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §8 scenario: an artifact include that tries to escape the layer root
//! via `..` must be rejected by the mover's anti-traversal check rather
//! than silently copied onto the host (§4.6).

use crate::prelude::*;

const PIPELINE: &str = r#"
[jobs.escape]
commands = ["echo payload > payload.txt"]
artifacts = [ { includes = ["../outside.txt"] } ]

[executions.ci]
steps = [ { job = "escape" } ]
"#;

#[test]
#[ignore = "requires a running Docker daemon"]
fn artifact_include_escaping_the_layer_root_is_rejected() {
    if !docker_available() {
        eprintln!("skipping: no docker daemon reachable");
        return;
    }
    let project = Project::with_pipeline(PIPELINE);
    project.oj().args(&["ci"]).fails();
    assert!(!artifact_path(&project, "outside.txt").exists());
}
