// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help/usage specs (§6).

use crate::prelude::*;

#[test]
fn help_flag_shows_usage() {
    let project = Project::empty();
    project.oj().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn version_flag_shows_a_version() {
    let project = Project::empty();
    project.oj().args(&["--version"]).passes().stdout_has("0.2");
}

#[test]
fn missing_pipeline_file_fails_with_exit_code_one() {
    // Logging is routed through the masking writer onto stdout (§4.7), so
    // the failure line the masked subscriber prints lands there too.
    let project = Project::empty();
    project.oj().args(&["ci"]).fails().stdout_has("pipeline.toml");
}
