// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The artifact collector (§4.6): resolves a job's `ArtifactSpec`s against
//! its layer's file tree and bulk-copies the matches to the host.

use crate::glob;
use oj_core::{ArtifactMover, ArtifactSpec, JobExecutor, Layer, OjError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Runs the full §4.6 algorithm for one job: walk from each include
/// pattern's base prefix, match, subtract excludes, then copy. A spec list
/// with no includes at all is a no-op.
pub async fn collect(
    executor: &Arc<dyn JobExecutor>,
    mover: &Arc<dyn ArtifactMover>,
    layer: &Layer,
    host_artifact_dir: &str,
    specs: &[ArtifactSpec],
) -> Result<(), OjError> {
    let mut matched = BTreeSet::new();

    for spec in specs {
        for include in &spec.includes {
            for candidate in resolve_include(executor, &layer.merged_dir, include).await? {
                matched.insert(candidate);
            }
        }
    }

    for spec in specs {
        for exclude in &spec.excludes {
            matched.retain(|path: &String| !glob::matches(exclude, path));
        }
    }

    if matched.is_empty() {
        if specs.iter().any(|spec| !spec.includes.is_empty()) {
            tracing::warn!(layer = %layer.id, "artifact collection matched no files");
        }
        return Ok(());
    }

    let relative_paths: Vec<String> = matched.into_iter().collect();
    mover.copy_artifacts(&layer.merged_dir, &relative_paths, host_artifact_dir).await
}

async fn resolve_include(
    executor: &Arc<dyn JobExecutor>,
    merged_dir: &str,
    include: &str,
) -> Result<Vec<String>, OjError> {
    let compiled = glob::compile(include);

    if compiled.is_literal {
        let full_path = format!("{merged_dir}/{}", compiled.base_prefix);
        let out = executor
            .exec_shell(&format!("test -e '{full_path}'"), "/", &HashMap::new(), true)
            .await?;
        return Ok(if out.success() { vec![compiled.base_prefix] } else { Vec::new() });
    }

    let start_dir = if compiled.base_prefix.is_empty() {
        merged_dir.to_string()
    } else {
        format!("{merged_dir}/{}", compiled.base_prefix)
    };
    let maxdepth = match compiled.max_depth {
        Some(depth) => format!("-maxdepth {depth}"),
        None => String::new(),
    };
    let command = format!("find '{start_dir}' {maxdepth} -type f -printf '%P\\n' 2>/dev/null || true");
    let out = executor.exec_shell(&command, "/", &HashMap::new(), true).await?;

    let mut matches = Vec::new();
    for line in out.stdout.lines().filter(|line| !line.is_empty()) {
        let relative = if compiled.base_prefix.is_empty() {
            line.to_string()
        } else {
            format!("{}/{line}", compiled.base_prefix)
        };
        if glob::matches(include, &relative) {
            matches.push(relative);
        }
    }
    Ok(matches)
}
