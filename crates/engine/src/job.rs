// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One job's lifecycle (§4.5 steps 1-6): create its layer, build its scope,
//! run its block, collect artifacts, run cleanup, then promote or destroy
//! the layer.
//!
//! `MountError` can only be raised by the container driver's `initialize`,
//! which runs once before the orchestrator starts — by the time a job is
//! running, every `OjError` that can reach here is job-scoped, so this
//! module treats all of them uniformly rather than threading
//! `is_job_scoped` through job execution.

use crate::artifacts;
use crate::layers::{LayerManager, LayerParent};
use oj_core::{ArtifactMover, Job, JobExecutor, JobResult, JobScope, Layer, OjError};
use std::collections::HashMap;
use std::sync::Arc;

pub struct JobOutcome {
    pub layer: Option<Layer>,
    pub result: JobResult,
}

/// Run `job` against parent layer `parent`, returning the job's new layer
/// on success (`None` on failure, after the layer has already been torn
/// down).
pub async fn run_job(
    executor: &Arc<dyn JobExecutor>,
    mover: &Arc<dyn ArtifactMover>,
    layers: &LayerManager,
    base_env: &HashMap<String, String>,
    host_artifact_dir: &str,
    job: &Job,
    parent: &Layer,
) -> JobOutcome {
    let layer = match layers.create(LayerParent::Layer(parent)).await {
        Ok(layer) => layer,
        Err(err) => {
            return JobOutcome {
                layer: None,
                result: JobResult::failed(job.name.clone(), err.job_message()),
            }
        }
    };

    let work_dir = layers.work_dir(&layer);
    let scope = JobScope::new(layer.id, work_dir, base_env.clone(), executor.clone());

    let block_result = (job.block)(scope.clone()).await;
    let artifact_result =
        artifacts::collect(executor, mover, &layer, host_artifact_dir, &scope.artifact_specs()).await;
    scope.run_cleanup().await;

    let outcome = block_result.and(artifact_result);
    match outcome {
        Ok(()) => JobOutcome { layer: Some(layer), result: JobResult::ok(job.name.clone()) },
        Err(err) => {
            let _ = layers.destroy(&layer).await;
            JobOutcome { layer: None, result: JobResult::failed(job.name.clone(), err.job_message()) }
        }
    }
}
