// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution orchestrator (§4.4): walks one execution's step tree,
//! threading a parent layer through sequential children and fanning out
//! parallel ones, aggregating per-job results as it goes.
//!
//! Recursion across `Sequential`/`Parallel`/`ExecutionRef` is expressed as
//! `Box::pin`'d async functions, the same shape an earlier recursive step
//! walk in this crate used.

use crate::job::{self, JobOutcome};
use crate::layers::{LayerManager, LayerParent};
use futures_util::future::join_all;
use oj_core::{ArtifactMover, BoxFuture, ExecutionResult, JobExecutor, JobResult, Layer, OjError, Pipeline, Step};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Orchestrator {
    executor: Arc<dyn JobExecutor>,
    mover: Arc<dyn ArtifactMover>,
    layers: LayerManager,
    base_env: HashMap<String, String>,
    host_artifact_dir: String,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn JobExecutor>,
        mover: Arc<dyn ArtifactMover>,
        overlays_root: impl Into<String>,
        base_env: HashMap<String, String>,
        host_artifact_dir: impl Into<String>,
    ) -> Self {
        let layers = LayerManager::new(executor.clone(), overlays_root);
        Self { executor, mover, layers, base_env, host_artifact_dir: host_artifact_dir.into() }
    }

    /// Entry point (§4.4): look up `execution_name`, create a root layer
    /// based on `workspace`, and run its steps sequentially.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        execution_name: &str,
        workspace: &str,
    ) -> Result<ExecutionResult, OjError> {
        let execution = pipeline
            .execution(execution_name)
            .ok_or_else(|| OjError::LayerError(format!("unknown execution {execution_name}")))?;

        let root = self.layers.create(LayerParent::Workspace(workspace)).await?;
        let results = Mutex::new(Vec::new());

        // `run_sequential` only releases layers it promotes past `root`; `root`
        // itself is always ours to release, whether or not the walk ever got
        // past its first step. `destroy` is idempotent, so this is safe even
        // when a successful chain already tore `root` down on the way.
        let outcome = self.run_sequential(pipeline, &execution.steps, root.clone(), &results).await;
        match outcome {
            Ok(final_layer) => {
                let _ = self.layers.destroy(&final_layer).await;
            }
            Err(_) => {
                let _ = self.layers.destroy(&root).await;
            }
        }

        Ok(ExecutionResult { jobs: results.into_inner() })
    }

    fn run_sequential<'a>(
        &'a self,
        pipeline: &'a Pipeline,
        steps: &'a [Step],
        parent: Layer,
        results: &'a Mutex<Vec<JobResult>>,
    ) -> BoxFuture<'a, Result<Layer, OjError>> {
        Box::pin(async move {
            let parent_id = parent.id;
            let mut current = parent;
            let mut failure: Option<OjError> = None;

            'steps: for (index, step) in steps.iter().enumerate() {
                if oj_core::shutdown::is_shutting_down() {
                    failure = Some(OjError::ShutdownRequested);
                    break 'steps;
                }
                let has_following_sibling = index + 1 < steps.len();

                match step {
                    Step::JobRef(name) => {
                        let job = match pipeline.job(name) {
                            Some(job) => job,
                            None => {
                                failure = Some(OjError::LayerError(format!("unknown job {name}")));
                                break 'steps;
                            }
                        };
                        let JobOutcome { layer, result } = job::run_job(
                            &self.executor,
                            &self.mover,
                            &self.layers,
                            &self.base_env,
                            &self.host_artifact_dir,
                            job,
                            &current,
                        )
                        .await;
                        let failed = !result.success;
                        results.lock().push(result);
                        match layer {
                            Some(next) => {
                                let _ = self.layers.destroy(&current).await;
                                current = next;
                            }
                            None => {
                                debug_assert!(failed);
                                failure = Some(OjError::JobFailed(format!("job {name} failed")));
                                break 'steps;
                            }
                        }
                    }
                    Step::ExecutionRef(name) => {
                        let referenced = match pipeline.execution(name) {
                            Some(execution) => execution,
                            None => {
                                failure =
                                    Some(OjError::LayerError(format!("unknown execution {name}")));
                                break 'steps;
                            }
                        };
                        match self
                            .run_sequential(pipeline, &referenced.steps, current.clone(), results)
                            .await
                        {
                            Ok(next) => current = next,
                            Err(err) => {
                                failure = Some(err);
                                break 'steps;
                            }
                        }
                    }
                    Step::Sequential(children) => {
                        match self.run_sequential(pipeline, children, current.clone(), results).await {
                            Ok(next) => current = next,
                            Err(err) => {
                                failure = Some(err);
                                break 'steps;
                            }
                        }
                    }
                    Step::Parallel(children) => {
                        match self
                            .run_parallel(pipeline, children, current.clone(), results, has_following_sibling)
                            .await
                        {
                            Ok(next) => current = next,
                            Err(err) => {
                                failure = Some(err);
                                break 'steps;
                            }
                        }
                    }
                }
            }

            match failure {
                None => Ok(current),
                Some(err) => {
                    // Any layer we promoted to above and haven't yet handed off is ours to
                    // release; a nested call that failed has already released its own.
                    if current.id != parent_id {
                        let _ = self.layers.destroy(&current).await;
                    }
                    Err(err)
                }
            }
        })
    }

    fn run_parallel<'a>(
        &'a self,
        pipeline: &'a Pipeline,
        children: &'a [Step],
        parent: Layer,
        results: &'a Mutex<Vec<JobResult>>,
        has_following_sibling: bool,
    ) -> BoxFuture<'a, Result<Layer, OjError>> {
        Box::pin(async move {
            let branch_futures = children.iter().map(|child| {
                let branch = std::slice::from_ref(child);
                self.run_sequential(pipeline, branch, parent.clone(), results)
            });
            let branch_outcomes: Vec<Result<Layer, OjError>> = join_all(branch_futures).await;

            let mut any_failed = false;
            let mut branch_layers = Vec::new();
            for outcome in branch_outcomes {
                match outcome {
                    Ok(layer) => branch_layers.push(layer),
                    Err(_) => any_failed = true,
                }
            }

            if has_following_sibling && !any_failed {
                for layer in &branch_layers {
                    if layer.id != parent.id {
                        let diff = self.layers.diff(layer).await?;
                        self.apply_diff(&parent, &diff).await?;
                    }
                }
            }

            for layer in &branch_layers {
                if layer.id != parent.id {
                    let _ = self.layers.destroy(layer).await;
                }
            }

            if any_failed {
                return Err(OjError::JobFailed("parallel block had a failing child".to_string()));
            }
            Ok(parent)
        })
    }

    /// Copy a child branch's upper-layer diff back into the parent layer's
    /// upper dir, later children overwriting earlier ones, honoring
    /// whiteouts/opaque markers as deletions (§4.4).
    async fn apply_diff(&self, parent: &Layer, diff: &crate::layers::LayerDiff) -> Result<(), OjError> {
        if diff.modified.is_empty() && diff.deleted.is_empty() {
            return Ok(());
        }
        let mut script = String::from("set -e\n");
        for path in &diff.deleted {
            script.push_str(&format!("rm -rf '{}/{path}'\n", parent.upper_dir));
        }
        for path in &diff.modified {
            script.push_str(&format!(
                "mkdir -p \"$(dirname '{}/{path}')\"\ncp -a '{}/{path}' '{}/{path}'\n",
                parent.upper_dir, parent.upper_dir, parent.upper_dir
            ));
        }
        let out = self
            .executor
            .exec_shell(&script, "/", &HashMap::new(), true)
            .await?;
        if !out.success() {
            return Err(OjError::LayerError(format!(
                "reconciling parallel diff into {}: {}",
                parent.id, out.stderr
            )));
        }
        Ok(())
    }
}
