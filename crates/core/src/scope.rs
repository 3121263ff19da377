// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobScope` — the per-job mutable bundle of §4.5, and the scoped
//! acquisitions (`cd`, `with_env`, `with_tools`, `on_cleanup`) that let a
//! job's block, and any tool code it calls, nest environment and working
//! directory changes safely.
//!
//! `JobScope` is a cheap `Clone` handle over `Arc<Inner>`: every mutable
//! field lives behind a `parking_lot::Mutex` so the *same* scope can be
//! handed to helper code that gets scheduled on a different worker thread
//! after an `.await` (§4.5 step 3, §9's context-propagation note) without
//! losing visibility of cleanup actions, artifact specs, or the current
//! directory. There is deliberately no thread-local: the scope is passed
//! explicitly, the representation the design notes call out as always safe.

use crate::exec::{ExecOutput, JobExecutor};
use crate::ids::LayerId;
use crate::OjError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, `Send` future — the common currency for suspendable job blocks,
/// cleanup actions, and scoped helpers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Include/exclude glob set naming files a job wants copied to the host
/// artifact directory (§3, §4.6).
#[derive(Debug, Clone, Default)]
pub struct ArtifactSpec {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl ArtifactSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.includes.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }
}

type CleanupAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), OjError>> + Send>;

struct Inner {
    layer_id: LayerId,
    executor: Arc<dyn JobExecutor>,
    base_env: HashMap<String, String>,
    env_overlays: Mutex<Vec<HashMap<String, Option<String>>>>,
    cwd_stack: Mutex<Vec<String>>,
    cleanup: Mutex<Vec<CleanupAction>>,
    artifacts: Mutex<Vec<ArtifactSpec>>,
}

/// Per-job mutable context (§3 "Job scope", §4.5).
#[derive(Clone)]
pub struct JobScope {
    inner: Arc<Inner>,
}

impl JobScope {
    /// Construct the initial scope for a job starting against layer
    /// `layer_id` whose merged view is `work_dir`. `base_env` is the
    /// host/CLI-forwarded environment folded with pipeline-level env
    /// (§4.5 step 2); it never changes for the lifetime of this scope —
    /// only the overlay stack pushed by `with_env`/`with_tools` does.
    pub fn new(
        layer_id: LayerId,
        work_dir: impl Into<String>,
        base_env: HashMap<String, String>,
        executor: Arc<dyn JobExecutor>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                layer_id,
                executor,
                base_env,
                env_overlays: Mutex::new(Vec::new()),
                cwd_stack: Mutex::new(vec![work_dir.into()]),
                cleanup: Mutex::new(Vec::new()),
                artifacts: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn layer_id(&self) -> LayerId {
        self.inner.layer_id
    }

    /// The effective working directory: the top of the `cd` stack.
    pub fn cwd(&self) -> String {
        self.inner
            .cwd_stack
            .lock()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    /// The effective environment: `base_env` folded with each overlay in
    /// push order, `None` values unsetting a binding (§4.5 `with_env`).
    pub fn env(&self) -> HashMap<String, String> {
        let mut env = self.inner.base_env.clone();
        for overlay in self.inner.env_overlays.lock().iter() {
            for (k, v) in overlay {
                match v {
                    Some(value) => {
                        env.insert(k.clone(), value.clone());
                    }
                    None => {
                        env.remove(k);
                    }
                }
            }
        }
        env
    }

    /// Run a command with the scope's current env/cwd (§4.1, §4.5).
    pub async fn run(&self, argv: &[String], silent: bool) -> Result<ExecOutput, OjError> {
        self.inner.executor.exec(argv, &self.cwd(), &self.env(), silent).await
    }

    /// Shell variant of [`JobScope::run`].
    pub async fn run_shell(&self, command: &str, silent: bool) -> Result<ExecOutput, OjError> {
        self.inner.executor.exec_shell(command, &self.cwd(), &self.env(), silent).await
    }

    /// Push a working directory for the duration of `f`, guaranteed-popped
    /// on every exit path (§4.5 `cd`).
    pub async fn cd<F, Fut, T>(&self, sub: impl AsRef<str>, f: F) -> T
    where
        F: FnOnce(JobScope) -> Fut,
        Fut: Future<Output = T>,
    {
        let next = join_under(&self.cwd(), sub.as_ref());
        self.inner.cwd_stack.lock().push(next);
        let result = f(self.clone()).await;
        self.inner.cwd_stack.lock().pop();
        result
    }

    /// Layer additional env bindings for the duration of `f`; `None` unsets
    /// a binding for that scope (§4.5 `with_env`).
    pub async fn with_env<F, Fut, T>(&self, overlay: HashMap<String, Option<String>>, f: F) -> T
    where
        F: FnOnce(JobScope) -> Fut,
        Fut: Future<Output = T>,
    {
        self.inner.env_overlays.lock().push(overlay);
        let result = f(self.clone()).await;
        self.inner.env_overlays.lock().pop();
        result
    }

    /// Prepend tool bin directories to `PATH` via [`JobScope::with_env`]
    /// (§4.5 `with_tools`).
    pub async fn with_tools<F, Fut, T>(&self, bin_dirs: &[impl AsRef<str>], f: F) -> T
    where
        F: FnOnce(JobScope) -> Fut,
        Fut: Future<Output = T>,
    {
        let current_path = self.env().get("PATH").cloned().unwrap_or_default();
        let prepended = bin_dirs.iter().map(|d| d.as_ref()).collect::<Vec<_>>().join(":");
        let new_path = if current_path.is_empty() {
            prepended
        } else {
            format!("{prepended}:{current_path}")
        };
        let mut overlay = HashMap::new();
        overlay.insert("PATH".to_string(), Some(new_path));
        self.with_env(overlay, f).await
    }

    /// Register a cleanup action, run LIFO after the block returns (§4.5
    /// step 5).
    pub fn on_cleanup<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), OjError>> + Send + 'static,
    {
        self.inner.cleanup.lock().push(Box::new(move || Box::pin(action())));
    }

    /// Append an artifact specification; multiple calls accumulate (§4.5
    /// step 4).
    pub fn artifacts(&self, spec: ArtifactSpec) {
        self.inner.artifacts.lock().push(spec);
    }

    pub fn artifact_specs(&self) -> Vec<ArtifactSpec> {
        self.inner.artifacts.lock().clone()
    }

    /// Terminate the block with a job-failure sentinel (§4.5 `fail`).
    pub fn fail(&self, message: impl Into<String>) -> OjError {
        OjError::JobFailed(message.into())
    }

    /// Run `f`, catching job-failure sentinels only; other error kinds
    /// still propagate (§4.5 `allow_failure`, §8 invariant).
    pub async fn allow_failure<F, Fut>(&self, f: F) -> Result<bool, OjError>
    where
        F: FnOnce(JobScope) -> Fut,
        Fut: Future<Output = Result<(), OjError>>,
    {
        match f(self.clone()).await {
            Ok(()) => Ok(true),
            Err(OjError::JobFailed(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Run every registered cleanup action in reverse registration order,
    /// logging and swallowing individual failures so one bad cleanup
    /// doesn't block the rest (§4.5 step 5).
    pub async fn run_cleanup(&self) {
        let actions: Vec<CleanupAction> = std::mem::take(&mut *self.inner.cleanup.lock());
        for action in actions.into_iter().rev() {
            if let Err(err) = action().await {
                tracing::error!(error = %err, "cleanup action failed");
            }
        }
    }
}

fn join_under(base: &str, sub: &str) -> String {
    if sub.starts_with('/') {
        sub.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), sub)
    }
}
