// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj` — run one pipeline execution inside an isolated build container
//! (§6): init logging, read the host wrapper's environment contract, load
//! the pipeline, provision the container, orchestrate, close the container,
//! exit 0 on success or 1 on any failure.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cli;
mod env_contract;
mod exit_error;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use exit_error::ExitError;
use oj_adapters::{BindMount, ContainerDriver};
use oj_core::{ArtifactMover, JobExecutor, Pipeline};
use oj_engine::Orchestrator;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_BUILDER_IMAGE: &str = "debian:bookworm-slim";

// Host-side paths: the wrapper that launches `oj` writes these before the
// build container even exists, so they live next to `oj` itself rather than
// under the in-container `/kannich/...` layout used once a container is up.
const ENV_DUMP_PATH: &str = "/run/oj/env.dump";
const ENV_ALLOWLIST_PATH: &str = "/run/oj/env.allow";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    oj_core::logging::init(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(1);
        tracing::error!(error = %err, "oj failed");
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let dump_env = env_contract::read(
        std::path::Path::new(ENV_DUMP_PATH),
        std::path::Path::new(ENV_ALLOWLIST_PATH),
    )
    .context("reading the host wrapper's environment contract")?;

    let pipeline = oj_runbook::load(&cli.file)
        .with_context(|| format!("loading pipeline from {}", cli.file.display()))?;

    if cli.list {
        print_pipeline(&pipeline);
        return Ok(());
    }

    let execution_name = cli
        .execution
        .clone()
        .ok_or_else(|| ExitError::new(1, "an execution name is required unless --list is given"))?;

    let mut base_env = dump_env;
    for (key, value) in cli.env {
        base_env.insert(key, value);
    }

    let project_dir = std::env::current_dir().context("resolving the project directory")?;
    let artifact_dir = project_dir.join(".oj/artifacts");
    std::fs::create_dir_all(&artifact_dir)
        .with_context(|| format!("creating artifact directory {}", artifact_dir.display()))?;

    let cache_host_path = cache_dir(cli.dev_mode, &base_env)?;
    std::fs::create_dir_all(&cache_host_path)
        .with_context(|| format!("creating cache directory {cache_host_path}"))?;

    let project_bind = BindMount {
        host_path: project_dir.to_string_lossy().into_owned(),
        container_path: "/workspace".to_string(),
        read_only: true,
    };
    let cache_bind = BindMount {
        host_path: cache_host_path,
        container_path: "/kannich/cache".to_string(),
        read_only: false,
    };

    let driver = Arc::new(
        ContainerDriver::connect().context("connecting to the container runtime")?,
    );
    spawn_shutdown_hook(driver.clone());

    let builder_image =
        base_env.get("OJ_BUILDER_IMAGE").cloned().unwrap_or_else(|| DEFAULT_BUILDER_IMAGE.to_string());
    driver
        .initialize(&builder_image, &project_bind, &cache_bind, None)
        .await
        .context("initializing the build container")?;

    let executor: Arc<dyn JobExecutor> = driver.clone();
    let mover: Arc<dyn ArtifactMover> = driver.clone();
    let orchestrator = Orchestrator::new(
        executor,
        mover,
        "/kannich/overlays",
        base_env,
        artifact_dir.to_string_lossy().into_owned(),
    );

    let outcome = orchestrator.run(&pipeline, &execution_name, "/workspace").await;
    let _ = driver.close().await;

    let result = outcome.with_context(|| format!("running execution `{execution_name}`"))?;
    if !result.success() {
        let message = match result.first_failure() {
            Some(failure) => format!(
                "execution `{execution_name}` failed: job `{}` {}",
                failure.name,
                failure.message.as_deref().unwrap_or("failed")
            ),
            None => format!("execution `{execution_name}` failed"),
        };
        return Err(ExitError::new(1, message).into());
    }
    Ok(())
}

/// Fires once on the first Ctrl-C: flips the process-wide shutdown flag and
/// tears the container down (§9 "shutdown hook"). Runs independently of the
/// normal `driver.close()` at the end of [`run`]; `close` is idempotent.
fn spawn_shutdown_hook(driver: Arc<ContainerDriver>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            oj_core::shutdown::request_shutdown();
            let _ = driver.close().await;
        }
    });
}

/// Pipeline-managed cache lives under the user's cache directory; `-d`
/// swaps in a host-provided path instead, taken from the allowlisted
/// `KANNICH_CACHE_DIR` entry with a project-local fallback (§6 `-d`).
fn cache_dir(dev_mode: bool, env: &HashMap<String, String>) -> anyhow::Result<String> {
    if dev_mode {
        return Ok(env.get("KANNICH_CACHE_DIR").cloned().unwrap_or_else(|| ".kannich-dev-cache".to_string()));
    }
    let base = dirs::cache_dir().context("resolving the user cache directory")?;
    Ok(base.join("oj").join("cache").to_string_lossy().into_owned())
}

fn print_pipeline(pipeline: &Pipeline) {
    println!("executions:");
    for name in pipeline.execution_names() {
        println!("  {name}");
    }
    println!("jobs:");
    for name in pipeline.job_names() {
        println!("  {name}");
    }
}
