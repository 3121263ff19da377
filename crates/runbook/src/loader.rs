// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The TOML pipeline definition loader (§10.3).
//!
//! Jobs declare an ordered list of shell command lines plus artifact
//! include/exclude globs; executions declare a step tree of job refs,
//! execution refs, and `sequential`/`parallel` groupings. Loading validates
//! that every reference resolves within the same file before handing the
//! tree to the caller — the orchestrator assumes that's already true (§3).

use oj_core::{ArtifactSpec, Execution, Job, JobBlock, Pipeline, Step};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RunbookError {
    #[error("reading pipeline file {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },

    #[error("execution '{execution}' references unknown job '{job}'")]
    UnknownJob { execution: String, job: String },

    #[error("execution '{execution}' references unknown execution '{referenced}'")]
    UnknownExecution { execution: String, referenced: String },
}

#[derive(Deserialize)]
struct PipelineToml {
    #[serde(default)]
    jobs: HashMap<String, JobToml>,
    #[serde(default)]
    executions: HashMap<String, ExecutionToml>,
}

#[derive(Deserialize)]
struct JobToml {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    commands: Vec<String>,
    #[serde(default)]
    artifacts: Vec<ArtifactSpecToml>,
}

#[derive(Deserialize, Default)]
struct ArtifactSpecToml {
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
}

impl ArtifactSpecToml {
    fn into_spec(self) -> ArtifactSpec {
        let mut spec = ArtifactSpec::new();
        for include in self.includes {
            spec = spec.include(include);
        }
        for exclude in self.excludes {
            spec = spec.exclude(exclude);
        }
        spec
    }
}

#[derive(Deserialize)]
struct ExecutionToml {
    #[serde(default)]
    steps: Vec<StepToml>,
}

/// Untagged: each variant's field name is the discriminator, matching the
/// `{ job = "..." }` / `{ sequential = [...] }` shapes a pipeline author
/// writes directly in TOML inline tables.
#[derive(Deserialize)]
#[serde(untagged)]
enum StepToml {
    Job { job: String },
    Execution { execution: String },
    Sequential { sequential: Vec<StepToml> },
    Parallel { parallel: Vec<StepToml> },
}

fn convert_step(step: StepToml) -> Step {
    match step {
        StepToml::Job { job } => Step::JobRef(job),
        StepToml::Execution { execution } => Step::ExecutionRef(execution),
        StepToml::Sequential { sequential } => {
            Step::Sequential(sequential.into_iter().map(convert_step).collect())
        }
        StepToml::Parallel { parallel } => {
            Step::Parallel(parallel.into_iter().map(convert_step).collect())
        }
    }
}

/// Parse `path` and build a validated [`Pipeline`] (§10.3).
pub fn load(path: &Path) -> Result<Pipeline, RunbookError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| RunbookError::Io { path: path.to_path_buf(), source })?;
    let parsed: PipelineToml = toml::from_str(&content)
        .map_err(|source| RunbookError::Parse { path: path.to_path_buf(), source })?;

    let mut jobs = HashMap::with_capacity(parsed.jobs.len());
    for (name, job_toml) in parsed.jobs {
        let artifacts: Vec<ArtifactSpec> =
            job_toml.artifacts.into_iter().map(ArtifactSpecToml::into_spec).collect();
        let job = build_job(name.clone(), job_toml.description, job_toml.commands, artifacts);
        jobs.insert(name, job);
    }

    let mut executions = HashMap::with_capacity(parsed.executions.len());
    for (name, execution_toml) in parsed.executions {
        let steps = execution_toml.steps.into_iter().map(convert_step).collect();
        executions.insert(name.clone(), Execution { name, steps });
    }

    for execution in executions.values() {
        validate_steps(&execution.name, &execution.steps, &jobs, &executions)?;
    }

    tracing::info!(
        path = %path.display(),
        jobs = jobs.len(),
        executions = executions.len(),
        "loaded pipeline",
    );
    Ok(Pipeline { jobs, executions })
}

fn validate_steps(
    execution_name: &str,
    steps: &[Step],
    jobs: &HashMap<String, Job>,
    executions: &HashMap<String, Execution>,
) -> Result<(), RunbookError> {
    for step in steps {
        match step {
            Step::JobRef(name) => {
                if !jobs.contains_key(name) {
                    return Err(RunbookError::UnknownJob {
                        execution: execution_name.to_string(),
                        job: name.clone(),
                    });
                }
            }
            Step::ExecutionRef(name) => {
                if !executions.contains_key(name) {
                    return Err(RunbookError::UnknownExecution {
                        execution: execution_name.to_string(),
                        referenced: name.clone(),
                    });
                }
            }
            Step::Sequential(children) | Step::Parallel(children) => {
                validate_steps(execution_name, children, jobs, executions)?;
            }
        }
    }
    Ok(())
}

/// Build a job whose block runs `commands` in order against the job's
/// scope, stopping at the first non-zero exit, then registers `artifacts`
/// before returning.
fn build_job(
    name: String,
    description: Option<String>,
    commands: Vec<String>,
    artifacts: Vec<ArtifactSpec>,
) -> Job {
    let block: JobBlock = Arc::new(move |scope| {
        let commands = commands.clone();
        let artifacts = artifacts.clone();
        Box::pin(async move {
            for spec in artifacts {
                scope.artifacts(spec);
            }
            for command in &commands {
                let out = scope.run_shell(command, false).await?;
                if !out.success() {
                    return Err(scope.fail(format!(
                        "command `{command}` exited {}",
                        out.exit_code
                    )));
                }
            }
            Ok(())
        })
    });
    Job { name, description, block }
}
