// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `oj` argument surface (§6), built with the same `clap` derive style
//! the corpus uses throughout `crates/cli/src/commands`.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oj", version, about = "Run a CI pipeline execution in an isolated build container")]
pub struct Cli {
    /// Name of the execution to run; required unless `--list`.
    pub execution: Option<String>,

    /// Path to the pipeline definition file.
    #[arg(short = 'f', long = "file", default_value = "pipeline.toml")]
    pub file: PathBuf,

    /// Enable debug logging.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Inject an additional environment entry, `KEY=VALUE`. Repeatable.
    #[arg(short = 'e', value_name = "KEY=VALUE", value_parser = parse_env_entry)]
    pub env: Vec<(String, String)>,

    /// Use the host-provided dependency cache instead of the pipeline-managed one.
    #[arg(short = 'd', long = "dev-mode")]
    pub dev_mode: bool,

    /// Print the pipeline's executions and jobs, then exit without running anything.
    #[arg(short = 'l', long = "list")]
    pub list: bool,
}

fn parse_env_entry(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}
