// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared `run(argv, cwd, env, silent)` contract (§4.1, §4.2).
//!
//! `oj-shell` implements this trait for bare-host process execution and
//! `oj-adapters` implements it for in-container execution. `oj-core::scope`
//! only depends on the trait, not on either concrete implementation, so the
//! job scope works identically whether a block runs on the host (tests) or
//! inside the build container (production).

use crate::error::OjError;
use async_trait::async_trait;
use std::collections::HashMap;

/// The result of running a command to completion. Non-zero exit is not an
/// error — only a failed *spawn* is (§4.1).
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Implemented by whatever actually launches processes: the bare process
/// runner (§4.1) or the container driver's in-container `exec` (§4.2).
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn exec(
        &self,
        argv: &[String],
        cwd: &str,
        env: &HashMap<String, String>,
        silent: bool,
    ) -> Result<ExecOutput, OjError>;

    /// Shell variant wrapping `argv = [shell, "-c", command]` (§4.1).
    async fn exec_shell(
        &self,
        command: &str,
        cwd: &str,
        env: &HashMap<String, String>,
        silent: bool,
    ) -> Result<ExecOutput, OjError> {
        let shell = env
            .get("SHELL")
            .cloned()
            .unwrap_or_else(|| "/bin/sh".to_string());
        let argv = vec![shell, "-c".to_string(), command.to_string()];
        self.exec(&argv, cwd, env, silent).await
    }
}
