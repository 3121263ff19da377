// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bare-host process runner implementing [`oj_core::JobExecutor`].
//!
//! Grounded on this workspace's own `tokio::process::Command` usage
//! elsewhere (git worktree creation): spawn with piped stdio, drain both
//! streams concurrently, then wait.

use async_trait::async_trait;
use oj_core::{ExecOutput, JobExecutor, OjError};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Runs commands directly on the host the executor process itself runs on.
/// Used by tests and by any future non-containerized mode; production runs
/// use `oj-adapters`'s in-container executor instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostExecutor;

#[async_trait]
impl JobExecutor for HostExecutor {
    async fn exec(
        &self,
        argv: &[String],
        cwd: &str,
        env: &HashMap<String, String>,
        silent: bool,
    ) -> Result<ExecOutput, OjError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| OjError::SpawnError("empty argv".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|err| OjError::SpawnError(format!("{program}: {err}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OjError::SpawnError("no stdout pipe".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OjError::SpawnError("no stderr pipe".to_string()))?;

        let stdout_task = tokio::spawn(pump_lines(stdout, Stream::Stdout, silent));
        let stderr_task = tokio::spawn(pump_lines(stderr, Stream::Stderr, silent));

        let (stdout, stderr) = tokio::join!(stdout_task, stderr_task);
        let stdout = stdout.unwrap_or_default();
        let stderr = stderr.unwrap_or_default();

        let status = child
            .wait()
            .await
            .map_err(|err| OjError::SpawnError(format!("{program}: {err}")))?;

        Ok(ExecOutput { stdout, stderr, exit_code: status.code().unwrap_or(-1) })
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

async fn pump_lines(
    reader: impl tokio::io::AsyncRead + Unpin,
    stream: Stream,
    silent: bool,
) -> String {
    let mut collected = String::new();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        log_line(stream, silent, &line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

fn log_line(stream: Stream, silent: bool, line: &str) {
    let line = oj_core::secrets::mask(line);
    match (stream, silent) {
        (_, true) => tracing::debug!(target: "oj::exec", "{line}"),
        (Stream::Stdout, false) => tracing::info!(target: "oj::exec", "{line}"),
        (Stream::Stderr, false) => tracing::error!(target: "oj::exec", "{line}"),
    }
}
