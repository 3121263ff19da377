// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A fake [`JobExecutor`] for other crates' tests (`test-support` feature).
//! Records every invocation and returns scripted results, so `oj-engine`
//! can exercise the orchestrator and job lifecycle without a container.

use async_trait::async_trait;
use oj_core::{ExecOutput, JobExecutor, OjError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct RecordedExec {
    pub argv: Vec<String>,
    pub cwd: String,
    pub env: HashMap<String, String>,
}

/// Scripted responses are consumed in call order; once exhausted, every
/// further call succeeds with empty output.
#[derive(Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<RecordedExec>>,
    scripted: Mutex<VecDeque<Result<ExecOutput, String>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `exec` call's result. Results are consumed FIFO.
    pub fn push_result(&self, result: Result<ExecOutput, String>) {
        self.scripted.lock().push_back(result);
    }

    pub fn push_success(&self, stdout: impl Into<String>) {
        self.push_result(Ok(ExecOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }));
    }

    pub fn push_failure(&self, exit_code: i32, stderr: impl Into<String>) {
        self.push_result(Ok(ExecOutput {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }));
    }

    pub fn calls(&self) -> Vec<RecordedExec> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl JobExecutor for FakeExecutor {
    async fn exec(
        &self,
        argv: &[String],
        cwd: &str,
        env: &HashMap<String, String>,
        _silent: bool,
    ) -> Result<ExecOutput, OjError> {
        self.calls.lock().push(RecordedExec {
            argv: argv.to_vec(),
            cwd: cwd.to_string(),
            env: env.clone(),
        });

        let scripted = self.scripted.lock().pop_front();
        match scripted {
            Some(Ok(out)) => Ok(out),
            Some(Err(message)) => Err(OjError::SpawnError(message)),
            None => Ok(ExecOutput::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[tokio::test]
    async fn records_every_call_in_order() {
        let fake = FakeExecutor::new();
        fake.exec(&["a".to_string()], "/x", &env(), false).await.unwrap();
        fake.exec(&["b".to_string()], "/y", &env(), false).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].argv, vec!["a".to_string()]);
        assert_eq!(calls[1].cwd, "/y");
    }

    #[tokio::test]
    async fn defaults_to_success_when_nothing_scripted() {
        let fake = FakeExecutor::new();
        let out = fake.exec(&["noop".to_string()], "/", &env(), false).await.unwrap();
        assert!(out.success());
    }

    #[tokio::test]
    async fn scripted_results_are_consumed_fifo() {
        let fake = FakeExecutor::new();
        fake.push_success("first");
        fake.push_failure(1, "boom");

        let first = fake.exec(&["cmd".to_string()], "/", &env(), false).await.unwrap();
        assert_eq!(first.stdout, "first");

        let second = fake.exec(&["cmd".to_string()], "/", &env(), false).await.unwrap();
        assert_eq!(second.exit_code, 1);
        assert_eq!(second.stderr, "boom");
    }
}
