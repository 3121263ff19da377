// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for the black-box `oj` specs (§10.5): a throwaway
//! project directory plus a thin wrapper over `assert_cmd` driving the
//! built `oj` binary against it.

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use std::path::{Path, PathBuf};

/// A throwaway project directory the CLI runs against.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// A project with no pipeline file at all.
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("create temp project dir") }
    }

    /// A project whose default pipeline file (`pipeline.toml`) already has
    /// `contents`.
    pub fn with_pipeline(contents: &str) -> Self {
        let project = Self::empty();
        project.file("pipeline.toml", contents);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative_path`, creating parent directories as
    /// needed. Returns `&self` so calls can chain.
    pub fn file(&self, relative_path: &str, contents: &str) -> &Self {
        let path = self.dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directories");
        }
        std::fs::write(&path, contents).expect("write project file");
        self
    }

    pub fn read(&self, relative_path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative_path))
            .unwrap_or_else(|err| panic!("reading {relative_path}: {err}"))
    }

    pub fn exists(&self, relative_path: &str) -> bool {
        self.dir.path().join(relative_path).exists()
    }

    /// Start building an invocation of the built `oj` binary with this
    /// project directory as its cwd.
    pub fn oj(&self) -> Invocation {
        let mut cmd = Command::cargo_bin("oj").expect("locate built oj binary");
        cmd.current_dir(self.dir.path());
        Invocation { cmd }
    }
}

/// A builder for one `oj` invocation, mirroring `assert_cmd`'s own
/// builder style but returning [`Outcome`] from `passes`/`fails` so specs
/// read as a single chained expression.
pub struct Invocation {
    cmd: Command,
}

impl Invocation {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Outcome {
        Outcome { assert: self.cmd.assert().success() }
    }

    pub fn fails(mut self) -> Outcome {
        Outcome { assert: self.cmd.assert().failure() }
    }
}

/// A finished, already-asserted invocation: only output inspection is left.
pub struct Outcome {
    assert: Assert,
}

impl Outcome {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.assert.get_output().stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.assert.get_output().stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let out = self.stdout();
        assert!(out.contains(needle), "expected stdout to contain {needle:?}, got:\n{out}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let err = self.stderr();
        assert!(err.contains(needle), "expected stderr to contain {needle:?}, got:\n{err}");
        self
    }
}

/// Whether a real Docker daemon looks reachable, so end-to-end specs can
/// skip themselves with a clear message instead of failing on every
/// container-less CI runner (corpus-wide `#[ignore]` convention, §10.5).
pub fn docker_available() -> bool {
    Command::new("docker").arg("info").output().map(|out| out.status.success()).unwrap_or(false)
}

pub fn artifact_path(project: &Project, relative: &str) -> PathBuf {
    project.path().join(".oj/artifacts").join(relative)
}
