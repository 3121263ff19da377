// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container driver (§4.2).
//!
//! Lifecycle (pull/create/start/inspect/remove) is grounded on
//! `examples/mcginleyr1-buildit/crates/buildit-executor/src/docker.rs`'s
//! `LocalDockerExecutor`. The `exec` streaming pattern (`create_exec` +
//! `start_exec`, draining the attached `LogOutput` stream, then
//! `inspect_exec` for the exit code) is grounded on
//! `examples/other_examples/6e7f3f62_pantsbuild-pants__src-rust-engine-process_execution-docker-src-docker.rs.rs`'s
//! `Command`.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{DeviceMapping, HostConfig};
use bollard::Docker;
use futures_util::StreamExt;
use oj_core::{ArtifactMover, ExecOutput, JobExecutor, OjError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

/// One-way lifecycle states (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Uninitialized,
    Ready,
    Closed,
}

/// A host path bound into the container at a fixed mount point.
#[derive(Debug, Clone)]
pub struct BindMount {
    pub host_path: String,
    pub container_path: String,
    pub read_only: bool,
}

impl BindMount {
    pub fn to_bind_string(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.host_path, self.container_path)
        } else {
            format!("{}:{}", self.host_path, self.container_path)
        }
    }
}

/// Manages one long-lived build container for the duration of a pipeline
/// run (§4.2).
pub struct ContainerDriver {
    docker: Docker,
    state: Mutex<ContainerState>,
    container_id: Mutex<Option<String>>,
}

impl ContainerDriver {
    pub fn connect() -> Result<Self, OjError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|err| OjError::ContainerError(format!("connecting to docker: {err}")))?;
        Ok(Self {
            docker,
            state: Mutex::new(ContainerState::Uninitialized),
            container_id: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ContainerState {
        *self.state.lock()
    }

    /// Pull the builder image if absent, create an privileged-enough-for-
    /// fuse-overlayfs container, start it with a no-op long-running
    /// process, then probe both binds. Fails fatally with `MountError` on
    /// either probe (§4.2).
    pub async fn initialize(
        &self,
        builder_image: &str,
        project_bind: &BindMount,
        cache_bind: &BindMount,
        socket_bind: Option<&BindMount>,
    ) -> Result<(), OjError> {
        self.ensure_image_present(builder_image).await?;

        let mut binds = vec![project_bind.to_bind_string(), cache_bind.to_bind_string()];
        if let Some(socket) = socket_bind {
            binds.push(socket.to_bind_string());
        }

        let host_config = HostConfig {
            binds: Some(binds),
            cap_add: Some(vec!["SYS_ADMIN".to_string()]),
            devices: Some(vec![DeviceMapping {
                path_on_host: Some("/dev/fuse".to_string()),
                path_in_container: Some("/dev/fuse".to_string()),
                cgroup_permissions: Some("rwm".to_string()),
            }]),
            ..Default::default()
        };

        let config = Config {
            image: Some(builder_image.to_string()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            host_config: Some(host_config),
            ..Default::default()
        };

        let name = format!("oj-run-{}", uuid::Uuid::new_v4());
        let created = self
            .docker
            .create_container(Some(CreateContainerOptions { name: name.clone(), platform: None }), config)
            .await
            .map_err(|err| OjError::ContainerError(format!("creating container: {err}")))?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|err| OjError::ContainerError(format!("starting container: {err}")))?;

        *self.container_id.lock() = Some(created.id);
        *self.state.lock() = ContainerState::Ready;

        self.probe_mount(&project_bind.container_path).await?;
        self.probe_cache(&cache_bind.container_path).await?;

        Ok(())
    }

    async fn ensure_image_present(&self, image: &str) -> Result<(), OjError> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }
        let options = CreateImageOptions { from_image: image, ..Default::default() };
        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(|err| OjError::ContainerError(format!("pulling {image}: {err}")))?;
        }
        Ok(())
    }

    async fn probe_mount(&self, project_path: &str) -> Result<(), OjError> {
        let argv = vec!["test".to_string(), "-d".to_string(), project_path.to_string()];
        let out = self.exec(&argv, "/", &HashMap::new(), true).await?;
        if !out.success() {
            return Err(OjError::MountError(format!("project bind not mounted at {project_path}")));
        }
        Ok(())
    }

    async fn probe_cache(&self, cache_path: &str) -> Result<(), OjError> {
        let probe_file = format!("{cache_path}/.oj-mount-probe");
        let command = format!("touch {probe_file} && rm -f {probe_file}");
        let out = self.exec_shell_raw(&command).await?;
        if !out.success() {
            return Err(OjError::MountError(format!("cache bind not writable at {cache_path}")));
        }
        Ok(())
    }

    async fn exec_shell_raw(&self, command: &str) -> Result<ExecOutput, OjError> {
        let argv = vec!["sh".to_string(), "-c".to_string(), command.to_string()];
        self.exec(&argv, "/", &HashMap::new(), true).await
    }

    fn container_id(&self) -> Result<String, OjError> {
        self.container_id
            .lock()
            .clone()
            .ok_or_else(|| OjError::ContainerError("container not initialized".to_string()))
    }

    /// Write `bytes` to `path` inside the container. The driver stages the
    /// blob under `/tmp` (a location the upload API can always reach, even
    /// when `path` is under an overlay mount) and `mv`s it into place via
    /// exec, concatenating with the existing content first when
    /// `append` (§4.2 `copy_into`).
    pub async fn copy_into(&self, path: &str, bytes: &[u8], append: bool) -> Result<(), OjError> {
        let container_id = self.container_id()?;
        let scratch_name = format!("oj-stage-{}", uuid::Uuid::new_v4());
        let scratch_path = format!("/tmp/{scratch_name}");

        let payload = if append {
            let existing = self.exec_shell_raw(&format!("cat {path} 2>/dev/null || true")).await?;
            let mut combined = existing.stdout.into_bytes();
            combined.extend_from_slice(bytes);
            combined
        } else {
            bytes.to_vec()
        };

        let tar_bytes = crate::tar_util::single_file_tar(&scratch_name, &payload)?;
        self.docker
            .upload_to_container(
                &container_id,
                Some(bollard::container::UploadToContainerOptions {
                    path: "/tmp".to_string(),
                    ..Default::default()
                }),
                tar_bytes.into(),
            )
            .await
            .map_err(|err| OjError::ContainerError(format!("uploading to {scratch_path}: {err}")))?;

        let mkdir_and_move = format!("mkdir -p \"$(dirname {path})\" && mv {scratch_path} {path}");
        let out = self.exec_shell_raw(&mkdir_and_move).await?;
        if !out.success() {
            return Err(OjError::ContainerError(format!(
                "moving staged content into {path}: {}",
                out.stderr
            )));
        }
        Ok(())
    }

    /// Verify `path` exists (avoiding a tar-stream deadlock on a missing
    /// path), stream it out as a tar archive, and extract with anti-
    /// traversal checks (§4.2 `copy_out`).
    pub async fn copy_out(&self, path: &str, host_dir: &Path) -> Result<(), OjError> {
        let container_id = self.container_id()?;
        let exists = self.exec_shell_raw(&format!("test -e {path}")).await?;
        if !exists.success() {
            return Err(OjError::ContainerError(format!("{path} does not exist in container")));
        }

        let mut stream = self.docker.download_from_container(
            &container_id,
            Some(bollard::container::DownloadFromContainerOptions { path: path.to_string() }),
        );
        let mut archive_bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|err| OjError::ContainerError(format!("downloading {path}: {err}")))?;
            archive_bytes.extend_from_slice(&chunk);
        }

        crate::tar_util::extract_anti_traversal(&archive_bytes, host_dir)?;
        Ok(())
    }

    /// Bulk variant: stage hard links (copies if hard-linking fails, e.g.
    /// across overlay layer boundaries) mirroring each relative path, tar
    /// the staging tree out, extract to `host_dir`, then remove the
    /// staging tree (§4.2 `copy_artifacts`).
    pub async fn copy_artifacts(
        &self,
        layer_work_dir: &str,
        relative_paths: &[String],
        host_dir: &Path,
    ) -> Result<(), OjError> {
        if relative_paths.is_empty() {
            return Ok(());
        }
        let staging = format!("/tmp/oj-artifacts-{}", uuid::Uuid::new_v4());
        let mut script = format!("set -e\nmkdir -p {staging}\n");
        for rel in relative_paths {
            script.push_str(&format!(
                "mkdir -p \"{staging}/$(dirname '{rel}')\"\n\
                 ln '{layer_work_dir}/{rel}' '{staging}/{rel}' 2>/dev/null || cp '{layer_work_dir}/{rel}' '{staging}/{rel}'\n",
            ));
        }
        let out = self.exec_shell_raw(&script).await?;
        if !out.success() {
            return Err(OjError::ContainerError(format!("staging artifacts failed: {}", out.stderr)));
        }

        let result = self.copy_out(&staging, host_dir).await;

        let _ = self.exec_shell_raw(&format!("rm -rf {staging}")).await;
        result
    }

    /// Release the container. Idempotent; may be reached via normal return,
    /// error, or the host-signal shutdown hook (§4.2).
    pub async fn close(&self) -> Result<(), OjError> {
        let mut state = self.state.lock();
        if *state == ContainerState::Closed {
            return Ok(());
        }
        *state = ContainerState::Closed;
        drop(state);

        let Some(container_id) = self.container_id.lock().take() else {
            return Ok(());
        };
        let _ = self
            .docker
            .remove_container(
                &container_id,
                Some(RemoveContainerOptions { force: true, ..Default::default() }),
            )
            .await;
        Ok(())
    }
}

#[async_trait]
impl JobExecutor for ContainerDriver {
    async fn exec(
        &self,
        argv: &[String],
        cwd: &str,
        env: &HashMap<String, String>,
        silent: bool,
    ) -> Result<ExecOutput, OjError> {
        if self.state() != ContainerState::Ready {
            return Err(OjError::ContainerError("exec called before container is Ready".to_string()));
        }
        let container_id = self.container_id()?;
        let env_vec: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let exec = self
            .docker
            .create_exec(
                &container_id,
                CreateExecOptions {
                    cmd: Some(argv.to_vec()),
                    env: Some(env_vec),
                    working_dir: Some(cwd.to_string()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| OjError::SpawnError(format!("{}: {err}", argv.join(" "))))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|err| OjError::SpawnError(format!("{}: {err}", argv.join(" "))))?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(message) = output.next().await {
                    let message = message
                        .map_err(|err| OjError::ContainerError(format!("reading exec output: {err}")))?;
                    match message {
                        bollard::container::LogOutput::StdOut { message } => {
                            let line = String::from_utf8_lossy(&message);
                            log_line(false, silent, &line);
                            stdout.push_str(&line);
                        }
                        bollard::container::LogOutput::StdErr { message } => {
                            let line = String::from_utf8_lossy(&message);
                            log_line(true, silent, &line);
                            stderr.push_str(&line);
                        }
                        _ => {}
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let inspected = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|err| OjError::ContainerError(format!("inspecting exec result: {err}")))?;
        let exit_code = inspected.exit_code.unwrap_or(-1) as i32;

        Ok(ExecOutput { stdout, stderr, exit_code })
    }
}

#[async_trait]
impl ArtifactMover for ContainerDriver {
    async fn copy_artifacts(
        &self,
        layer_work_dir: &str,
        relative_paths: &[String],
        host_dir: &str,
    ) -> Result<(), OjError> {
        ContainerDriver::copy_artifacts(self, layer_work_dir, relative_paths, Path::new(host_dir)).await
    }
}

fn log_line(is_stderr: bool, silent: bool, line: &str) {
    let masked = oj_core::secrets::mask(line.trim_end_matches('\n'));
    match (is_stderr, silent) {
        (_, true) => tracing::debug!(target: "oj::container::exec", "{masked}"),
        (false, false) => tracing::info!(target: "oj::container::exec", "{masked}"),
        (true, false) => tracing::error!(target: "oj::container::exec", "{masked}"),
    }
}
