// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`ArtifactMover`] for bare-host runs: the layer's merged dir is already a
//! host path, so "copying out" is a direct filesystem copy rather than a tar
//! stream.

use async_trait::async_trait;
use oj_core::{ArtifactMover, OjError};
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct HostMover;

#[async_trait]
impl ArtifactMover for HostMover {
    async fn copy_artifacts(
        &self,
        layer_work_dir: &str,
        relative_paths: &[String],
        host_dir: &str,
    ) -> Result<(), OjError> {
        tokio::fs::create_dir_all(host_dir)
            .await
            .map_err(|err| OjError::ContainerError(format!("creating {host_dir}: {err}")))?;
        let canonical_root = tokio::fs::canonicalize(host_dir)
            .await
            .map_err(|err| OjError::ContainerError(format!("resolving {host_dir}: {err}")))?;

        for rel in relative_paths {
            let source = Path::new(layer_work_dir).join(rel);
            let dest = Path::new(host_dir).join(rel);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| OjError::ContainerError(format!("creating {}: {err}", parent.display())))?;
                let canonical_parent = tokio::fs::canonicalize(parent)
                    .await
                    .map_err(|err| OjError::ContainerError(format!("resolving {}: {err}", parent.display())))?;
                if !canonical_parent.starts_with(&canonical_root) {
                    return Err(OjError::ContainerError(format!(
                        "artifact {rel} escapes host artifact dir {host_dir}"
                    )));
                }
            }
            tokio::fs::copy(&source, &dest)
                .await
                .map_err(|err| OjError::ContainerError(format!("copying {rel}: {err}")))?;
        }
        Ok(())
    }
}
