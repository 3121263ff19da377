// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seam for bulk artifact copy-out (§4.2 `copy_artifacts`, §4.6).
//!
//! Complements [`crate::JobExecutor`]: `exec` runs commands inside whatever
//! filesystem namespace the job sees; `ArtifactMover` is the one operation
//! that has to cross back out to the host. `oj-adapters`'s container driver
//! implements it via a tar stream; `oj-shell`'s bare-host executor
//! implements it as a direct filesystem copy, since there the layer's merged
//! dir already *is* a host path.

use crate::OjError;
use async_trait::async_trait;

#[async_trait]
pub trait ArtifactMover: Send + Sync {
    /// Copy each of `relative_paths` (relative to `layer_work_dir`) into the
    /// matching relative location under `host_dir`, creating intermediate
    /// directories as needed.
    async fn copy_artifacts(
        &self,
        layer_work_dir: &str,
        relative_paths: &[String],
        host_dir: &str,
    ) -> Result<(), OjError>;
}
