// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Layer` data model (§3). Construction, mounting, and teardown live in
//! `oj-engine`'s layer manager; this type is the inert record the orchestrator
//! threads through the step tree.

use crate::ids::LayerId;
use serde::{Deserialize, Serialize};

/// A mutable filesystem view: one overlay mount backing one job (or the
/// pipeline's root layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    /// Either the project workspace path or a parent layer's `merged_dir`.
    pub lower_dir: String,
    /// The overlay's writable diff directory.
    pub upper_dir: String,
    /// Overlay-internal scratch directory required by the overlay driver.
    pub work_dir: String,
    /// The visible union path — what jobs see as their working tree.
    pub merged_dir: String,
}

impl Layer {
    /// Standard per-layer directory layout under the container's overlay
    /// root (§6 "On-disk layout inside the container").
    pub fn paths_under(overlays_root: &str, id: LayerId) -> (String, String, String, String) {
        let base = format!("{overlays_root}/{id}");
        (
            format!("{base}/lower"), // unused for the root layer; see LayerManager::create
            format!("{base}/upper"),
            format!("{base}/work"),
            format!("{base}/merged"),
        )
    }
}
