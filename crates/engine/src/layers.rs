// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The layer manager (§4.3): stacked fuse-overlayfs views, one per job.
//!
//! Mount option construction follows the same `lowerdir=...,upperdir=...,
//! workdir=...` shape as
//! `examples/other_examples/a366f338_nya3jp-cros-bazel__ebuild-private-cmd-run_in_container-src-main.rs.rs`,
//! simplified to a single lower directory per layer: each layer's lower is
//! its parent's `merged` view, which already folds in every ancestor, so
//! the stack never needs more than one lower entry per mount. That file
//! mounts the **kernel** overlay driver via `nix::mount(Some("overlay"))`,
//! so it's grounding for the option string only — `create` below invokes
//! the `fuse-overlayfs` binary instead, matching the `/dev/fuse` +
//! `SYS_ADMIN` the container is actually provisioned with
//! (`oj-adapters::driver`) and letting `destroy`'s `fusermount -uz`
//! actually detach what `create` mounted.

use oj_core::{Layer, LayerId, OjError};
use std::collections::HashSet;
use std::sync::Arc;

use oj_core::JobExecutor;
use parking_lot::Mutex;

/// Where a new layer's lower directory comes from.
pub enum LayerParent<'a> {
    /// The pipeline's project workspace, for the run's root layer.
    Workspace(&'a str),
    /// An existing layer; its `merged_dir` becomes the new layer's lower.
    Layer(&'a Layer),
}

impl LayerParent<'_> {
    fn lower_dir(&self) -> &str {
        match self {
            LayerParent::Workspace(path) => path,
            LayerParent::Layer(layer) => &layer.merged_dir,
        }
    }
}

/// A diff result from walking one layer's upper directory (§4.3 `diff`).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LayerDiff {
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

/// Runs layer lifecycle operations as shell calls against the in-container
/// executor. The manager itself holds no filesystem state; the container
/// does.
pub struct LayerManager {
    executor: Arc<dyn JobExecutor>,
    overlays_root: String,
    live: Mutex<HashSet<LayerId>>,
}

impl LayerManager {
    pub fn new(executor: Arc<dyn JobExecutor>, overlays_root: impl Into<String>) -> Self {
        Self { executor, overlays_root: overlays_root.into(), live: Mutex::new(HashSet::new()) }
    }

    /// Allocates an id, creates `upper/work/merged`, and mounts the overlay.
    /// On mount failure the partially created directory tree is removed
    /// before returning `LayerError` (§4.3).
    pub async fn create(&self, parent: LayerParent<'_>) -> Result<Layer, OjError> {
        let id = LayerId::new();
        let (_, upper_dir, work_dir, merged_dir) = Layer::paths_under(&self.overlays_root, id);
        let lower_dir = parent.lower_dir().to_string();
        let layer_dir = format!("{}/{id}", self.overlays_root);

        let mkdir = format!("mkdir -p '{upper_dir}' '{work_dir}' '{merged_dir}'");
        let mkdir_out = self.shell(&mkdir).await?;
        if !mkdir_out.success() {
            return Err(OjError::LayerError(format!(
                "creating layer directories for {id}: {}",
                mkdir_out.stderr
            )));
        }

        let mount = format!(
            "fuse-overlayfs -o lowerdir='{lower_dir}',upperdir='{upper_dir}',workdir='{work_dir}' '{merged_dir}'"
        );
        let mount_out = self.shell(&mount).await?;
        if !mount_out.success() {
            let _ = self.shell(&format!("rm -rf '{layer_dir}'")).await;
            return Err(OjError::LayerError(format!("mounting layer {id}: {}", mount_out.stderr)));
        }

        self.live.lock().insert(id);
        Ok(Layer { id, lower_dir, upper_dir, work_dir, merged_dir })
    }

    pub fn work_dir(&self, layer: &Layer) -> String {
        layer.merged_dir.clone()
    }

    /// Lazy-unmounts then removes the layer directory. Idempotent and a
    /// no-op while a shutdown is in progress (§4.3, §5 cancellation).
    pub async fn destroy(&self, layer: &Layer) -> Result<(), OjError> {
        if oj_core::shutdown::is_shutting_down() {
            return Ok(());
        }
        let layer_dir = format!("{}/{}", self.overlays_root, layer.id);
        let _ = self.shell(&format!("fusermount -uz '{}' 2>/dev/null || true", layer.merged_dir)).await;
        let remove_out = self.shell(&format!("rm -rf '{layer_dir}'")).await?;
        if !remove_out.success() {
            return Err(OjError::LayerError(format!(
                "removing layer directory {layer_dir}: {}",
                remove_out.stderr
            )));
        }
        self.live.lock().remove(&layer.id);
        Ok(())
    }

    /// Walks `layer.upper_dir`, classifying each entry as a deletion
    /// (whiteout char-device 0:0, whiteout xattr on a zero-byte regular
    /// file, or an opaque-directory xattr) or a modification (§4.3).
    pub async fn diff(&self, layer: &Layer) -> Result<LayerDiff, OjError> {
        let out = self.shell(&classify_script(&layer.upper_dir)).await?;
        if !out.success() {
            return Err(OjError::LayerError(format!(
                "diffing layer {}: {}",
                layer.id, out.stderr
            )));
        }

        Ok(parse_classify_output(&out.stdout))
    }

    async fn shell(&self, command: &str) -> Result<oj_core::ExecOutput, OjError> {
        self.executor.exec_shell(command, "/", &std::collections::HashMap::new(), true).await
    }
}

/// A `find`-driven classifier: for each entry under `upper_dir`, print
/// `D <relative path>` for a whiteout/opaque marker or `M <relative path>`
/// for everything else.
fn classify_script(upper_dir: &str) -> String {
    format!(
        r#"cd '{upper_dir}' && find . -mindepth 1 -print0 | while IFS= read -r -d '' p; do
  rel="${{p#./}}"
  if [ -c "$p" ]; then
    dev=$(stat -c '%t:%T' "$p" 2>/dev/null)
    if [ "$dev" = "0:0" ]; then echo "D $rel"; continue; fi
  fi
  if [ -f "$p" ] && [ ! -s "$p" ] && getfattr -n trusted.overlay.whiteout --only-values "$p" >/dev/null 2>&1; then
    echo "D $rel"; continue
  fi
  if [ -d "$p" ]; then
    opaque=$(getfattr -n trusted.overlay.opaque --only-values "$p" 2>/dev/null)
    if [ "$opaque" = "y" ]; then echo "D $rel"; continue; fi
  fi
  echo "M $rel"
done"#
    )
}

/// Turns `classify_script`'s `D <path>`/`M <path>` line stream into a
/// [`LayerDiff`], sorted and deduplicated so reconciliation order is
/// deterministic regardless of the shell's directory-walk order.
fn parse_classify_output(stdout: &str) -> LayerDiff {
    let mut modified = Vec::new();
    let mut deleted = Vec::new();
    for line in stdout.lines() {
        let Some((tag, rel)) = line.split_once(' ') else { continue };
        match tag {
            "D" => deleted.push(rel.to_string()),
            "M" => modified.push(rel.to_string()),
            _ => {}
        }
    }
    modified.sort();
    modified.dedup();
    deleted.sort();
    deleted.dedup();
    LayerDiff { modified, deleted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_adapters::FakeExecutor;

    fn manager(fake: Arc<FakeExecutor>) -> LayerManager {
        LayerManager::new(fake, "/kannich/overlays")
    }

    #[tokio::test]
    async fn create_mounts_against_the_workspace_for_a_root_layer() {
        let fake = Arc::new(FakeExecutor::new());
        fake.push_success(""); // mkdir
        fake.push_success(""); // mount
        let mgr = manager(fake.clone());

        let layer = mgr.create(LayerParent::Workspace("/workspace")).await.unwrap();
        assert_eq!(layer.lower_dir, "/workspace");
        assert!(layer.merged_dir.starts_with("/kannich/overlays/"));

        let calls = fake.calls();
        assert!(calls[1].argv.join(" ").contains("lowerdir='/workspace'"));
    }

    #[tokio::test]
    async fn create_chains_lower_dir_from_parent_merged() {
        let fake = Arc::new(FakeExecutor::new());
        fake.push_success("");
        fake.push_success("");
        let mgr = manager(fake.clone());

        let parent = Layer {
            id: oj_core::LayerId::new(),
            lower_dir: "/workspace".to_string(),
            upper_dir: "/kannich/overlays/p/upper".to_string(),
            work_dir: "/kannich/overlays/p/work".to_string(),
            merged_dir: "/kannich/overlays/p/merged".to_string(),
        };
        let child = mgr.create(LayerParent::Layer(&parent)).await.unwrap();
        assert_eq!(child.lower_dir, parent.merged_dir);
    }

    #[tokio::test]
    async fn create_removes_partial_tree_on_mount_failure() {
        let fake = Arc::new(FakeExecutor::new());
        fake.push_success(""); // mkdir
        fake.push_failure(1, "mount: overlay: permission denied"); // mount fails
        fake.push_success(""); // rm -rf cleanup
        let mgr = manager(fake.clone());

        let result = mgr.create(LayerParent::Workspace("/workspace")).await;
        assert!(matches!(result, Err(OjError::LayerError(_))));

        let calls = fake.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].argv.join(" ").contains("rm -rf"));
    }

    // The shutdown no-op path flips a process-wide, never-cleared flag
    // (`oj_core::shutdown`), so it is exercised at the CLI integration
    // level instead, where each scenario gets its own process.

    #[tokio::test]
    async fn diff_classifies_whiteouts_opaque_dirs_and_modifications() {
        let fake = Arc::new(FakeExecutor::new());
        fake.push_success("D removed.txt\nM changed.txt\nD stale_dir\n");
        let mgr = manager(fake.clone());

        let layer = Layer {
            id: oj_core::LayerId::new(),
            lower_dir: "/workspace".to_string(),
            upper_dir: "/kannich/overlays/y/upper".to_string(),
            work_dir: "/kannich/overlays/y/work".to_string(),
            merged_dir: "/kannich/overlays/y/merged".to_string(),
        };
        let diff = mgr.diff(&layer).await.unwrap();
        assert_eq!(diff.modified, vec!["changed.txt".to_string()]);
        assert_eq!(diff.deleted, vec!["removed.txt".to_string(), "stale_dir".to_string()]);
    }
}

#[cfg(test)]
mod diff_proptests {
    use super::*;
    use proptest::prelude::*;

    fn rel_path() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_]{1,8}(/[a-zA-Z0-9_]{1,8}){0,2}"
    }

    fn tagged_line() -> impl Strategy<Value = (bool, String)> {
        (proptest::bool::ANY, rel_path())
    }

    proptest! {
        #[test]
        fn output_is_always_sorted_and_deduplicated(lines in proptest::collection::vec(tagged_line(), 0..20)) {
            let stdout: String = lines
                .iter()
                .map(|(deleted, rel)| format!("{} {rel}\n", if *deleted { "D" } else { "M" }))
                .collect();
            let diff = parse_classify_output(&stdout);

            let mut sorted_modified = diff.modified.clone();
            sorted_modified.sort();
            sorted_modified.dedup();
            prop_assert_eq!(&diff.modified, &sorted_modified);

            let mut sorted_deleted = diff.deleted.clone();
            sorted_deleted.sort();
            sorted_deleted.dedup();
            prop_assert_eq!(&diff.deleted, &sorted_deleted);
        }

        #[test]
        fn every_path_lands_in_exactly_the_set_its_tag_names(lines in proptest::collection::vec(tagged_line(), 0..20)) {
            let stdout: String = lines
                .iter()
                .map(|(deleted, rel)| format!("{} {rel}\n", if *deleted { "D" } else { "M" }))
                .collect();
            let diff = parse_classify_output(&stdout);

            for (deleted, rel) in &lines {
                if *deleted {
                    prop_assert!(diff.deleted.contains(rel));
                } else {
                    prop_assert!(diff.modified.contains(rel));
                }
            }
        }

        #[test]
        fn unrecognized_tags_are_silently_ignored(rel in rel_path()) {
            let diff = parse_classify_output(&format!("X {rel}\n"));
            prop_assert!(diff.modified.is_empty());
            prop_assert!(diff.deleted.is_empty());
        }
    }
}
