// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tar archive helpers shared by `copy_into`/`copy_out`/`copy_artifacts`
//! (§4.2). Anti-traversal extraction is grounded on the overlay-mount
//! driver's own "stay under the destination" discipline seen in
//! `examples/other_examples/a366f338_nya3jp-cros-bazel__ebuild-private-cmd-run_in_container-src-main.rs.rs`,
//! applied here to tar extraction instead of bind mounts.

use oj_core::OjError;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Build a single-file tar archive (the format `bollard::upload_to_container`
/// expects) containing `name` with `bytes` as its content.
pub fn single_file_tar(name: &str, bytes: &[u8]) -> Result<Vec<u8>, OjError> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, name, bytes)
        .map_err(|err| OjError::ContainerError(format!("building tar for {name}: {err}")))?;
    builder
        .into_inner()
        .map_err(|err| OjError::ContainerError(format!("finalizing tar for {name}: {err}")))
}

/// Extract a tar archive's bytes into `host_dir`, rejecting any entry whose
/// canonicalized destination would escape `host_dir` (§4.2 `copy_out`, §8
/// artifact-boundary invariant).
pub fn extract_anti_traversal(archive_bytes: &[u8], host_dir: &Path) -> Result<Vec<PathBuf>, OjError> {
    std::fs::create_dir_all(host_dir)
        .map_err(|err| OjError::ContainerError(format!("creating {}: {err}", host_dir.display())))?;
    let canonical_root = std::fs::canonicalize(host_dir)
        .map_err(|err| OjError::ContainerError(format!("resolving {}: {err}", host_dir.display())))?;

    let mut archive = tar::Archive::new(archive_bytes);
    let mut written = Vec::new();
    for entry in archive
        .entries()
        .map_err(|err| OjError::ContainerError(format!("reading tar stream: {err}")))?
    {
        let mut entry =
            entry.map_err(|err| OjError::ContainerError(format!("reading tar entry: {err}")))?;
        let entry_path = entry
            .path()
            .map_err(|err| OjError::ContainerError(format!("reading tar entry path: {err}")))?
            .into_owned();

        let target = host_dir.join(&entry_path);
        let parent = target.parent().map(Path::to_path_buf).unwrap_or_else(|| host_dir.to_path_buf());
        std::fs::create_dir_all(&parent)
            .map_err(|err| OjError::ContainerError(format!("creating {}: {err}", parent.display())))?;

        // Canonicalize the *parent* (the entry itself doesn't exist yet);
        // this still catches every `../` traversal since any escape has to
        // leave the root via some ancestor directory.
        let canonical_parent = std::fs::canonicalize(&parent)
            .map_err(|err| OjError::ContainerError(format!("resolving {}: {err}", parent.display())))?;
        if !canonical_parent.starts_with(&canonical_root) {
            return Err(OjError::ContainerError(format!(
                "tar entry {} escapes host artifact dir {}",
                entry_path.display(),
                host_dir.display()
            )));
        }

        if entry.header().entry_type().is_dir() {
            continue;
        }

        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|err| OjError::ContainerError(format!("reading {}: {err}", entry_path.display())))?;
        std::fs::write(&target, &buf)
            .map_err(|err| OjError::ContainerError(format!("writing {}: {err}", target.display())))?;
        written.push(target);
    }
    Ok(written)
}
