// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The host wrapper's environment contract (§6).
//!
//! The wrapper that invokes `oj` writes a `\0`-separated `KEY=VALUE` dump at
//! a well-known path and, optionally, an allowlist file naming which prefixes
//! to keep. This module reads both exactly once and never again: the dump
//! file is deleted immediately after a successful read so a secret it
//! carried doesn't linger on disk for the rest of the run.

use std::collections::HashMap;
use std::path::Path;

/// Prefixes kept when no allowlist file is present, or when an allowlist
/// file contains the `!defaults` sentinel line (§6).
pub const DEFAULT_PREFIXES: &[&str] =
    &["CI_", "GITHUB_", "BUILD_", "CIRCLE_", "TRAVIS_", "BITBUCKET_", "KANNICH_"];

const DEFAULTS_SENTINEL: &str = "!defaults";

/// Parse a `\0`-separated `KEY=VALUE` dump, ignoring any entry missing `=`.
fn parse_dump(raw: &str) -> HashMap<String, String> {
    raw.split('\0')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| entry.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One prefix per line; blank lines and `#`-led comments are ignored so the
/// file can be hand-edited.
fn parse_allowlist(raw: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == DEFAULTS_SENTINEL {
            prefixes.extend(DEFAULT_PREFIXES.iter().map(|p| p.to_string()));
        } else {
            prefixes.push(line.to_string());
        }
    }
    prefixes
}

fn effective_prefixes(allowlist_path: &Path) -> Vec<String> {
    match std::fs::read_to_string(allowlist_path) {
        Ok(raw) => parse_allowlist(&raw),
        Err(_) => DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
    }
}

fn retain_allowed(env: HashMap<String, String>, prefixes: &[String]) -> HashMap<String, String> {
    env.into_iter()
        .filter(|(key, _)| prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())))
        .collect()
}

/// Read `dump_path`, filter by `allowlist_path`'s prefixes (or the defaults
/// when that file is absent), then delete `dump_path` (§6).
///
/// Returns an empty map, without error, when `dump_path` itself doesn't
/// exist — not every invocation runs under a wrapper that populates one.
pub fn read(dump_path: &Path, allowlist_path: &Path) -> std::io::Result<HashMap<String, String>> {
    let raw = match std::fs::read_to_string(dump_path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(err) => return Err(err),
    };
    let env = parse_dump(&raw);
    let prefixes = effective_prefixes(allowlist_path);
    std::fs::remove_file(dump_path)?;
    Ok(retain_allowed(env, &prefixes))
}
