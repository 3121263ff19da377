// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide secret registry backing the logger's masking pass (§4.7).
//!
//! Tools register secret substrings (a proxy password, a registry token)
//! before they could possibly appear in a log line; the registry is a
//! concurrent set so readers never block a writer and vice versa.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Placeholder a matched secret is replaced with.
pub const MASK: &str = "**secret**";

fn registry() -> &'static RwLock<HashSet<String>> {
    static REGISTRY: OnceLock<RwLock<HashSet<String>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashSet::new()))
}

/// Register a secret. Idempotent; registration must happen before any log
/// line containing the secret is emitted.
pub fn register(secret: impl Into<String>) {
    let secret = secret.into();
    if secret.is_empty() {
        return;
    }
    registry().write().insert(secret);
}

/// Replace every occurrence of every registered secret in `line` with [`MASK`].
///
/// Longer secrets are masked first so a shorter secret that happens to be a
/// substring of a longer one never partially unmasks it.
pub fn mask(line: &str) -> String {
    let guard = registry().read();
    if guard.is_empty() {
        return line.to_string();
    }
    let mut secrets: Vec<&str> = guard.iter().map(String::as_str).collect();
    secrets.sort_unstable_by_key(|s| std::cmp::Reverse(s.len()));

    let mut masked = line.to_string();
    for secret in secrets {
        if !masked.contains(secret) {
            continue;
        }
        masked = masked.replace(secret, MASK);
    }
    masked
}

/// Clear all registered secrets. Called on shutdown.
pub fn clear() {
    registry().write().clear();
}
