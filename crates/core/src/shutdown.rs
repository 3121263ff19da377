// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide shutdown flag (§5, §9).
//!
//! Set once by the host-signal handler; read by the orchestrator between
//! steps and by the layer manager before create/destroy. Never cleared —
//! a run that has started shutting down never un-shuts-down.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Mark the process as shutting down. Idempotent.
pub fn request_shutdown() {
    SHUTTING_DOWN.store(true, Ordering::SeqCst);
}

/// Whether a shutdown has been requested.
pub fn is_shutting_down() -> bool {
    SHUTTING_DOWN.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn request_shutdown_sets_the_flag() {
        request_shutdown();
        assert!(is_shutting_down());
    }

    #[test]
    #[serial]
    fn request_shutdown_is_idempotent() {
        request_shutdown();
        request_shutdown();
        assert!(is_shutting_down());
    }
}
