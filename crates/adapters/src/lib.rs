// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container driver (§4.2): one long-lived build container per pipeline
//! run, exposed as an [`oj_core::JobExecutor`] plus the tar-stream copy
//! operations the artifact collector and `copy_into`/`copy_out` tool helpers
//! need.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod driver;
mod tar_util;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use driver::{BindMount, ContainerDriver, ContainerState};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExecutor;
