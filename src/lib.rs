//! purser - keeps a multi-package workspace's `package.json` files in sync
//! with the code that uses them.
//!
//! This crate provides the reconciliation engine behind the `purser` CLI:
//! import extraction, patch generation and resolution, merging and
//! application.

pub mod core;
pub mod extract;
pub mod ops;
pub mod reconcile;
pub mod util;

/// Test utilities for purser unit tests.
///
/// This module is only available when compiling tests. It builds throwaway
/// workspaces on disk.
#[cfg(test)]
pub mod test_support;

pub use core::{manifest::Manifest, package::Package, patch::Patch, workspace::WorkspaceGraph};
pub use reconcile::{Event, Reporter};
pub use util::context::GlobalContext;
