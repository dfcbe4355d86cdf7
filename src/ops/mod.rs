//! High-level operations.
//!
//! This module contains the implementation of purser commands.

pub mod purser_link;
pub mod purser_update;
pub mod scan;

pub use purser_link::{link, Link, LinkOptions};
pub use purser_update::{
    update, update_packages, update_self, ManifestReport, UpdateOptions, UpdateReport,
};
pub use scan::{scan_package, scan_workspace, ScanSettings, WorkspaceUsage};
