//! Core data structures.
//!
//! - Manifests and their `purser` configuration block
//! - Packages and the workspace graph
//! - Import usage and exclusion sets
//! - Patches

pub mod builtins;
pub mod manifest;
pub mod package;
pub mod patch;
pub mod usage;
pub mod workspace;

pub use manifest::{DependencyKind, Manifest, ManifestError, PackageConfig, MANIFEST_NAME};
pub use package::Package;
pub use patch::{Patch, PatchKind, Source};
pub use usage::{DependencyUsage, ExcludeSet};
pub use workspace::WorkspaceGraph;
