//! Reconciliation engine.
//!
//! Usage goes in, patches come out: [`generate`] compares observed imports
//! with the declared dependency tables, [`resolve`] attaches versions and
//! enablement, [`merge`] folds children's patches for the root, and
//! [`apply`] is the one place a manifest is mutated.

pub mod apply;
pub mod errors;
pub mod events;
pub mod generate;
pub mod merge;
pub mod resolve;

pub use apply::{apply, apply_all, Outcome};
pub use errors::{MergeError, ReconcileError};
pub use events::{Event, EventLog, Reporter};
pub use generate::{generate, generate_against, DevConflict, Generated};
pub use merge::{merge_pair, merge_patches, version_conflicts, VersionConflict};
pub use resolve::ResolveContext;
