//! Patch merger: fold patches from several packages into one per dependency.
//!
//! Used by the self-update pass, where the root manifest receives patches
//! generated for itself and for every child.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::patch::{DependencyChange, Patch, PatchKind, Removal};
use crate::reconcile::errors::MergeError;

/// Precedence of a dependency patch kind when merging.
fn rank(kind: PatchKind) -> u8 {
    match kind {
        PatchKind::Update => 3,
        PatchKind::Add => 2,
        PatchKind::Remove => 1,
        PatchKind::Inherit => 0,
    }
}

/// Merge two dependency patches targeting the same name.
///
/// Value and source come from `a` when set, else `b`. The result is dev
/// only if both are, carries both file lists, and takes the stronger kind
/// (`Update > Add > Remove`). Only a merged Remove can be disabled.
pub fn merge_pair(a: &Patch, b: &Patch) -> Result<Patch, MergeError> {
    for patch in [a, b] {
        if patch.kind() == PatchKind::Inherit {
            return Err(MergeError::NotMergeable {
                name: patch.name().to_string(),
                kind: patch.kind(),
            });
        }
    }
    if a.name() != b.name() {
        return Err(MergeError::NameMismatch {
            left: a.name().to_string(),
            right: b.name().to_string(),
        });
    }

    let kind = if rank(a.kind()) >= rank(b.kind()) {
        a.kind()
    } else {
        b.kind()
    };
    let name = a.name().to_string();
    let dev = a.is_dev() && b.is_dev();

    if kind == PatchKind::Remove {
        return Ok(Patch::Remove(Removal {
            name,
            dev,
            disabled: a.is_disabled() || b.is_disabled(),
        }));
    }

    let change = DependencyChange {
        name,
        value: a.version().or(b.version()).map(str::to_string),
        source: a.source().or(b.source()),
        dev,
        files: a.files().iter().chain(b.files()).cloned().collect(),
    };
    Ok(match kind {
        PatchKind::Update => Patch::Update(change),
        _ => Patch::Add(change),
    })
}

/// Merge a patch stream into one patch per dependency name, ordered by name.
///
/// Local and Inherit patches never reach the root manifest and are dropped
/// before merging. A name with a local patch is in use by some package, so
/// every other patch for it is dropped too; a Remove must not survive alone.
/// Patches for one name are folded in input order.
pub fn merge_patches<I>(patches: I) -> Result<Vec<Patch>, MergeError>
where
    I: IntoIterator<Item = Patch>,
{
    let mut merged: BTreeMap<String, Patch> = BTreeMap::new();
    for patch in mergeable(patches.into_iter().collect()) {
        let next = match merged.remove(patch.name()) {
            Some(existing) => merge_pair(&existing, &patch)?,
            None => patch,
        };
        merged.insert(next.name().to_string(), next);
    }

    tracing::debug!("merged into {} patch group(s)", merged.len());
    Ok(merged.into_values().collect())
}

/// Dependencies whose patches carry different versions.
///
/// The merged patch keeps the first version seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConflict {
    pub name: String,
    pub kept: String,
    pub ignored: Vec<String>,
}

/// Find the names [`merge_patches`] would merge from disagreeing versions.
pub fn version_conflicts(patches: &[Patch]) -> Vec<VersionConflict> {
    let mut versions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for patch in mergeable(patches.to_vec()) {
        if let Some(version) = patch.version() {
            let seen = versions.entry(patch.name().to_string()).or_default();
            if !seen.iter().any(|v| v == version) {
                seen.push(version.to_string());
            }
        }
    }

    versions
        .into_iter()
        .filter(|(_, seen)| seen.len() > 1)
        .map(|(name, mut seen)| {
            let kept = seen.remove(0);
            VersionConflict {
                name,
                kept,
                ignored: seen,
            }
        })
        .collect()
}

fn mergeable(patches: Vec<Patch>) -> impl Iterator<Item = Patch> {
    let local: BTreeSet<String> = patches
        .iter()
        .filter(|p| p.is_local())
        .map(|p| p.name().to_string())
        .collect();
    patches
        .into_iter()
        .filter(move |p| p.kind() != PatchKind::Inherit && !local.contains(p.name()))
}
