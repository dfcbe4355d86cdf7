//! Workspace graph: the root package plus the packages beneath it.
//!
//! The graph is built once per run and never mutated. Operations that
//! rewrite manifests work on copies.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::package::Package;
use crate::reconcile::errors::ReconcileError;
use crate::reconcile::events::{Event, Reporter};

pub use crate::core::manifest::{ManifestError, MANIFEST_NAME};

/// Directory names under the packages directory that are never packages.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Root package and its children.
#[derive(Debug, Clone)]
pub struct WorkspaceGraph {
    root: Package,
    /// Ordered by directory path
    children: Vec<Package>,
    packages_dir: PathBuf,
}

impl WorkspaceGraph {
    /// Discover the workspace rooted at `root`.
    ///
    /// Children are the directories directly beneath `root/packages_dir`.
    /// A directory without a manifest is skipped with a warning; two
    /// packages declaring the same name are an error.
    pub fn discover(
        root: &Path,
        packages_dir: &str,
        reporter: &dyn Reporter,
    ) -> Result<Self, ReconcileError> {
        let root_pkg = Package::load(root)?.ok_or_else(|| ReconcileError::RootManifestNotFound {
            dir: root.to_path_buf(),
        })?;

        let packages_dir = root.join(packages_dir);
        let mut children = Vec::new();
        for dir in child_dirs(&packages_dir) {
            match Package::load(&dir)? {
                Some(pkg) => children.push(pkg),
                None => reporter.report(Event::MissingManifest { dir }),
            }
        }

        tracing::debug!(
            "discovered {} package(s) under {}",
            children.len(),
            packages_dir.display()
        );

        Self::from_packages(root_pkg, children, packages_dir)
    }

    /// Build a graph from already loaded packages.
    pub fn from_packages(
        root: Package,
        mut children: Vec<Package>,
        packages_dir: PathBuf,
    ) -> Result<Self, ReconcileError> {
        children.sort_by(|a, b| a.root().cmp(b.root()));

        let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();
        for pkg in std::iter::once(&root).chain(children.iter()) {
            if let Some(name) = pkg.name() {
                if let Some(first) = seen.insert(name, pkg.root()) {
                    return Err(ReconcileError::DuplicatePackage {
                        name: name.to_string(),
                        first: first.to_path_buf(),
                        second: pkg.root().to_path_buf(),
                    });
                }
            }
        }

        Ok(WorkspaceGraph {
            root,
            children,
            packages_dir,
        })
    }

    pub fn root(&self) -> &Package {
        &self.root
    }

    pub fn children(&self) -> &[Package] {
        &self.children
    }

    /// Root first, then children in order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        std::iter::once(&self.root).chain(self.children.iter())
    }

    /// Absolute path of the packages directory.
    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    /// The package declaring `name`, if any.
    pub fn package_by_name(&self, name: &str) -> Option<&Package> {
        self.packages().find(|p| p.name() == Some(name))
    }

    pub fn is_root(&self, pkg: &Package) -> bool {
        *pkg == self.root
    }

    /// The package `pkg` inherits from: the root for children, none for the root.
    pub fn parent_of(&self, pkg: &Package) -> Option<&Package> {
        if self.is_root(pkg) {
            None
        } else {
            Some(&self.root)
        }
    }

    /// The version other packages see for `pkg`.
    ///
    /// A package inheriting `version` from a parent that declares one has
    /// the parent's version; otherwise its own.
    pub fn effective_version<'a>(&'a self, pkg: &'a Package) -> Option<&'a str> {
        if pkg.inherits("version") {
            if let Some(version) = self.parent_of(pkg).and_then(Package::version) {
                return Some(version);
            }
        }
        pkg.version()
    }
}

/// Sorted package directories directly beneath `dir`.
fn child_dirs(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("no packages directory at {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.') && !SKIPPED_DIRS.contains(&n))
        })
        .collect();
    dirs.sort();
    dirs
}
