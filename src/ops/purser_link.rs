//! Implementation of `purser link`.
//!
//! Makes every child package resolvable by name from its siblings by
//! symlinking it into `<packages>/node_modules`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::workspace::WorkspaceGraph;
use crate::reconcile::events::{Event, Reporter};
use crate::util::fs;

/// Options for the link command.
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Replace entries that are not symlinks
    pub force: bool,

    /// Report links without creating them
    pub dry_run: bool,
}

/// A package symlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: String,
    /// Path of the symlink
    pub link: PathBuf,
    /// The package directory it points to
    pub target: PathBuf,
}

/// Link every named child package into `<packages>/node_modules`.
///
/// Scoped names land in an `@org` directory. Existing symlinks are
/// replaced; anything else at the link path is an error unless `force`.
pub fn link(graph: &WorkspaceGraph, opts: &LinkOptions, reporter: &dyn Reporter) -> Result<Vec<Link>> {
    let modules = graph.packages_dir().join("node_modules");
    let mut links = Vec::new();

    for pkg in graph.children() {
        let Some(name) = pkg.name() else {
            tracing::debug!("skipping unnamed package at {}", pkg.root().display());
            continue;
        };
        let link = modules.join(name);

        if !opts.dry_run {
            replace_link(&link, pkg.root(), opts.force)
                .with_context(|| format!("failed to link `{}`", name))?;
        }

        reporter.report(Event::Linked {
            name: name.to_string(),
            link: link.clone(),
            target: pkg.root().to_path_buf(),
        });
        links.push(Link {
            name: name.to_string(),
            link,
            target: pkg.root().to_path_buf(),
        });
    }

    Ok(links)
}

fn replace_link(link: &Path, target: &Path, force: bool) -> Result<()> {
    if let Some(parent) = link.parent() {
        fs::ensure_dir(parent)?;
    }

    if fs::is_symlink(link) {
        fs::remove_entry(link)?;
    } else if link.exists() {
        if !force {
            bail!(
                "`{}` already exists and is not a symlink (use --force to replace it)",
                link.display()
            );
        }
        fs::remove_entry(link)?;
    }

    fs::symlink_dir(target, link)
        .with_context(|| format!("failed to create symlink {}", link.display()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::reconcile::events::EventLog;
    use crate::test_support::WorkspaceFixture;

    fn graph(root: &Path) -> WorkspaceGraph {
        WorkspaceGraph::discover(root, "packages", &EventLog::new()).unwrap()
    }

    #[test]
    fn test_link_scoped_and_plain_names() {
        let ws = WorkspaceFixture::new(r#"{"name": "root"}"#)
            .package("a", r#"{"name": "@test/a"}"#)
            .package("b", r#"{"name": "b"}"#)
            .build();

        let links = link(&graph(ws.root()), &LinkOptions::default(), &EventLog::new()).unwrap();
        assert_eq!(links.len(), 2);

        let scoped = ws.root().join("packages/node_modules/@test/a");
        assert!(fs::is_symlink(&scoped));
        assert_eq!(std::fs::read_link(&scoped).unwrap(), ws.package_dir("a"));
        assert!(fs::is_symlink(&ws.root().join("packages/node_modules/b")));

        // relinking replaces the existing symlinks
        let again = link(&graph(ws.root()), &LinkOptions::default(), &EventLog::new()).unwrap();
        assert_eq!(again, links);
    }

    #[test]
    fn test_existing_directory_needs_force() {
        let ws = WorkspaceFixture::new(r#"{"name": "root"}"#)
            .package("b", r#"{"name": "b"}"#)
            .file("packages/node_modules/b/stale.js", "")
            .build();

        let err = link(&graph(ws.root()), &LinkOptions::default(), &EventLog::new()).unwrap_err();
        assert!(format!("{:#}", err).contains("--force"));

        let opts = LinkOptions {
            force: true,
            ..LinkOptions::default()
        };
        link(&graph(ws.root()), &opts, &EventLog::new()).unwrap();
        assert!(fs::is_symlink(&ws.root().join("packages/node_modules/b")));
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let ws = WorkspaceFixture::new(r#"{"name": "root"}"#)
            .package("b", r#"{"name": "b"}"#)
            .build();

        let opts = LinkOptions {
            dry_run: true,
            ..LinkOptions::default()
        };
        let log = EventLog::new();
        let links = link(&graph(ws.root()), &opts, &log).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(log.len(), 1);
        assert!(!ws.root().join("packages/node_modules").exists());
    }
}
