//! Workspace fixtures.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::manifest::MANIFEST_NAME;
use crate::util::config::PROJECT_CONFIG_NAME;

/// Builder for a workspace written to a temporary directory.
///
/// Packages land under `packages/<dir>`; extra files are relative to the
/// workspace root.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFixture {
    root_manifest: String,
    packages: Vec<(String, String)>,
    files: Vec<(PathBuf, String)>,
    config: Option<String>,
}

impl WorkspaceFixture {
    /// Start a workspace with the given root `package.json`.
    pub fn new(root_manifest: impl Into<String>) -> Self {
        WorkspaceFixture {
            root_manifest: root_manifest.into(),
            ..Default::default()
        }
    }

    /// Add a package at `packages/<dir>` with the given manifest.
    pub fn package(mut self, dir: impl Into<String>, manifest: impl Into<String>) -> Self {
        self.packages.push((dir.into(), manifest.into()));
        self
    }

    /// Add a file relative to the workspace root.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Set the `purser.toml` contents.
    pub fn config(mut self, toml: impl Into<String>) -> Self {
        self.config = Some(toml.into());
        self
    }

    /// Write everything to a fresh temporary directory.
    pub fn build(&self) -> TempWorkspace {
        let dir = TempDir::new().unwrap();
        self.write_to(dir.path()).unwrap();
        TempWorkspace { dir }
    }

    /// Write the workspace beneath `base`.
    pub fn write_to(&self, base: &Path) -> std::io::Result<()> {
        std::fs::write(base.join(MANIFEST_NAME), &self.root_manifest)?;

        for (dir, manifest) in &self.packages {
            let pkg = base.join("packages").join(dir);
            std::fs::create_dir_all(&pkg)?;
            std::fs::write(pkg.join(MANIFEST_NAME), manifest)?;
        }

        for (path, content) in &self.files {
            let full = base.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }

        if let Some(config) = &self.config {
            std::fs::write(base.join(PROJECT_CONFIG_NAME), config)?;
        }
        Ok(())
    }
}

/// A workspace on disk, deleted when dropped.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a package directory.
    pub fn package_dir(&self, dir: &str) -> PathBuf {
        self.root().join("packages").join(dir)
    }

    /// Read a file back as JSON.
    pub fn read_json(&self, path: impl AsRef<Path>) -> serde_json::Value {
        let content = std::fs::read_to_string(self.root().join(path)).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

/// The two-package workspace most reconciliation scenarios start from.
///
/// `package-1` requires `dep-1` (declared at the root) and `dep-2`
/// (declared nowhere); `package-2` requires `package-1`.
pub fn basic_workspace() -> WorkspaceFixture {
    WorkspaceFixture::new(
        r#"{
  "name": "root",
  "version": "0.0.1",
  "dependencies": {
    "dep-1": "0.0.0"
  }
}
"#,
    )
    .package(
        "package-1",
        r#"{
  "name": "@test/package-1",
  "version": "0.0.0"
}
"#,
    )
    .package(
        "package-2",
        r#"{
  "name": "@test/package-2",
  "version": "0.0.0"
}
"#,
    )
    .file(
        "packages/package-1/index.js",
        "const dep1 = require('dep-1');\nconst dep2 = require('dep-2');\n",
    )
    .file(
        "packages/package-2/index.js",
        "const p1 = require('@test/package-1');\n",
    )
}
