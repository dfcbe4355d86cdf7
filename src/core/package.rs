//! Package - one workspace member and its manifest.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::core::manifest::{Manifest, ManifestError, PackageConfig, MANIFEST_NAME};
use crate::core::usage::ExcludeSet;
use crate::extract::ModuleSystem;
use crate::util::fs;

/// A workspace member: a directory holding a `package.json`.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package directory; identifies the package
    root: PathBuf,

    /// The parsed manifest
    manifest: Manifest,

    /// The manifest's `purser` block
    config: PackageConfig,

    /// Compiled dev-file globs
    dev_patterns: Vec<Pattern>,
}

impl Package {
    /// Create a package from a manifest and its directory.
    pub fn new(manifest: Manifest, root: PathBuf) -> Result<Self, ManifestError> {
        let manifest_path = root.join(MANIFEST_NAME);
        let config = manifest
            .config()
            .map_err(|message| ManifestError::InvalidConfig {
                path: manifest_path.clone(),
                message,
            })?;

        let dev_patterns =
            fs::compile_globs(&config.dev_globs()).map_err(|e| ManifestError::InvalidConfig {
                path: manifest_path,
                message: format!("invalid `dev` glob: {}", e),
            })?;

        Ok(Package {
            root,
            manifest,
            config,
            dev_patterns,
        })
    }

    /// Load the package in `dir`; `Ok(None)` when it has no manifest.
    pub fn load(dir: &Path) -> Result<Option<Self>, ManifestError> {
        match Manifest::load_dir(dir)? {
            Some(manifest) => Self::new(manifest, dir.to_path_buf()).map(Some),
            None => Ok(None),
        }
    }

    /// Declared package name.
    pub fn name(&self) -> Option<&str> {
        self.manifest.name()
    }

    /// Name for messages: the declared name, else the directory name.
    pub fn display_name(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.root.display().to_string()),
        }
    }

    /// Declared package version.
    pub fn version(&self) -> Option<&str> {
        self.manifest.version()
    }

    /// Get the package root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the manifest file path.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Source globs, falling back to the module system's extensions.
    pub fn source_globs(&self, system: ModuleSystem) -> Vec<String> {
        self.config
            .source
            .clone()
            .unwrap_or_else(|| system.default_globs())
    }

    /// Whether a file (relative to the package root) is dev-only source.
    pub fn is_dev_file(&self, relative: &str) -> bool {
        fs::matches_any(&self.dev_patterns, relative)
    }

    /// The package's own excludes plus the workspace-wide set.
    pub fn exclusions(&self, global: &ExcludeSet) -> ExcludeSet {
        let mut set = global.clone();
        set.extend(self.config.exclude.iter().cloned());
        set
    }

    /// Whether this package inherits `field` from its parent.
    pub fn inherits(&self, field: &str) -> bool {
        self.config.inherit.iter().any(|f| f == field)
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for Package {}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(json: &str) -> Package {
        Package::new(Manifest::parse(json).unwrap(), PathBuf::from("/ws/packages/a")).unwrap()
    }

    #[test]
    fn test_dev_file_classification() {
        let pkg = package(r#"{"name": "a", "purser": {"dev": ["test.js", "spec/**"]}}"#);
        assert!(pkg.is_dev_file("test.js"));
        assert!(pkg.is_dev_file("spec/unit/a.js"));
        assert!(!pkg.is_dev_file("index.js"));
        assert!(!pkg.is_dev_file("lib/test.js"));
    }

    #[test]
    fn test_default_dev_globs() {
        let pkg = package(r#"{"name": "a"}"#);
        assert!(pkg.is_dev_file("test/index.js"));
        assert!(pkg.is_dev_file("src/widget.test.js"));
        assert!(pkg.is_dev_file("widget.spec.ts"));
        assert!(!pkg.is_dev_file("src/widget.js"));
    }

    #[test]
    fn test_invalid_dev_glob_is_a_config_error() {
        let manifest = Manifest::parse(r#"{"purser": {"dev": "[oops"}}"#).unwrap();
        let err = Package::new(manifest, PathBuf::from("/ws")).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidConfig { .. }));
    }

    #[test]
    fn test_display_name_falls_back_to_directory() {
        let pkg = package(r#"{"version": "1.0.0"}"#);
        assert_eq!(pkg.display_name(), "a");
        assert_eq!(pkg.manifest_path(), PathBuf::from("/ws/packages/a/package.json"));
    }

    #[test]
    fn test_exclusions_union() {
        let pkg = package(r#"{"name": "a", "purser": {"exclude": ["internal"]}}"#);
        let global: ExcludeSet = ["fs"].into_iter().collect();
        let set = pkg.exclusions(&global);
        assert!(set.contains("fs"));
        assert!(set.contains("internal"));
    }

    #[test]
    fn test_source_globs_default_to_module_system() {
        let pkg = package(r#"{"name": "a"}"#);
        assert_eq!(pkg.source_globs(ModuleSystem::TypeScript), ModuleSystem::TypeScript.default_globs());

        let custom = package(r#"{"name": "a", "purser": {"source": "src/**/*.js"}}"#);
        assert_eq!(custom.source_globs(ModuleSystem::CommonJs), vec!["src/**/*.js"]);
    }
}
