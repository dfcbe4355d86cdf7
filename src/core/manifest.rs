//! `package.json` manifest model.
//!
//! A manifest is kept as an ordered JSON object so that fields this tool does
//! not understand survive a load/save cycle untouched, in their original
//! order. Typed accessors sit on top for the handful of fields the
//! reconciliation engine reads or writes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::util::fs;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "package.json";

/// Top-level manifest key holding per-package configuration.
pub const CONFIG_KEY: &str = "purser";

/// Errors raised while locating or parsing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `package.json` in `{}`", dir.display())]
    NotFound { dir: PathBuf },

    #[error("failed to parse `{}`: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("invalid `purser` configuration in `{}`: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },
}

/// Which dependency table of a manifest an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// `dependencies`
    Normal,
    /// `devDependencies`
    Dev,
}

impl DependencyKind {
    /// Pick the table for a `dev` flag.
    pub fn from_dev(dev: bool) -> Self {
        if dev {
            DependencyKind::Dev
        } else {
            DependencyKind::Normal
        }
    }

    /// The manifest field holding this table.
    pub fn field(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// A parsed `package.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// Parse manifest text.
    ///
    /// The top level must be a JSON object.
    pub fn parse(content: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(fields)) => Ok(Manifest { fields }),
            Ok(other) => Err(format!(
                "expected a JSON object at the top level, found {}",
                json_type_name(&other)
            )),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Load a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|e| ManifestError::Invalid {
            path: path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

        Self::parse(&content).map_err(|message| ManifestError::Invalid {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Load `package.json` from a directory.
    ///
    /// A directory without a manifest yields `Ok(None)`; an unreadable or
    /// malformed one is an error.
    pub fn load_dir(dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = dir.join(MANIFEST_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Serialize with two-space indentation and a trailing newline.
    pub fn to_json_string(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.fields).unwrap_or_default();
        out.push('\n');
        out
    }

    /// Write the manifest back to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        fs::write_string(path, &self.to_json_string())
    }

    /// The raw JSON object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Package name.
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Package version.
    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Read an arbitrary top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a top-level field, returning the previous value.
    ///
    /// Existing fields keep their position; new fields are appended.
    pub fn set(&mut self, field: &str, value: Value) -> Option<Value> {
        self.fields.insert(field.to_string(), value)
    }

    /// Remove a top-level field, keeping the order of the others.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Per-package configuration from the `purser` block.
    pub fn config(&self) -> Result<PackageConfig, String> {
        match self.fields.get(CONFIG_KEY) {
            None | Some(Value::Null) => Ok(PackageConfig::default()),
            Some(value) => PackageConfig::deserialize(value).map_err(|e| e.to_string()),
        }
    }

    fn table(&self, kind: DependencyKind) -> Option<&Map<String, Value>> {
        self.fields.get(kind.field()).and_then(Value::as_object)
    }

    /// Whether `name` is declared in the given table.
    pub fn has_dependency(&self, kind: DependencyKind, name: &str) -> bool {
        self.table(kind).is_some_and(|t| t.contains_key(name))
    }

    /// Declared version of `name` in the given table.
    pub fn dependency(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.table(kind)?.get(name).and_then(Value::as_str)
    }

    /// Names declared in the given table, in manifest order.
    pub fn dependency_names(&self, kind: DependencyKind) -> Vec<&str> {
        self.table(kind)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Set `name` to `version` in the given table, creating the table if needed.
    ///
    /// Returns the previous value. A table whose keys were alphabetically
    /// sorted stays sorted; otherwise new keys go at the end.
    pub fn set_dependency(
        &mut self,
        kind: DependencyKind,
        name: &str,
        version: &str,
    ) -> Option<Value> {
        let entry = self
            .fields
            .entry(kind.field().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(table) = entry else {
            return None;
        };

        if table.contains_key(name) {
            return table.insert(name.to_string(), Value::String(version.to_string()));
        }

        let was_sorted = is_sorted(table.keys());
        table.insert(name.to_string(), Value::String(version.to_string()));
        if was_sorted {
            sort_keys(table);
        }
        None
    }

    /// Remove `name` from the given table, returning its previous value.
    pub fn remove_dependency(&mut self, kind: DependencyKind, name: &str) -> Option<Value> {
        self.fields
            .get_mut(kind.field())
            .and_then(Value::as_object_mut)
            .and_then(|t| t.shift_remove(name))
    }
}

fn is_sorted<'a>(keys: impl Iterator<Item = &'a String>) -> bool {
    let keys: Vec<&String> = keys.collect();
    keys.windows(2).all(|w| w[0] <= w[1])
}

fn sort_keys(table: &mut Map<String, Value>) {
    let mut entries: Vec<(String, Value)> = std::mem::take(table).into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    table.extend(entries);
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Per-package configuration, read from the manifest's `purser` block.
///
/// Glob fields accept either a single pattern or a list of patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageConfig {
    /// Source globs; `None` means the module system's defaults.
    #[serde(deserialize_with = "one_or_many")]
    pub source: Option<Vec<String>>,

    /// Globs marking files whose imports count as dev-only.
    #[serde(deserialize_with = "one_or_many")]
    pub dev: Option<Vec<String>>,

    /// Globs removed from the source selection.
    #[serde(deserialize_with = "one_or_many")]
    pub ignore: Option<Vec<String>>,

    /// Dependency names never added or removed for this package.
    #[serde(deserialize_with = "many")]
    pub exclude: Vec<String>,

    /// Top-level fields copied from the parent manifest.
    #[serde(alias = "inherits", deserialize_with = "many")]
    pub inherit: Vec<String>,

    /// Allow Remove patches to mutate this manifest.
    pub prune: bool,

    /// Remove inherited fields the parent no longer declares.
    pub prune_inherited: bool,
}

/// Default dev-file globs.
pub const DEFAULT_DEV_GLOBS: &[&str] = &[
    "test/**",
    "tests/**",
    "**/__tests__/**",
    "**/*.test.*",
    "**/*.spec.*",
];

/// Default ignore globs.
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &["**/node_modules/**"];

impl PackageConfig {
    /// Dev globs with defaults applied.
    pub fn dev_globs(&self) -> Vec<String> {
        self.dev
            .clone()
            .unwrap_or_else(|| DEFAULT_DEV_GLOBS.iter().map(|s| s.to_string()).collect())
    }

    /// Ignore globs with defaults applied.
    pub fn ignore_globs(&self) -> Vec<String> {
        self.ignore
            .clone()
            .unwrap_or_else(|| DEFAULT_IGNORE_GLOBS.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    many(deserializer).map(Some)
}

fn many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
  "name": "test-package",
  "version": "0.0.1",
  "author": "Some Body",
  "dependencies": {
    "dependency-1": "0.0.0",
    "dependency-2": "0.0.1",
    "unused-dependency": "0.0.0"
  },
  "devDependencies": {
    "dev-dependency-1": "9.9.9"
  },
  "purser": {
    "dev": "test.js",
    "inherits": ["version", "author"],
    "exclude": ["excluded-dependency"]
  }
}"#;

    #[test]
    fn test_typed_accessors() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(manifest.name(), Some("test-package"));
        assert_eq!(manifest.version(), Some("0.0.1"));
        assert_eq!(
            manifest.dependency(DependencyKind::Normal, "dependency-2"),
            Some("0.0.1")
        );
        assert!(manifest.has_dependency(DependencyKind::Dev, "dev-dependency-1"));
        assert!(!manifest.has_dependency(DependencyKind::Dev, "dependency-1"));
        assert_eq!(
            manifest.dependency_names(DependencyKind::Normal),
            vec!["dependency-1", "dependency-2", "unused-dependency"]
        );
    }

    #[test]
    fn test_config_parsing() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let config = manifest.config().unwrap();
        assert_eq!(config.dev, Some(vec!["test.js".to_string()]));
        assert_eq!(config.inherit, vec!["version", "author"]);
        assert_eq!(config.exclude, vec!["excluded-dependency"]);
        assert!(config.source.is_none());
        assert!(!config.prune);
        assert_eq!(config.ignore_globs(), vec!["**/node_modules/**"]);
    }

    #[test]
    fn test_config_accepts_single_strings() {
        let manifest =
            Manifest::parse(r#"{"purser": {"inherit": "version", "exclude": "internal"}}"#)
                .unwrap();
        let config = manifest.config().unwrap();
        assert_eq!(config.inherit, vec!["version"]);
        assert_eq!(config.exclude, vec!["internal"]);
    }

    #[test]
    fn test_config_rejects_wrong_types() {
        let manifest = Manifest::parse(r#"{"purser": {"prune": "yes"}}"#).unwrap();
        assert!(manifest.config().is_err());
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(Manifest::parse("[1, 2]").is_err());
        assert!(Manifest::parse("{ not json").is_err());
    }

    #[test]
    fn test_set_dependency_keeps_sorted_tables_sorted() {
        let mut manifest = Manifest::parse(SAMPLE).unwrap();
        manifest.set_dependency(DependencyKind::Normal, "dependency-3", "1.0.0");
        assert_eq!(
            manifest.dependency_names(DependencyKind::Normal),
            vec!["dependency-1", "dependency-2", "dependency-3", "unused-dependency"]
        );
    }

    #[test]
    fn test_set_dependency_appends_to_unsorted_tables() {
        let mut manifest =
            Manifest::parse(r#"{"dependencies": {"zeta": "1.0.0", "alpha": "1.0.0"}}"#).unwrap();
        manifest.set_dependency(DependencyKind::Normal, "beta", "2.0.0");
        assert_eq!(
            manifest.dependency_names(DependencyKind::Normal),
            vec!["zeta", "alpha", "beta"]
        );
    }

    #[test]
    fn test_set_dependency_creates_table() {
        let mut manifest = Manifest::parse(r#"{"name": "x"}"#).unwrap();
        let previous = manifest.set_dependency(DependencyKind::Dev, "mocha", "10.0.0");
        assert!(previous.is_none());
        assert_eq!(manifest.dependency(DependencyKind::Dev, "mocha"), Some("10.0.0"));
    }

    #[test]
    fn test_remove_keeps_field_order() {
        let mut manifest = Manifest::parse(SAMPLE).unwrap();
        manifest.remove("version");
        let keys: Vec<&String> = manifest.fields().keys().collect();
        assert_eq!(
            keys,
            vec!["name", "author", "dependencies", "devDependencies", "purser"]
        );
    }

    #[test]
    fn test_save_round_trips_unknown_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        let manifest = Manifest::parse(r#"{"name": "a", "repository": {"type": "git"}, "x": [1]}"#)
            .unwrap();
        manifest.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_load_dir_without_manifest() {
        let tmp = TempDir::new().unwrap();
        assert!(Manifest::load_dir(tmp.path()).unwrap().is_none());
    }
}
