//! Import usage: which dependencies a package's source actually references.
//!
//! Raw specifiers (`lodash/fp`, `@babel/core/lib/x`, `./util`) are reduced to
//! dependency names and grouped with the files that reference them.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// Dependency names that are never treated as manifest dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludeSet {
    names: BTreeSet<String>,
}

impl ExcludeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExcludeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ExcludeSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for ExcludeSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.names.extend(iter.into_iter().map(Into::into));
    }
}

/// Reduce an import specifier to the dependency it names.
///
/// Returns `None` for relative or absolute paths, protocol specifiers
/// such as `node:fs`, and excluded names.
pub fn resolve_specifier(specifier: &str, exclude: &ExcludeSet) -> Option<String> {
    let spec = specifier.trim();
    if spec.is_empty() || is_path_like(spec) || has_protocol(spec) || exclude.contains(spec) {
        return None;
    }

    let mut segments = spec.split('/');
    let first = segments.next()?;
    let name = if first.starts_with('@') {
        match segments.next() {
            Some(second) if !second.is_empty() => format!("{}/{}", first, second),
            _ => first.to_string(),
        }
    } else {
        first.to_string()
    };

    if exclude.contains(&name) {
        return None;
    }
    Some(name)
}

fn is_path_like(spec: &str) -> bool {
    spec == "."
        || spec == ".."
        || spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
}

fn has_protocol(spec: &str) -> bool {
    match spec.find(':') {
        Some(colon) => spec.find('/').map_or(true, |slash| colon < slash),
        None => false,
    }
}

/// Dependency name → files referencing it.
///
/// File paths are relative to the package root, with `/` separators. An entry
/// is only ever created together with its first file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyUsage {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `file` references dependency `name`.
    pub fn record(&mut self, name: impl Into<String>, file: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .insert(file.into());
    }

    /// Resolve and record every specifier imported by `file`.
    pub fn record_imports<I, S>(&mut self, file: &str, specifiers: I, exclude: &ExcludeSet)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for spec in specifiers {
            if let Some(name) = resolve_specifier(spec.as_ref(), exclude) {
                self.record(name, file);
            }
        }
    }

    pub fn files(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeSet<String>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DependencyUsage {
    type Item = (&'a String, &'a BTreeSet<String>);
    type IntoIter = btree_map::Iter<'a, String, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build a usage map from per-file specifier lists.
pub fn resolve_usage<I, S>(files: I, exclude: &ExcludeSet) -> DependencyUsage
where
    I: IntoIterator<Item = (String, Vec<S>)>,
    S: AsRef<str>,
{
    let mut usage = DependencyUsage::new();
    for (file, specifiers) in files {
        usage.record_imports(&file, specifiers, exclude);
    }
    usage
}
