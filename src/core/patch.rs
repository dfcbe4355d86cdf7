//! Patches: proposed manifest mutations.
//!
//! A patch is produced by the generator, given a value by the resolver,
//! optionally folded with others by the merger, and finally handed to the
//! applier. Each stage builds new patches; none are edited in place.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::manifest::DependencyKind;

/// Where a dependency's version comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Another package in the workspace.
    Local,
    /// The root manifest's declared dependencies.
    Remote,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local => f.write_str("local"),
            Source::Remote => f.write_str("remote"),
        }
    }
}

/// Discriminant of a [`Patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Add,
    Update,
    Remove,
    Inherit,
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatchKind::Add => "add",
            PatchKind::Update => "update",
            PatchKind::Remove => "remove",
            PatchKind::Inherit => "inherit",
        };
        f.write_str(s)
    }
}

/// Payload of Add and Update patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChange {
    pub name: String,
    /// Version to write; `None` until resolved, or when nothing declares it.
    pub value: Option<String>,
    pub source: Option<Source>,
    /// Targets `devDependencies` instead of `dependencies`.
    pub dev: bool,
    /// Source files that reference the dependency.
    pub files: Vec<String>,
}

impl DependencyChange {
    pub fn new(name: impl Into<String>) -> Self {
        DependencyChange {
            name: name.into(),
            value: None,
            source: None,
            dev: false,
            files: Vec::new(),
        }
    }
}

/// Payload of Remove patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub name: String,
    pub dev: bool,
    pub disabled: bool,
}

/// Payload of Inherit patches.
#[derive(Debug, Clone, PartialEq)]
pub struct Inheritance {
    /// Top-level field name.
    pub name: String,
    pub value: Option<Value>,
    pub disabled: bool,
}

/// One proposed manifest mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Add(DependencyChange),
    Update(DependencyChange),
    Remove(Removal),
    Inherit(Inheritance),
}

impl Patch {
    /// Unresolved Add.
    pub fn add(name: impl Into<String>, dev: bool, files: Vec<String>) -> Self {
        Patch::Add(DependencyChange {
            dev,
            files,
            ..DependencyChange::new(name)
        })
    }

    /// Unresolved Update.
    pub fn update(name: impl Into<String>, dev: bool, files: Vec<String>) -> Self {
        Patch::Update(DependencyChange {
            dev,
            files,
            ..DependencyChange::new(name)
        })
    }

    /// Remove, enabled until the resolver says otherwise.
    pub fn remove(name: impl Into<String>, dev: bool) -> Self {
        Patch::Remove(Removal {
            name: name.into(),
            dev,
            disabled: false,
        })
    }

    /// Unresolved Inherit.
    pub fn inherit(name: impl Into<String>) -> Self {
        Patch::Inherit(Inheritance {
            name: name.into(),
            value: None,
            disabled: false,
        })
    }

    pub fn kind(&self) -> PatchKind {
        match self {
            Patch::Add(_) => PatchKind::Add,
            Patch::Update(_) => PatchKind::Update,
            Patch::Remove(_) => PatchKind::Remove,
            Patch::Inherit(_) => PatchKind::Inherit,
        }
    }

    /// Dependency or field name.
    pub fn name(&self) -> &str {
        match self {
            Patch::Add(c) | Patch::Update(c) => &c.name,
            Patch::Remove(r) => &r.name,
            Patch::Inherit(i) => &i.name,
        }
    }

    /// The value that would be written, as JSON.
    pub fn value(&self) -> Option<Value> {
        match self {
            Patch::Add(c) | Patch::Update(c) => c.value.clone().map(Value::String),
            Patch::Remove(_) => None,
            Patch::Inherit(i) => i.value.clone(),
        }
    }

    /// Version string of an Add/Update patch.
    pub fn version(&self) -> Option<&str> {
        match self {
            Patch::Add(c) | Patch::Update(c) => c.value.as_deref(),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<Source> {
        match self {
            Patch::Add(c) | Patch::Update(c) => c.source,
            _ => None,
        }
    }

    pub fn is_dev(&self) -> bool {
        match self {
            Patch::Add(c) | Patch::Update(c) => c.dev,
            Patch::Remove(r) => r.dev,
            Patch::Inherit(_) => false,
        }
    }

    /// Disabled patches are reported but never applied.
    pub fn is_disabled(&self) -> bool {
        match self {
            Patch::Add(_) | Patch::Update(_) => false,
            Patch::Remove(r) => r.disabled,
            Patch::Inherit(i) => i.disabled,
        }
    }

    pub fn is_local(&self) -> bool {
        self.source() == Some(Source::Local)
    }

    pub fn files(&self) -> &[String] {
        match self {
            Patch::Add(c) | Patch::Update(c) => &c.files,
            _ => &[],
        }
    }

    /// The dependency table this patch targets; `None` for Inherit.
    pub fn dependency_kind(&self) -> Option<DependencyKind> {
        match self {
            Patch::Inherit(_) => None,
            _ => Some(DependencyKind::from_dev(self.is_dev())),
        }
    }

    /// Add/Update patches that resolved to no version.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Patch::Add(c) | Patch::Update(c) if c.value.is_none())
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind(), self.name())?;
        match self {
            Patch::Add(c) | Patch::Update(c) => {
                if let Some(v) = &c.value {
                    write!(f, "@{}", v)?;
                }
                if c.dev {
                    f.write_str(" (dev)")?;
                }
            }
            Patch::Inherit(Inheritance {
                value: Some(v), ..
            }) => write!(f, " = {}", v)?,
            _ => {}
        }
        if self.is_disabled() {
            f.write_str(" [disabled]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let patch = Patch::add("left-pad", true, vec!["test.js".into()]);
        assert_eq!(patch.kind(), PatchKind::Add);
        assert_eq!(patch.name(), "left-pad");
        assert!(patch.is_dev());
        assert!(patch.is_unresolved());
        assert_eq!(patch.files(), ["test.js".to_string()]);
        assert_eq!(patch.dependency_kind(), Some(DependencyKind::Dev));
    }

    #[test]
    fn test_remove_and_inherit_defaults() {
        let remove = Patch::remove("old", false);
        assert!(!remove.is_disabled());
        assert!(remove.value().is_none());
        assert!(remove.files().is_empty());

        let inherit = Patch::inherit("version");
        assert_eq!(inherit.kind(), PatchKind::Inherit);
        assert!(inherit.dependency_kind().is_none());
        assert!(!inherit.is_unresolved());
    }

    #[test]
    fn test_display() {
        let patch = Patch::Update(DependencyChange {
            value: Some("1.0.0".into()),
            source: Some(Source::Remote),
            ..DependencyChange::new("react")
        });
        assert_eq!(patch.to_string(), "update `react`@1.0.0");

        let remove = Patch::Remove(Removal {
            name: "lodash".into(),
            dev: false,
            disabled: true,
        });
        assert_eq!(remove.to_string(), "remove `lodash` [disabled]");
    }
}
