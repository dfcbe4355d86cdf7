//! Patch applier: the only code that mutates a manifest.

use serde::Serialize;
use serde_json::Value;

use crate::core::manifest::{DependencyKind, Manifest};
use crate::core::patch::Patch;

/// What applying a patch did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// The manifest changed; `previous` is the value that was replaced.
    Changed {
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<Value>,
    },
    /// The manifest already matched the patch.
    Unchanged,
    /// The patch is disabled and was not applied.
    Disabled,
    /// An Add/Update patch without a value.
    Unresolved,
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed { .. })
    }
}

/// Apply `patch` to `manifest`.
///
/// Applying the same patch twice changes nothing the second time.
pub fn apply(manifest: &mut Manifest, patch: &Patch) -> Outcome {
    if patch.is_disabled() {
        return Outcome::Disabled;
    }

    match patch {
        Patch::Add(change) | Patch::Update(change) => {
            let Some(version) = change.value.as_deref() else {
                return Outcome::Unresolved;
            };
            let kind = DependencyKind::from_dev(change.dev);
            if manifest.dependency(kind, &change.name) == Some(version) {
                return Outcome::Unchanged;
            }
            let previous = manifest.set_dependency(kind, &change.name, version);
            Outcome::Changed { previous }
        }
        Patch::Remove(removal) => {
            let kind = DependencyKind::from_dev(removal.dev);
            match manifest.remove_dependency(kind, &removal.name) {
                Some(previous) => Outcome::Changed {
                    previous: Some(previous),
                },
                None => Outcome::Unchanged,
            }
        }
        Patch::Inherit(inheritance) => match &inheritance.value {
            Some(value) => {
                if manifest.get(&inheritance.name) == Some(value) {
                    return Outcome::Unchanged;
                }
                let previous = manifest.set(&inheritance.name, value.clone());
                Outcome::Changed { previous }
            }
            // enabled with no value: the parent dropped the field
            None => match manifest.remove(&inheritance.name) {
                Some(previous) => Outcome::Changed {
                    previous: Some(previous),
                },
                None => Outcome::Unchanged,
            },
        },
    }
}

/// Apply every patch in order, returning each outcome.
pub fn apply_all<'a>(
    manifest: &mut Manifest,
    patches: impl IntoIterator<Item = &'a Patch>,
) -> Vec<Outcome> {
    patches.into_iter().map(|p| apply(manifest, p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::patch::{DependencyChange, Inheritance, Removal, Source};

    fn manifest(json: &str) -> Manifest {
        Manifest::parse(json).unwrap()
    }

    fn resolved_add(name: &str, version: &str, dev: bool) -> Patch {
        Patch::Add(DependencyChange {
            value: Some(version.into()),
            source: Some(Source::Remote),
            dev,
            ..DependencyChange::new(name)
        })
    }

    #[test]
    fn test_add_creates_table() {
        let mut m = manifest(r#"{"name": "a"}"#);
        let outcome = apply(&mut m, &resolved_add("dep", "1.0.0", true));
        assert_eq!(outcome, Outcome::Changed { previous: None });
        assert_eq!(m.dependency(DependencyKind::Dev, "dep"), Some("1.0.0"));
        assert!(!m.has_dependency(DependencyKind::Normal, "dep"));
    }

    #[test]
    fn test_apply_twice_is_unchanged() {
        let mut m = manifest(r#"{"dependencies": {"dep": "0.1.0"}}"#);
        let patch = Patch::Update(DependencyChange {
            value: Some("0.2.0".into()),
            ..DependencyChange::new("dep")
        });
        assert_eq!(
            apply(&mut m, &patch),
            Outcome::Changed {
                previous: Some(Value::from("0.1.0"))
            }
        );
        assert_eq!(apply(&mut m, &patch), Outcome::Unchanged);
    }

    #[test]
    fn test_unresolved_does_not_mutate() {
        let mut m = manifest(r#"{"dependencies": {"dep-1": "0.0.0"}}"#);
        let before = m.clone();
        assert_eq!(apply(&mut m, &Patch::add("dep-2", false, vec![])), Outcome::Unresolved);
        assert_eq!(m, before);
    }

    #[test]
    fn test_disabled_remove_is_reported_not_applied() {
        let mut m = manifest(r#"{"dependencies": {"old": "1.0.0"}}"#);
        let patch = Patch::Remove(Removal {
            name: "old".into(),
            dev: false,
            disabled: true,
        });
        assert_eq!(apply(&mut m, &patch), Outcome::Disabled);
        assert!(m.has_dependency(DependencyKind::Normal, "old"));

        assert!(apply(&mut m, &Patch::remove("old", false)).is_changed());
        assert!(!m.has_dependency(DependencyKind::Normal, "old"));
        assert_eq!(apply(&mut m, &Patch::remove("old", false)), Outcome::Unchanged);
    }

    #[test]
    fn test_inherit_sets_and_removes_fields() {
        let mut m = manifest(r#"{"name": "child", "version": "1.0.0", "license": "MIT"}"#);
        let set = Patch::Inherit(Inheritance {
            name: "version".into(),
            value: Some(Value::from("1.2.0")),
            disabled: false,
        });
        assert!(apply(&mut m, &set).is_changed());
        assert_eq!(m.version(), Some("1.2.0"));
        assert_eq!(apply(&mut m, &set), Outcome::Unchanged);

        let prune = Patch::Inherit(Inheritance {
            name: "license".into(),
            value: None,
            disabled: false,
        });
        assert!(apply(&mut m, &prune).is_changed());
        assert!(m.get("license").is_none());

        let keys: Vec<_> = m.fields().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "version"]);
    }

    #[test]
    fn test_sorted_table_stays_sorted() {
        let mut m = manifest(r#"{"dependencies": {"a": "1", "c": "1"}}"#);
        let outcomes = apply_all(
            &mut m,
            &[resolved_add("b", "1", false), resolved_add("d", "1", false)],
        );
        assert!(outcomes.iter().all(Outcome::is_changed));
        assert_eq!(m.dependency_names(DependencyKind::Normal), vec!["a", "b", "c", "d"]);
    }
}
