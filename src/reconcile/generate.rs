//! Patch generator: observed usage vs. declared dependencies.

use crate::core::manifest::{DependencyKind, Manifest};
use crate::core::package::Package;
use crate::core::patch::Patch;
use crate::core::usage::{DependencyUsage, ExcludeSet};

/// A dependency declared only in `devDependencies` but imported by non-dev source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevConflict {
    pub name: String,
    pub files: Vec<String>,
}

/// Raw patches for one package.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generated {
    /// Unresolved patches, in generation order
    pub patches: Vec<Patch>,
    pub conflicts: Vec<DevConflict>,
}

/// Generate the raw patch list for `package`.
///
/// `exclude` is the package's full exclusion set; excluded names get no
/// patch of any kind. `has_parent` enables Inherit patches.
///
/// Patches come out grouped: dev Adds, non-dev Adds, dev Updates, non-dev
/// Updates, Removes, then Inherits in configuration order. Within a group
/// names are sorted.
pub fn generate(
    package: &Package,
    usage: &DependencyUsage,
    exclude: &ExcludeSet,
    has_parent: bool,
) -> Generated {
    generate_against(package, package.manifest(), usage, exclude, has_parent)
}

/// Like [`generate`], but compare `package`'s usage with another manifest.
///
/// The self-update pass uses this to see each child's imports from the
/// root manifest's point of view. Dev classification and the inherit list
/// still come from `package`.
pub fn generate_against(
    package: &Package,
    manifest: &Manifest,
    usage: &DependencyUsage,
    exclude: &ExcludeSet,
    has_parent: bool,
) -> Generated {
    let own_name = package.name();

    let mut dev_adds = Vec::new();
    let mut adds = Vec::new();
    let mut dev_updates = Vec::new();
    let mut updates = Vec::new();
    let mut conflicts = Vec::new();

    for (name, files) in usage {
        // a package importing itself by name
        if Some(name.as_str()) == own_name || exclude.contains(name) {
            continue;
        }

        let files: Vec<String> = files.iter().cloned().collect();
        let dev = files.iter().all(|f| package.is_dev_file(f));
        let in_deps = manifest.has_dependency(DependencyKind::Normal, name);
        let in_dev_deps = manifest.has_dependency(DependencyKind::Dev, name);

        if !in_deps && !in_dev_deps {
            if dev {
                dev_adds.push(Patch::add(name.as_str(), true, files));
            } else {
                adds.push(Patch::add(name.as_str(), false, files));
            }
        } else if in_dev_deps {
            if !dev && !in_deps {
                conflicts.push(DevConflict {
                    name: name.clone(),
                    files: files.clone(),
                });
            }
            dev_updates.push(Patch::update(name.as_str(), true, files));
        } else {
            updates.push(Patch::update(name.as_str(), false, files));
        }
    }

    let removes = manifest
        .dependency_names(DependencyKind::Normal)
        .into_iter()
        .filter(|name| !usage.contains(name) && !exclude.contains(name))
        .map(|name| Patch::remove(name, false));

    let inherits = package
        .config()
        .inherit
        .iter()
        .filter(|_| has_parent)
        .map(|field| Patch::inherit(field.as_str()));

    let mut patches = Vec::new();
    patches.extend(dev_adds);
    patches.extend(adds);
    patches.extend(dev_updates);
    patches.extend(updates);
    patches.extend(removes);
    patches.extend(inherits);

    tracing::debug!(
        "generated {} patch(es) for {}",
        patches.len(),
        package.display_name()
    );

    Generated { patches, conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;
    use crate::core::patch::PatchKind;
    use std::path::PathBuf;

    fn package(json: &str) -> Package {
        Package::new(Manifest::parse(json).unwrap(), PathBuf::from("/ws/packages/p")).unwrap()
    }

    fn usage(entries: &[(&str, &[&str])]) -> DependencyUsage {
        let mut usage = DependencyUsage::new();
        for (name, files) in entries {
            for file in *files {
                usage.record(*name, *file);
            }
        }
        usage
    }

    fn summary(generated: &Generated) -> Vec<(PatchKind, String, bool)> {
        generated
            .patches
            .iter()
            .map(|p| (p.kind(), p.name().to_string(), p.is_dev()))
            .collect()
    }

    #[test]
    fn test_classification_and_order() {
        let pkg = package(
            r#"{
                "name": "p",
                "dependencies": {"used": "1.0.0", "unused": "1.0.0", "excluded": "1.0.0"},
                "devDependencies": {"dev-used": "1.0.0"},
                "purser": {"dev": "test.js", "inherit": ["version", "license"]}
            }"#,
        );
        let usage = usage(&[
            ("new-dev", &["test.js"]),
            ("new-prod", &["index.js", "test.js"]),
            ("used", &["index.js"]),
            ("dev-used", &["test.js"]),
        ]);
        let exclude: ExcludeSet = ["excluded"].into_iter().collect();

        let generated = generate(&pkg, &usage, &exclude, true);
        assert_eq!(
            summary(&generated),
            vec![
                (PatchKind::Add, "new-dev".into(), true),
                (PatchKind::Add, "new-prod".into(), false),
                (PatchKind::Update, "dev-used".into(), true),
                (PatchKind::Update, "used".into(), false),
                (PatchKind::Remove, "unused".into(), false),
                (PatchKind::Inherit, "version".into(), false),
                (PatchKind::Inherit, "license".into(), false),
            ]
        );
        assert!(generated.conflicts.is_empty());
        assert_eq!(generated.patches[1].files(), ["index.js".to_string(), "test.js".to_string()]);
    }

    #[test]
    fn test_non_dev_use_of_dev_dependency_is_a_conflict() {
        let pkg = package(r#"{"name": "p", "devDependencies": {"chai": "4.0.0"}}"#);
        let generated = generate(&pkg, &usage(&[("chai", &["index.js"])]), &ExcludeSet::new(), false);

        assert_eq!(summary(&generated), vec![(PatchKind::Update, "chai".into(), true)]);
        assert_eq!(
            generated.conflicts,
            vec![DevConflict {
                name: "chai".into(),
                files: vec!["index.js".into()]
            }]
        );
    }

    #[test]
    fn test_no_inherit_without_parent() {
        let pkg = package(r#"{"name": "root", "purser": {"inherit": ["version"]}}"#);
        let generated = generate(&pkg, &DependencyUsage::new(), &ExcludeSet::new(), false);
        assert!(generated.patches.is_empty());
    }

    #[test]
    fn test_self_import_is_ignored() {
        let pkg = package(r#"{"name": "@test/p"}"#);
        let generated = generate(
            &pkg,
            &usage(&[("@test/p", &["test/self.js"])]),
            &ExcludeSet::new(),
            false,
        );
        assert!(generated.patches.is_empty());
    }

    #[test]
    fn test_generate_against_root_manifest() {
        let child = package(r#"{"name": "b", "dependencies": {"dep-x": "3.1.0"}}"#);
        let root = Manifest::parse(r#"{"name": "root", "dependencies": {"dep-1": "0.0.0"}}"#).unwrap();

        let generated = generate_against(
            &child,
            &root,
            &usage(&[("dep-x", &["index.js"])]),
            &ExcludeSet::new(),
            false,
        );
        assert_eq!(
            summary(&generated),
            vec![
                (PatchKind::Add, "dep-x".into(), false),
                (PatchKind::Remove, "dep-1".into(), false),
            ]
        );
    }

    #[test]
    fn test_dev_dependencies_are_never_removed() {
        let pkg = package(r#"{"name": "p", "devDependencies": {"mocha": "1.0.0"}}"#);
        let generated = generate(&pkg, &DependencyUsage::new(), &ExcludeSet::new(), false);
        assert!(generated.patches.is_empty());
    }
}
