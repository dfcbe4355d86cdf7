//! Patch resolver: attach values, provenance and enablement.

use crate::core::manifest::DependencyKind;
use crate::core::package::Package;
use crate::core::patch::{DependencyChange, Inheritance, Patch, Removal, Source};
use crate::core::workspace::WorkspaceGraph;

/// Run-wide resolution settings.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub graph: &'a WorkspaceGraph,
    /// Enables Remove patches regardless of per-package `prune`
    pub prune: bool,
}

impl<'a> ResolveContext<'a> {
    pub fn new(graph: &'a WorkspaceGraph) -> Self {
        ResolveContext {
            graph,
            prune: false,
        }
    }

    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Resolve `patch`, generated for `origin`, for application to `target`.
    ///
    /// In the packages pass `origin` and `target` are the same package. In
    /// the self-update pass children's patches are resolved for the root.
    pub fn resolve(&self, patch: &Patch, origin: &Package, target: &Package) -> Patch {
        match patch {
            Patch::Add(change) => Patch::Add(self.resolve_change(change, origin, target)),
            Patch::Update(change) => Patch::Update(self.resolve_change(change, origin, target)),
            Patch::Remove(removal) => Patch::Remove(Removal {
                disabled: !(target.config().prune || self.prune),
                ..removal.clone()
            }),
            Patch::Inherit(inheritance) => {
                let value = self
                    .graph
                    .parent_of(target)
                    .and_then(|parent| parent.manifest().get(&inheritance.name))
                    .cloned();
                let disabled = value.is_none() && !target.config().prune_inherited;
                Patch::Inherit(Inheritance {
                    name: inheritance.name.clone(),
                    value,
                    disabled,
                })
            }
        }
    }

    /// Resolve every patch, preserving order.
    pub fn resolve_all(&self, patches: &[Patch], origin: &Package, target: &Package) -> Vec<Patch> {
        patches
            .iter()
            .map(|p| self.resolve(p, origin, target))
            .collect()
    }

    fn resolve_change(
        &self,
        change: &DependencyChange,
        origin: &Package,
        target: &Package,
    ) -> DependencyChange {
        let name = change.name.as_str();

        if let Some(local) = self.graph.package_by_name(name) {
            return DependencyChange {
                value: self.graph.effective_version(local).map(str::to_string),
                source: Some(Source::Local),
                ..change.clone()
            };
        }

        let root = self.graph.root().manifest();
        let mut value = root.dependency(DependencyKind::Normal, name);
        if value.is_none() && change.dev {
            value = root.dependency(DependencyKind::Dev, name);
        }
        if value.is_none() && self.graph.is_root(target) && !self.graph.is_root(origin) {
            let own = origin.manifest();
            value = own
                .dependency(DependencyKind::Normal, name)
                .or_else(|| own.dependency(DependencyKind::Dev, name));
        }

        DependencyChange {
            value: value.map(str::to_string),
            source: Some(Source::Remote),
            ..change.clone()
        }
    }
}
