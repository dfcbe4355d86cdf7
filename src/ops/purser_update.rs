//! Implementation of `purser update`.
//!
//! Two passes over the workspace:
//!
//! 1. **packages**: every child manifest is reconciled with its own source.
//! 2. **self** (opt-in): the root manifest is reconciled with the root's
//!    source and every child's, through the patch merger.
//!
//! All source is scanned before anything is written, so a parse failure
//! leaves every manifest untouched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::core::builtins::builtin_exclusions;
use crate::core::manifest::Manifest;
use crate::core::package::Package;
use crate::core::patch::{DependencyChange, Patch};
use crate::core::usage::{DependencyUsage, ExcludeSet};
use crate::core::workspace::WorkspaceGraph;
use crate::extract::{ExtractOptions, ExtractorRegistry, ModuleSystem};
use crate::ops::scan::{scan_workspace, ScanSettings, WorkspaceUsage};
use crate::reconcile::apply::{apply, Outcome};
use crate::reconcile::errors::ReconcileError;
use crate::reconcile::events::{Event, EventLog, Reporter};
use crate::reconcile::generate::{generate, generate_against, DevConflict};
use crate::reconcile::merge::{merge_patches, version_conflicts};
use crate::reconcile::resolve::ResolveContext;
use crate::util::config::Config;
use crate::util::fs;

/// Options for the update command.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Enable Remove patches for every package
    pub prune: bool,

    /// Run the self-update pass on the root manifest
    pub self_update: bool,

    /// Report patches without writing manifests
    pub dry_run: bool,

    pub module_system: ModuleSystem,

    /// Options for the module system's extractor
    pub extract_options: ExtractOptions,

    /// Exclude the platform builtin modules
    pub builtins: bool,

    /// Names excluded for every package
    pub exclude: Vec<String>,

    /// Worker threads (None = rayon default)
    pub jobs: Option<usize>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            prune: false,
            self_update: false,
            dry_run: false,
            module_system: ModuleSystem::default(),
            extract_options: ExtractOptions::new(),
            builtins: true,
            exclude: Vec::new(),
            jobs: None,
        }
    }
}

impl UpdateOptions {
    /// Options as configured in `purser.toml`; CLI flags are layered on top.
    pub fn from_config(config: &Config) -> Self {
        UpdateOptions {
            prune: config.prune(),
            self_update: config.self_update(),
            dry_run: false,
            module_system: config.module_system(),
            extract_options: config.extract.options.clone(),
            builtins: config.builtins(),
            exclude: config.extract.exclude.clone(),
            jobs: config.update.jobs,
        }
    }

    /// Names excluded for every package.
    pub fn exclusions(&self) -> ExcludeSet {
        let mut set = if self.builtins {
            builtin_exclusions()
        } else {
            ExcludeSet::new()
        };
        set.extend(self.exclude.iter().cloned());
        set
    }
}

/// What the update did to one manifest.
#[derive(Debug, Clone)]
pub struct ManifestReport {
    pub package: String,
    pub path: PathBuf,
    /// Every applied patch with its outcome, in application order
    pub outcomes: Vec<(Patch, Outcome)>,
    pub changed: bool,
    pub written: bool,
}

impl ManifestReport {
    /// Number of patches that changed the manifest.
    pub fn changes(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_changed()).count()
    }
}

/// Result of `purser update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Child packages, in graph order
    pub packages: Vec<ManifestReport>,
    /// The root manifest, when the self-update pass ran
    pub root: Option<ManifestReport>,
}

impl UpdateReport {
    pub fn manifests(&self) -> impl Iterator<Item = &ManifestReport> {
        self.packages.iter().chain(self.root.iter())
    }

    /// Number of manifests that changed.
    pub fn changed(&self) -> usize {
        self.manifests().filter(|m| m.changed).count()
    }

    pub fn changes(&self) -> usize {
        self.manifests().map(ManifestReport::changes).sum()
    }
}

/// Reconcile the workspace.
pub fn update(
    graph: &WorkspaceGraph,
    opts: &UpdateOptions,
    reporter: &dyn Reporter,
) -> Result<UpdateReport> {
    if opts.dry_run {
        tracing::info!("dry run, manifests will not be written");
    }
    if let Some(jobs) = opts.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok(); // already initialised
    }

    let registry = ExtractorRegistry::with_defaults();
    let extractor = registry
        .get(opts.module_system)
        .and_then(|e| e.validate_options(&opts.extract_options).map(|_| e))
        .map_err(|e| ReconcileError::from_extract(e, graph.root().root(), ""))?;

    let exclude = opts.exclusions();
    let settings = ScanSettings {
        system: opts.module_system,
        extractor,
        options: &opts.extract_options,
        exclude: &exclude,
    };

    let usage = scan_workspace(graph, &settings, opts.self_update, reporter)?;

    let mut report = UpdateReport {
        packages: update_packages(graph, &usage.children, opts, reporter)?,
        root: None,
    };
    if opts.self_update {
        report.root = Some(update_self(graph, &usage, opts, reporter)?);
    }

    tracing::debug!(
        "{} change(s) across {} manifest(s)",
        report.changes(),
        report.changed()
    );
    Ok(report)
}

/// The packages pass: reconcile each child with its own usage.
///
/// `usages` is parallel to `graph.children()`. Patches are planned for
/// every package before any manifest is written.
pub fn update_packages(
    graph: &WorkspaceGraph,
    usages: &[DependencyUsage],
    opts: &UpdateOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<ManifestReport>> {
    let ctx = ResolveContext::new(graph).with_prune(opts.prune);
    let exclude = opts.exclusions();

    let planned: Vec<(Plan, EventLog)> = graph
        .children()
        .par_iter()
        .zip(usages.par_iter())
        .map(|(pkg, usage)| {
            let log = EventLog::new();
            let generated = generate(pkg, usage, &pkg.exclusions(&exclude), true);
            report_conflicts(pkg, &generated.conflicts, &log);
            let patches = ctx.resolve_all(&generated.patches, pkg, pkg);
            let plan = Plan::apply(pkg, &patches, &log);
            (plan, log)
        })
        .collect();

    let mut reports = Vec::with_capacity(planned.len());
    for (plan, log) in planned {
        log.replay(reporter);
        reports.push(plan.write(opts.dry_run, reporter)?);
    }
    Ok(reports)
}

/// The self-update pass: reconcile the root with every package's usage.
///
/// The root's own patches come first, then each child's usage compared with
/// the root manifest. Local and Inherit patches are dropped and the rest
/// merged into one patch per dependency before application.
pub fn update_self(
    graph: &WorkspaceGraph,
    usage: &WorkspaceUsage,
    opts: &UpdateOptions,
    reporter: &dyn Reporter,
) -> Result<ManifestReport> {
    let root = graph.root();
    let ctx = ResolveContext::new(graph).with_prune(opts.prune);
    let root_exclude = root.exclusions(&opts.exclusions());

    let mut patches = Vec::new();
    if let Some(root_usage) = &usage.root {
        let generated = generate(root, root_usage, &root_exclude, false);
        report_conflicts(root, &generated.conflicts, reporter);
        patches.extend(ctx.resolve_all(&generated.patches, root, root));
    }

    for (child, child_usage) in graph.children().iter().zip(&usage.children) {
        let prefix = fs::relative_slash_path(root.root(), child.root());
        let generated = generate_against(
            child,
            root.manifest(),
            child_usage,
            &child.exclusions(&root_exclude),
            false,
        );
        let conflicts: Vec<DevConflict> = generated
            .conflicts
            .into_iter()
            .map(|c| DevConflict {
                files: prefixed(&prefix, c.files),
                name: c.name,
            })
            .collect();
        report_conflicts(root, &conflicts, reporter);
        patches.extend(
            ctx.resolve_all(&generated.patches, child, root)
                .into_iter()
                .map(|p| with_prefix(&prefix, p)),
        );
    }

    for conflict in version_conflicts(&patches) {
        reporter.report(Event::VersionConflict {
            package: root.display_name(),
            name: conflict.name,
            kept: conflict.kept,
            ignored: conflict.ignored,
        });
    }
    let merged = merge_patches(patches).context("failed to merge patches for the root manifest")?;
    Plan::apply(root, &merged, reporter).write(opts.dry_run, reporter)
}

/// A package's patched manifest, not yet written.
struct Plan {
    package: String,
    path: PathBuf,
    manifest: Manifest,
    outcomes: Vec<(Patch, Outcome)>,
    changed: bool,
}

impl Plan {
    /// Apply `patches` to a copy of `pkg`'s manifest, reporting each one.
    fn apply(pkg: &Package, patches: &[Patch], reporter: &dyn Reporter) -> Self {
        let package = pkg.display_name();
        let mut manifest = pkg.manifest().clone();
        let mut outcomes = Vec::with_capacity(patches.len());

        for patch in patches {
            match patch {
                Patch::Add(change) | Patch::Update(change) if change.value.is_none() => {
                    reporter.report(Event::UnresolvedDependency {
                        package: package.clone(),
                        name: change.name.clone(),
                        dev: change.dev,
                        files: change.files.clone(),
                    })
                }
                Patch::Inherit(inheritance) if inheritance.value.is_none() && inheritance.disabled => {
                    reporter.report(Event::MissingInheritedField {
                        package: package.clone(),
                        field: inheritance.name.clone(),
                    })
                }
                _ => {}
            }

            let outcome = apply(&mut manifest, patch);
            reporter.report(Event::patch(package.as_str(), patch, outcome.clone()));
            outcomes.push((patch.clone(), outcome));
        }

        let changed = manifest != *pkg.manifest();
        Plan {
            package,
            path: pkg.manifest_path(),
            manifest,
            outcomes,
            changed,
        }
    }

    fn write(self, dry_run: bool, reporter: &dyn Reporter) -> Result<ManifestReport> {
        let written = self.changed && !dry_run;
        if written {
            self.manifest
                .save(&self.path)
                .with_context(|| format!("failed to write manifest for `{}`", self.package))?;
            reporter.report(Event::ManifestWritten {
                package: self.package.clone(),
                path: self.path.clone(),
            });
        }
        Ok(ManifestReport {
            package: self.package,
            path: self.path,
            outcomes: self.outcomes,
            changed: self.changed,
            written,
        })
    }
}

fn report_conflicts(pkg: &Package, conflicts: &[DevConflict], reporter: &dyn Reporter) {
    for conflict in conflicts {
        reporter.report(Event::DevClassificationConflict {
            package: pkg.display_name(),
            name: conflict.name.clone(),
            files: conflict.files.clone(),
        });
    }
}

fn prefixed(prefix: &str, files: Vec<String>) -> Vec<String> {
    files
        .into_iter()
        .map(|f| format!("{}/{}", prefix, f))
        .collect()
}

/// Make a child patch's files relative to the root.
fn with_prefix(prefix: &str, patch: Patch) -> Patch {
    let rebase = |c: DependencyChange| DependencyChange {
        files: prefixed(prefix, c.files),
        ..c
    };
    match patch {
        Patch::Add(c) => Patch::Add(rebase(c)),
        Patch::Update(c) => Patch::Update(rebase(c)),
        other => other,
    }
}
