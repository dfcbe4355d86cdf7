//! Source scanning: file discovery, import extraction, usage folding.

use std::path::{Path, PathBuf};

use glob::Pattern;
use rayon::prelude::*;

use crate::core::package::Package;
use crate::core::usage::{DependencyUsage, ExcludeSet};
use crate::core::workspace::WorkspaceGraph;
use crate::extract::{ExtractError, ExtractOptions, ImportExtractor, ModuleSystem};
use crate::reconcile::errors::ReconcileError;
use crate::reconcile::events::{Event, EventLog, Reporter};
use crate::util::fs;

/// Run-wide extraction settings.
#[derive(Clone, Copy)]
pub struct ScanSettings<'a> {
    pub system: ModuleSystem,
    pub extractor: &'a dyn ImportExtractor,
    pub options: &'a ExtractOptions,
    /// Names excluded for every package
    pub exclude: &'a ExcludeSet,
}

impl std::fmt::Debug for ScanSettings<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSettings")
            .field("system", &self.system)
            .field("options", &self.options)
            .field("exclude", &self.exclude)
            .finish()
    }
}

/// Usage for every package in a workspace, in graph order.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceUsage {
    /// Only scanned for the self-update pass
    pub root: Option<DependencyUsage>,
    pub children: Vec<DependencyUsage>,
}

enum FileError {
    Io(std::io::Error),
    Extract(ExtractError, String),
}

/// Scan one package's source files.
///
/// Files are read and extracted in parallel; results are folded in path
/// order. `extra_ignore` is appended to the package's own ignore globs.
/// Unreadable files are reported and contribute nothing. The first parse
/// or option failure is reported and returned.
pub fn scan_package(
    pkg: &Package,
    settings: &ScanSettings<'_>,
    extra_ignore: &[String],
    reporter: &dyn Reporter,
) -> Result<DependencyUsage, ReconcileError> {
    let include = pkg.source_globs(settings.system);
    let mut ignore = pkg.config().ignore_globs();
    ignore.extend(extra_ignore.iter().cloned());
    check_globs(include.iter().chain(ignore.iter()))?;

    let files = fs::find_files(pkg.root(), &include, &ignore).map_err(|e| {
        ReconcileError::InvalidGlob {
            pattern: include.join(", "),
            message: e.to_string(),
        }
    })?;
    tracing::debug!("scanning {} file(s) in {}", files.len(), pkg.display_name());

    let results: Vec<(&PathBuf, Result<Vec<String>, FileError>)> = files
        .par_iter()
        .map(|path| (path, extract_file(path, settings)))
        .collect();

    let exclude = pkg.exclusions(settings.exclude);
    let mut usage = DependencyUsage::new();
    for (path, result) in results {
        let rel = fs::relative_slash_path(pkg.root(), path);
        match result {
            Ok(specifiers) => usage.record_imports(&rel, specifiers, &exclude),
            Err(FileError::Io(e)) => reporter.report(Event::UnreadableSource {
                package: pkg.display_name(),
                file: path.clone(),
                message: e.to_string(),
            }),
            Err(FileError::Extract(err, source)) => {
                reporter.report(Event::ExtractionFailed {
                    package: pkg.display_name(),
                    file: path.clone(),
                    message: err.to_string(),
                });
                return Err(ReconcileError::from_extract(err, path, &source));
            }
        }
    }

    Ok(usage)
}

fn extract_file(path: &Path, settings: &ScanSettings<'_>) -> Result<Vec<String>, FileError> {
    let source = std::fs::read_to_string(path).map_err(FileError::Io)?;
    settings
        .extractor
        .extract(&source, settings.options)
        .map_err(|e| FileError::Extract(e, source))
}

fn check_globs<'a>(patterns: impl Iterator<Item = &'a String>) -> Result<(), ReconcileError> {
    for pattern in patterns {
        if let Err(e) = Pattern::new(pattern) {
            return Err(ReconcileError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.msg.to_string(),
            });
        }
    }
    Ok(())
}

/// Scan every child package, and the root when `include_root` is set.
///
/// Packages are scanned in parallel. Each buffers its events, which are
/// replayed in graph order; scanning stops at the first failing package
/// once its events have been replayed.
pub fn scan_workspace(
    graph: &WorkspaceGraph,
    settings: &ScanSettings<'_>,
    include_root: bool,
    reporter: &dyn Reporter,
) -> Result<WorkspaceUsage, ReconcileError> {
    // the root's source never includes its children's
    let root_ignore = vec![format!(
        "{}/**",
        fs::relative_slash_path(graph.root().root(), graph.packages_dir())
    )];

    let mut targets: Vec<(&Package, &[String])> = Vec::new();
    if include_root {
        targets.push((graph.root(), root_ignore.as_slice()));
    }
    targets.extend(graph.children().iter().map(|c| (c, &[][..])));

    let scanned: Vec<(Result<DependencyUsage, ReconcileError>, EventLog)> = targets
        .par_iter()
        .map(|(pkg, ignore)| {
            let log = EventLog::new();
            let result = scan_package(pkg, settings, ignore, &log);
            (result, log)
        })
        .collect();

    let mut usages = Vec::with_capacity(scanned.len());
    for (result, log) in scanned {
        log.replay(reporter);
        usages.push(result?);
    }

    let root = if include_root {
        Some(usages.remove(0))
    } else {
        None
    };
    Ok(WorkspaceUsage {
        root,
        children: usages,
    })
}
