//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern, PatternError};
use walkdir::WalkDir;

/// Glob matching options: `*` stays within one path segment, `**` crosses them.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Compile a list of glob patterns.
pub fn compile_globs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>, PatternError> {
    patterns.iter().map(|p| Pattern::new(p.as_ref())).collect()
}

/// Whether `relative` (a `/`-separated path) matches any of `patterns`.
pub fn matches_any(patterns: &[Pattern], relative: &str) -> bool {
    patterns
        .iter()
        .any(|p| p.matches_with(relative, MATCH_OPTIONS))
}

/// Find files under `base` matching `include`, skipping anything matching
/// `ignore`.
///
/// Ignore globs ending in `/**` also prune the matching directory from the
/// walk, so large trees such as `node_modules` are never descended into.
/// Returns absolute paths, sorted.
pub fn find_files<S: AsRef<str>>(
    base: &Path,
    include: &[S],
    ignore: &[S],
) -> Result<Vec<PathBuf>, PatternError> {
    let include = compile_globs(include)?;
    let ignore_files = compile_globs(ignore)?;
    let ignore_dirs = ignore
        .iter()
        .filter_map(|p| p.as_ref().strip_suffix("/**"))
        .map(Pattern::new)
        .collect::<Result<Vec<_>, _>>()?;

    let walker = WalkDir::new(base)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let rel = relative_slash_path(base, entry.path());
            !matches_any(&ignore_dirs, &rel)
        });

    let mut results = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("failed to walk directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_slash_path(base, entry.path());
        if matches_any(&include, &rel) && !matches_any(&ignore_files, &rel) {
            results.push(entry.into_path());
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Relative path from `base` to `path` with `/` separators on every platform.
pub fn relative_slash_path(base: &Path, path: &Path) -> String {
    let rel = relative_path(base, path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Create a directory symlink (platform-aware).
#[cfg(unix)]
pub fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Whether `path` is a symlink (without following it).
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Remove a symlink, or with `force` whatever else is at `path`.
pub fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() && !meta.file_type().is_symlink() {
        fs::remove_dir_all(path)
    } else {
        match fs::remove_file(path) {
            // directory symlinks on windows
            Err(_) if cfg!(windows) => fs::remove_dir(path),
            other => other,
        }
    }
}
