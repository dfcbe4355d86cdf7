//! Fatal reconciliation errors.
//!
//! Recoverable problems are reported as [`Event`](crate::reconcile::events::Event)s;
//! the errors here abort the run.

use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::core::manifest::ManifestError;
use crate::core::patch::PatchKind;
use crate::extract::ExtractError;

#[derive(Debug, Error, MietteDiagnostic)]
pub enum ReconcileError {
    #[error("failed to parse `{}` at {line}:{column}: {message}", path.display())]
    #[diagnostic(
        code(purser::extract::parse),
        help("check `extract.module-system` in purser.toml matches this source")
    )]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("invalid extractor option `{key}`: {message}")]
    #[diagnostic(code(purser::extract::config))]
    Config { key: String, message: String },

    #[error("package `{name}` is declared twice: `{}` and `{}`", first.display(), second.display())]
    #[diagnostic(
        code(purser::workspace::duplicate),
        help("every package in the workspace needs a unique `name`")
    )]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("could not find `package.json` in `{}`", dir.display())]
    #[diagnostic(
        code(purser::workspace::root_not_found),
        help("run inside a workspace or pass `--root <dir>`")
    )]
    RootManifestNotFound { dir: PathBuf },

    #[error("invalid glob `{pattern}`: {message}")]
    #[diagnostic(code(purser::workspace::glob))]
    InvalidGlob { pattern: String, message: String },

    #[error(transparent)]
    #[diagnostic(code(purser::manifest))]
    Manifest(#[from] ManifestError),
}

impl ReconcileError {
    /// Attach the failing file to an extractor error.
    pub fn from_extract(err: ExtractError, path: &Path, source: &str) -> Self {
        match err {
            ExtractError::Parse {
                line,
                column,
                offset,
                message,
            } => {
                let offset = offset.min(source.len());
                let len = source
                    .get(offset..)
                    .and_then(|rest| rest.chars().next())
                    .map_or(0, char::len_utf8);
                ReconcileError::Parse {
                    path: path.to_path_buf(),
                    line,
                    column,
                    message,
                    src: NamedSource::new(path.display().to_string(), source.to_string()),
                    span: (offset, len).into(),
                }
            }
            ExtractError::Config { key, message } => ReconcileError::Config { key, message },
        }
    }
}

/// Patches that cannot be merged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("cannot merge patches for different dependencies `{left}` and `{right}`")]
    NameMismatch { left: String, right: String },

    #[error("cannot merge {kind} patch for `{name}`")]
    NotMergeable { name: String, kind: PatchKind },
}
