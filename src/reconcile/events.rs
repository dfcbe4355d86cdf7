//! Reconciliation events.
//!
//! The engine never prints. Everything it has to say goes through a
//! [`Reporter`] as an [`Event`]: the binary's [`Shell`] renders events as
//! status lines (or JSON with `--message-format json`), and parallel workers
//! buffer them in an [`EventLog`] to be replayed in a fixed order.
//!
//! # Stability
//!
//! Events serialize as one JSON object with a `reason` tag. New fields may
//! be added; existing fields are not renamed.

use std::cell::RefCell;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::core::patch::{Patch, PatchKind, Source};
use crate::reconcile::apply::Outcome;
use crate::util::diagnostic::{suggestions, Diagnostic, Severity};
use crate::util::shell::{Shell, Status};

/// Something the engine wants the user to know.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Event {
    /// A patch was handed to the applier.
    PatchApplied {
        /// Destination package
        package: String,
        kind: PatchKind,
        name: String,
        dev: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<Source>,
        #[serde(flatten)]
        outcome: Outcome,
    },

    /// A directory under the packages directory has no manifest.
    MissingManifest { dir: PathBuf },

    /// An imported dependency is declared nowhere.
    UnresolvedDependency {
        package: String,
        name: String,
        dev: bool,
        files: Vec<String>,
    },

    /// An inherited field is absent from the parent manifest.
    MissingInheritedField { package: String, field: String },

    /// A dependency declared only in `devDependencies` is used by non-dev source.
    DevClassificationConflict {
        package: String,
        name: String,
        files: Vec<String>,
    },

    /// A source file could not be read.
    UnreadableSource {
        package: String,
        file: PathBuf,
        message: String,
    },

    /// A source file could not be parsed or the extractor was misconfigured.
    ExtractionFailed {
        package: String,
        file: PathBuf,
        message: String,
    },

    /// Packages asked for different versions of a dependency; the first wins.
    VersionConflict {
        package: String,
        name: String,
        kept: String,
        ignored: Vec<String>,
    },

    /// A manifest was written to disk.
    ManifestWritten { package: String, path: PathBuf },

    /// A package was linked into the packages directory's `node_modules`.
    Linked {
        name: String,
        link: PathBuf,
        target: PathBuf,
    },
}

impl Event {
    /// Event for a patch and the applier's outcome.
    pub fn patch(package: impl Into<String>, patch: &Patch, outcome: Outcome) -> Self {
        Event::PatchApplied {
            package: package.into(),
            kind: patch.kind(),
            name: patch.name().to_string(),
            dev: patch.is_dev(),
            value: patch.value(),
            source: patch.source(),
            outcome,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::PatchApplied { .. } | Event::ManifestWritten { .. } | Event::Linked { .. } => {
                Severity::Info
            }
            Event::MissingManifest { .. }
            | Event::UnresolvedDependency { .. }
            | Event::MissingInheritedField { .. }
            | Event::DevClassificationConflict { .. }
            | Event::VersionConflict { .. }
            | Event::UnreadableSource { .. } => Severity::Warning,
            Event::ExtractionFailed { .. } => Severity::Error,
        }
    }

    /// One-line human description.
    pub fn message(&self) -> String {
        match self {
            Event::PatchApplied {
                package,
                kind,
                name,
                value,
                outcome,
                dev,
                source,
            } => {
                let text = patch_message(package, *kind, name, value.as_ref(), *dev, *source, outcome);
                if matches!(outcome, Outcome::Disabled) {
                    format!("DISABLED: {}", text)
                } else {
                    text
                }
            }
            Event::MissingManifest { dir } => {
                format!("no package.json in '{}', skipping", dir.display())
            }
            Event::UnresolvedDependency {
                package,
                name,
                files,
                ..
            } => format!(
                "'{}' required by {} ({}) not found in package.json or local packages.",
                name,
                package,
                files.join(", ")
            ),
            Event::MissingInheritedField { package, field } => format!(
                "'{}' inherited by {} is not set in the parent package.json.",
                field, package
            ),
            Event::DevClassificationConflict {
                package,
                name,
                files,
            } => format!(
                "'{}' required by {} in non-dev source ({}) was found in package.json devDependencies.",
                name,
                package,
                files.join(", ")
            ),
            Event::VersionConflict {
                package,
                name,
                kept,
                ignored,
            } => format!(
                "'{}' is required at {} and {} for package '{}'; using {}",
                name,
                kept,
                ignored.join(", "),
                package,
                kept
            ),
            Event::UnreadableSource {
                package,
                file,
                message,
            } => format!(
                "could not read '{}' in {}: {}",
                file.display(),
                package,
                message
            ),
            Event::ExtractionFailed {
                package,
                file,
                message,
            } => format!(
                "failed to extract imports from '{}' in {}: {}",
                file.display(),
                package,
                message
            ),
            Event::ManifestWritten { path, .. } => format!("wrote {}", path.display()),
            Event::Linked { name, link, target } => {
                format!("{} ({} -> {})", name, link.display(), target.display())
            }
        }
    }

    /// Warning rendered with context and a suggested fix.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::warning(self.message());
        match self {
            Event::UnresolvedDependency { .. } => diag.with_suggestion(suggestions::UNRESOLVED),
            Event::DevClassificationConflict { .. } => {
                diag.with_suggestion(suggestions::DEV_CONFLICT)
            }
            Event::MissingManifest { .. } => diag.with_suggestion(suggestions::MISSING_MANIFEST),
            Event::MissingInheritedField { .. } => {
                diag.with_suggestion(suggestions::MISSING_FIELD)
            }
            Event::VersionConflict { .. } => diag.with_suggestion(suggestions::VERSION_CONFLICT),
            _ => diag,
        }
    }
}

fn patch_message(
    package: &str,
    kind: PatchKind,
    name: &str,
    value: Option<&Value>,
    dev: bool,
    source: Option<Source>,
    outcome: &Outcome,
) -> String {
    let table = if dev { "devDependencies" } else { "dependencies" };
    let previous = match outcome {
        Outcome::Changed { previous } => previous.as_ref(),
        _ => None,
    };
    match kind {
        PatchKind::Add | PatchKind::Update => {
            let origin = match source {
                Some(Source::Local) => "local",
                _ => "remote",
            };
            let value = value.map(display_value).unwrap_or_else(|| "?".to_string());
            match previous {
                Some(previous) => format!(
                    "Updating {} package '{}' from {} to {} in package '{}' {}",
                    origin,
                    name,
                    display_value(previous),
                    value,
                    package,
                    table
                ),
                None => format!(
                    "Adding {} package '{}@{}' to package '{}' {}",
                    origin, name, value, package, table
                ),
            }
        }
        PatchKind::Remove => format!("Removing package '{}' from '{}' {}", name, package, table),
        PatchKind::Inherit => match (value, previous) {
            (None, _) => format!("Removing field '{}' from package '{}'", name, package),
            (Some(value), Some(previous)) => format!(
                "Updating field '{}' from {} to {} in package '{}'",
                name,
                display_value(previous),
                display_value(value),
                package
            ),
            (Some(value), None) => format!(
                "Adding field '{}' = {} to package '{}'",
                name,
                display_value(value),
                package
            ),
        },
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Receives engine events.
pub trait Reporter {
    fn report(&self, event: Event);
}

/// Buffers events for later replay.
#[derive(Debug, Default)]
pub struct EventLog {
    events: RefCell<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events.into_inner()
    }

    /// Forward every buffered event, in order.
    pub fn replay(self, reporter: &dyn Reporter) {
        for event in self.into_events() {
            reporter.report(event);
        }
    }
}

impl Reporter for EventLog {
    fn report(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }
}

impl Reporter for Shell {
    fn report(&self, event: Event) {
        tracing::debug!("{:?}", event);

        if self.is_json() {
            if let Ok(value) = serde_json::to_value(&event) {
                self.json_event(&value);
            }
            return;
        }

        match &event {
            Event::PatchApplied { kind, outcome, .. } => match outcome {
                Outcome::Changed { .. } => {
                    let status = match kind {
                        PatchKind::Add => Status::Added,
                        PatchKind::Update => Status::Updated,
                        PatchKind::Remove => Status::Removed,
                        PatchKind::Inherit => Status::Inherited,
                    };
                    self.status(status, event.message());
                }
                Outcome::Disabled => self.status(Status::Disabled, event.message()),
                Outcome::Unchanged => self.verbose_status(Status::Skipped, event.message()),
                // already reported as an unresolved dependency
                Outcome::Unresolved => {}
            },
            Event::ManifestWritten { .. } => self.verbose_status(Status::Info, event.message()),
            Event::Linked { .. } => self.status(Status::Linked, event.message()),
            Event::ExtractionFailed { .. } => self.error(event.message()),
            _ => self.warn(event.to_diagnostic().format_body(self.use_color())),
        }
    }
}
