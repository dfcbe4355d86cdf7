//! User-friendly diagnostic messages.
//!
//! Every warning names what was found, where, and what to do about it.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Common suggestion messages for consistent warnings.
pub mod suggestions {
    /// A dependency is imported but nothing declares it.
    pub const UNRESOLVED: &str =
        "declare it in the root package.json `dependencies` or `devDependencies`";

    /// A dev-only dependency is imported by non-dev source.
    pub const DEV_CONFLICT: &str =
        "move it to `dependencies`, or add the importing files to the package's `dev` globs";

    /// A package directory has no manifest.
    pub const MISSING_MANIFEST: &str = "add a package.json, or move the directory out of the packages directory";

    /// An inherited field is absent from the parent.
    pub const MISSING_FIELD: &str =
        "set the field in the parent package.json, or set `pruneInherited` to remove it";

    /// Packages declare different versions of one dependency.
    pub const VERSION_CONFLICT: &str =
        "align the version across the packages that declare it";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the body of the diagnostic: the message followed by its
    /// location, context and suggestions, one per line.
    ///
    /// The severity itself is left to the caller, which prints it as a
    /// status prefix.
    pub fn format_body(&self, color: bool) -> String {
        let mut output = self.message.clone();

        if let Some(ref path) = self.location {
            output.push_str(&format!("\n  --> {}", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("\n  = {}", ctx));
        }

        let help_prefix = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
        for suggestion in &self.suggestions {
            output.push_str(&format!("\n  {}: {}", help_prefix, suggestion));
        }

        output
    }

    /// Format the full diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Info => "\x1b[1;34minfo\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            }
        };

        format!("{}: {}\n", severity_str, self.format_body(color))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}
