//! Import extraction.
//!
//! An [`ImportExtractor`] turns source text into the ordered list of module
//! specifiers it imports. Extractors never resolve specifiers; that is left
//! to [`crate::core::usage`].
//!
//! ## Module systems
//!
//! | system       | recognised forms                                   |
//! |--------------|----------------------------------------------------|
//! | `commonjs`   | `require('x')`                                     |
//! | `esm`        | `import … from 'x'`, `import 'x'`, `export … from 'x'`, `import('x')` |
//! | `typescript` | ESM forms plus `import x = require('x')`           |
//! | `amd`        | `define([...])`, `require([...])`, `require('x')`  |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod amd;
pub mod commonjs;
pub mod esm;
pub mod lexer;
pub mod typescript;

pub use amd::AmdExtractor;
pub use commonjs::CommonJsExtractor;
pub use esm::EsmExtractor;
pub use typescript::TypeScriptExtractor;

/// Per-system extractor options, as configured under `[extract.options]`.
pub type ExtractOptions = Map<String, Value>;

/// Error raised by an extractor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The source could not be parsed. Line and column are 1-based.
    #[error("{line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        /// Byte offset of the failure in the source
        offset: usize,
        message: String,
    },

    /// An option was unknown or had the wrong type.
    #[error("invalid extractor option `{key}`: {message}")]
    Config { key: String, message: String },
}

impl ExtractError {
    /// Build a parse error at `offset` in `source`.
    pub fn parse_at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = lexer::line_col(source, offset);
        ExtractError::Parse {
            line,
            column,
            offset,
            message: message.into(),
        }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        ExtractError::Config {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// The closed set of supported module systems.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSystem {
    #[default]
    CommonJs,
    Esm,
    Amd,
    TypeScript,
}

impl ModuleSystem {
    pub const ALL: [ModuleSystem; 4] = [
        ModuleSystem::CommonJs,
        ModuleSystem::Esm,
        ModuleSystem::Amd,
        ModuleSystem::TypeScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleSystem::CommonJs => "commonjs",
            ModuleSystem::Esm => "esm",
            ModuleSystem::Amd => "amd",
            ModuleSystem::TypeScript => "typescript",
        }
    }

    /// Source globs used when a package does not configure `source`.
    pub fn default_globs(&self) -> Vec<String> {
        let globs: &[&str] = match self {
            ModuleSystem::CommonJs => &["**/*.js", "**/*.cjs"],
            ModuleSystem::Esm => &["**/*.js", "**/*.mjs", "**/*.jsx"],
            ModuleSystem::Amd => &["**/*.js"],
            ModuleSystem::TypeScript => &["**/*.ts", "**/*.tsx", "**/*.mts", "**/*.cts"],
        };
        globs.iter().map(|g| g.to_string()).collect()
    }
}

impl fmt::Display for ModuleSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "commonjs" | "cjs" => Ok(ModuleSystem::CommonJs),
            "esm" | "es6" => Ok(ModuleSystem::Esm),
            "amd" => Ok(ModuleSystem::Amd),
            "typescript" | "ts" => Ok(ModuleSystem::TypeScript),
            _ => Err(format!(
                "unknown module system '{}'; expected 'commonjs', 'esm', 'amd', or 'typescript'",
                s
            )),
        }
    }
}

/// Extracts import specifiers from source text.
pub trait ImportExtractor: Send + Sync {
    /// The module system this extractor understands.
    fn module_system(&self) -> ModuleSystem;

    /// Check options before any file is read.
    fn validate_options(&self, options: &ExtractOptions) -> Result<(), ExtractError>;

    /// Specifiers imported by `source`, in source order.
    fn extract(&self, source: &str, options: &ExtractOptions) -> Result<Vec<String>, ExtractError>;
}

/// Module system → extractor.
pub struct ExtractorRegistry {
    extractors: BTreeMap<ModuleSystem, Box<dyn ImportExtractor>>,
}

impl ExtractorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ExtractorRegistry {
            extractors: BTreeMap::new(),
        }
    }

    /// A registry with the built-in extractor for every module system.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CommonJsExtractor));
        registry.register(Box::new(EsmExtractor));
        registry.register(Box::new(AmdExtractor));
        registry.register(Box::new(TypeScriptExtractor));
        registry
    }

    /// Register an extractor, replacing any previous one for its system.
    pub fn register(&mut self, extractor: Box<dyn ImportExtractor>) {
        self.extractors.insert(extractor.module_system(), extractor);
    }

    /// Look up the extractor for `system`.
    pub fn get(&self, system: ModuleSystem) -> Result<&dyn ImportExtractor, ExtractError> {
        self.extractors
            .get(&system)
            .map(|e| &**e)
            .ok_or_else(|| {
                ExtractError::config(
                    "module-system",
                    format!("no extractor registered for `{}`", system),
                )
            })
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("systems", &self.extractors.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Option helpers
// =============================================================================

/// Reject any option not in `allowed`.
pub(crate) fn check_keys(options: &ExtractOptions, allowed: &[&str]) -> Result<(), ExtractError> {
    match options.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(ExtractError::config(
            key.as_str(),
            if allowed.is_empty() {
                "this module system takes no options".to_string()
            } else {
                format!("expected one of: {}", allowed.join(", "))
            },
        )),
        None => Ok(()),
    }
}

pub(crate) fn bool_option(
    options: &ExtractOptions,
    key: &str,
    default: bool,
) -> Result<bool, ExtractError> {
    match options.get(key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(ExtractError::config(
            key,
            format!("expected a boolean, found {}", other),
        )),
    }
}

pub(crate) fn string_option<'a>(
    options: &'a ExtractOptions,
    key: &str,
    default: &'a str,
) -> Result<&'a str, ExtractError> {
    match options.get(key) {
        None => Ok(default),
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(other) => Err(ExtractError::config(
            key,
            format!("expected a non-empty string, found {}", other),
        )),
    }
}
