//! Configuration file support for purser.
//!
//! purser reads two configuration files:
//! - Global: `<config dir>/purser/config.toml` - User-wide defaults
//! - Project: `<workspace root>/purser.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extract::ModuleSystem;

/// Project config file name, at the workspace root.
pub const PROJECT_CONFIG_NAME: &str = "purser.toml";

/// Default packages directory, relative to the workspace root.
pub const DEFAULT_PACKAGES_DIR: &str = "packages";

/// purser configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace layout
    pub workspace: WorkspaceConfig,

    /// `purser update` settings
    pub update: UpdateConfig,

    /// Import extraction settings
    pub extract: ExtractConfig,
}

/// Workspace layout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory holding the child packages
    pub packages: Option<String>,
}

/// Update configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Enable Remove patches for every package
    pub prune: Option<bool>,

    /// Also reconcile the root manifest
    #[serde(rename = "self")]
    pub self_update: Option<bool>,

    /// Worker threads (None = rayon default)
    pub jobs: Option<usize>,
}

/// Extraction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractConfig {
    /// Module system of the workspace's source files
    pub module_system: Option<ModuleSystem>,

    /// Exclude the platform builtin modules
    pub builtins: Option<bool>,

    /// Names excluded for every package
    pub exclude: Vec<String>,

    /// Extractor options, passed through to the extractor
    pub options: Map<String, Value>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is unusable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.workspace.packages.is_some() {
            self.workspace.packages = other.workspace.packages;
        }

        if other.update.prune.is_some() {
            self.update.prune = other.update.prune;
        }
        if other.update.self_update.is_some() {
            self.update.self_update = other.update.self_update;
        }
        if other.update.jobs.is_some() {
            self.update.jobs = other.update.jobs;
        }

        if other.extract.module_system.is_some() {
            self.extract.module_system = other.extract.module_system;
        }
        if other.extract.builtins.is_some() {
            self.extract.builtins = other.extract.builtins;
        }
        for name in other.extract.exclude {
            if !self.extract.exclude.contains(&name) {
                self.extract.exclude.push(name);
            }
        }
        // Options are per key: a project can override a single option.
        self.extract.options.extend(other.extract.options);
    }

    /// Packages directory, relative to the workspace root.
    pub fn packages_dir(&self) -> &str {
        self.workspace
            .packages
            .as_deref()
            .unwrap_or(DEFAULT_PACKAGES_DIR)
    }

    pub fn prune(&self) -> bool {
        self.update.prune.unwrap_or(false)
    }

    pub fn self_update(&self) -> bool {
        self.update.self_update.unwrap_or(false)
    }

    pub fn module_system(&self) -> ModuleSystem {
        self.extract.module_system.unwrap_or_default()
    }

    /// Whether the builtin module list is excluded; on unless turned off.
    pub fn builtins(&self) -> bool {
        self.extract.builtins.unwrap_or(true)
    }
}

/// Load configuration with proper precedence.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (purser.toml)
/// 2. Global config
/// 3. Defaults
///
/// A broken global config only warns; a broken project config is an error,
/// since it describes the workspace being reconciled.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global purser config path.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "purser").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the project config path.
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(PROJECT_CONFIG_NAME)
}
