//! Global context for purser operations.
//!
//! Provides centralized access to the working directory, the workspace root
//! and the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::{ManifestError, MANIFEST_NAME};
use crate::util::config::{self, Config, PROJECT_CONFIG_NAME};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Explicit workspace root (`--root`)
    root: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext for the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext {
            cwd,
            root: None,
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            root: None,
        }
    }

    /// Pin the workspace root instead of searching for it.
    ///
    /// Relative paths are taken from the working directory.
    pub fn set_root(&mut self, root: PathBuf) {
        self.root = Some(self.cwd.join(root));
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Find the workspace root.
    ///
    /// An explicit root wins. Otherwise the nearest ancestor holding a
    /// `purser.toml` is the root, falling back to the nearest ancestor
    /// holding a `package.json`.
    pub fn find_workspace_root(&self) -> Result<PathBuf, ManifestError> {
        if let Some(root) = &self.root {
            if root.join(MANIFEST_NAME).is_file() {
                return Ok(root.clone());
            }
            return Err(ManifestError::NotFound { dir: root.clone() });
        }

        if let Some(dir) = find_upward(&self.cwd, PROJECT_CONFIG_NAME) {
            if dir.join(MANIFEST_NAME).is_file() {
                return Ok(dir);
            }
        }

        find_upward(&self.cwd, MANIFEST_NAME).ok_or_else(|| ManifestError::NotFound {
            dir: self.cwd.clone(),
        })
    }

    /// Load the merged global and project configuration for `root`.
    pub fn load_config(&self, root: &Path) -> Result<Config> {
        let global = config::global_config_path();
        config::load_config(global.as_deref(), &config::project_config_path(root))
    }
}

/// Nearest ancestor of `start` (inclusive) containing a file named `name`.
fn find_upward(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(name).is_file())
        .map(Path::to_path_buf)
}
