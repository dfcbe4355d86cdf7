//! Command implementations

pub mod completions;
pub mod link;
pub mod update;
pub mod version;

use std::path::PathBuf;

use anyhow::Result;
use purser::core::{ManifestError, WorkspaceGraph};
use purser::reconcile::ReconcileError;
use purser::util::{Config, GlobalContext, Shell};

/// Flags shared by every workspace command.
pub struct GlobalArgs {
    pub root: Option<PathBuf>,
    pub packages: Option<String>,
}

/// Locate the workspace, load its configuration and discover its packages.
pub fn open_workspace(global: &GlobalArgs, shell: &Shell) -> Result<(Config, WorkspaceGraph)> {
    let mut ctx = GlobalContext::new()?;
    if let Some(root) = &global.root {
        ctx.set_root(root.clone());
    }

    let root = ctx.find_workspace_root().map_err(|e| match e {
        ManifestError::NotFound { dir } => ReconcileError::RootManifestNotFound { dir },
        other => ReconcileError::from(other),
    })?;
    tracing::debug!("workspace root: {}", root.display());

    // CLI overrides config
    let mut config = ctx.load_config(&root)?;
    if let Some(packages) = &global.packages {
        config.workspace.packages = Some(packages.clone());
    }

    let graph = WorkspaceGraph::discover(&root, config.packages_dir(), shell)?;
    Ok((config, graph))
}
