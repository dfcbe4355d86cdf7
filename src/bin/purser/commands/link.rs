//! `purser link` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::LinkArgs;
use crate::commands::{open_workspace, GlobalArgs};
use purser::ops::purser_link::{link, LinkOptions};
use purser::util::shell::{Shell, Status};

pub fn execute(args: LinkArgs, global: &GlobalArgs, shell: &Arc<Shell>) -> Result<()> {
    let (_, graph) = open_workspace(global, shell)?;

    let opts = LinkOptions {
        force: args.force,
        dry_run: args.dry_run,
    };

    let span = shell.span(
        Status::Linked,
        format!("packages into {}", graph.packages_dir().join("node_modules").display()),
    );
    let links = link(&graph, &opts, &**shell)?;

    if args.dry_run {
        span.finish_with_message(format!("dry run, {} link(s) not created", links.len()));
    } else {
        span.finish_with_message(format!("linked {} package(s)", links.len()));
    }

    Ok(())
}
