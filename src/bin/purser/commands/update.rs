//! `purser update` command

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use crate::cli::UpdateArgs;
use crate::commands::{open_workspace, GlobalArgs};
use purser::ops::purser_update::{update, UpdateOptions};
use purser::util::shell::{Shell, Status};

pub fn execute(args: UpdateArgs, global: &GlobalArgs, shell: &Arc<Shell>) -> Result<()> {
    let (config, graph) = open_workspace(global, shell)?;

    // Flags turn settings on; they never turn configured ones off
    let mut opts = UpdateOptions::from_config(&config);
    opts.prune |= args.prune;
    opts.self_update |= args.self_update;
    opts.dry_run = args.dry_run;
    if let Some(system) = args.module_system {
        opts.module_system = system;
    }
    opts.jobs = args.jobs.or(opts.jobs);

    let span = shell.span(
        Status::Reconciling,
        format!(
            "{} package(s) in {}",
            graph.children().len(),
            graph.root().root().display()
        ),
    );

    let report = update(&graph, &opts, &**shell)?;

    if shell.is_json() {
        shell.json_event(&json!({
            "reason": "update-finished",
            "changes": report.changes(),
            "manifests": report.changed(),
            "dry_run": opts.dry_run,
        }));
    }

    let mut summary = if opts.dry_run {
        format!(
            "dry run, {} change(s) to {} manifest(s) not written",
            report.changes(),
            report.changed()
        )
    } else {
        format!(
            "{} change(s) to {} manifest(s)",
            report.changes(),
            report.changed()
        )
    };
    if shell.has_warnings() {
        summary.push_str(", with warnings");
    }
    span.finish_with_message(summary);

    Ok(())
}
