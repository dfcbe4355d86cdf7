//! purser CLI - keeps workspace package.json files in sync with their source

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use purser::reconcile::ReconcileError;
use purser::util::Shell;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MessageFormat};

fn main() {
    let cli = Cli::parse();

    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    ));

    if let Err(e) = run(cli, &shell) {
        match e.downcast::<ReconcileError>() {
            Ok(err) if !shell.is_json() => eprintln!("{:?}", miette::Report::new(err)),
            Ok(err) => shell.error(err),
            Err(e) => shell.error(format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("purser=debug")
    } else {
        EnvFilter::new("purser=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global = commands::GlobalArgs {
        root: cli.root,
        packages: cli.packages,
    };

    // Execute command
    match cli.command {
        Commands::Update(args) => commands::update::execute(args, &global, shell),
        Commands::Link(args) => commands::link::execute(args, &global, shell),
        Commands::Version => commands::version::execute(shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
