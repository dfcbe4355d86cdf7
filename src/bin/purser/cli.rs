//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;
use purser::extract::ModuleSystem;
use purser::util::shell::ColorChoice;

/// purser - keep workspace package.json files in sync with their source
#[derive(Parser)]
#[command(name = "purser")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (also prints patches that changed nothing)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,

    /// Output format for events
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Workspace root (defaults to the nearest directory with a purser.toml or package.json)
    #[arg(short, long, global = true, env = "PURSER_ROOT")]
    pub root: Option<PathBuf>,

    /// Packages directory, relative to the root
    #[arg(short, long, global = true, value_name = "DIR")]
    pub packages: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add, update and prune package.json dependencies from source imports
    Update(UpdateArgs),

    /// Symlink every package into <packages>/node_modules
    Link(LinkArgs),

    /// Print version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Remove dependencies no source file imports
    #[arg(long)]
    pub prune: bool,

    /// Also reconcile the root package.json
    #[arg(long = "self")]
    pub self_update: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Module system of the source files (commonjs, esm, amd, typescript)
    #[arg(long, value_name = "SYSTEM")]
    pub module_system: Option<ModuleSystem>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct LinkArgs {
    /// Replace existing entries that are not symlinks
    #[arg(long)]
    pub force: bool,

    /// Show the links without creating them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
