//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Berth - build target generation for library dependencies
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the build units and aggregate targets for a resolution
    Targets(TargetsArgs),

    /// Compare a resolution with the previous installation
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct TargetsArgs {
    /// Analysis input file
    #[arg(long, default_value = "graph.toml")]
    pub input: PathBuf,

    /// Build one set of units per target instead of sharing them
    #[arg(long)]
    pub no_deduplicate: bool,

    /// Print the graph as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Analysis input file
    #[arg(long, default_value = "graph.toml")]
    pub input: PathBuf,

    /// Installation record of the previous run
    #[arg(long, default_value = "Pods/Manifest.toml")]
    pub manifest: PathBuf,

    /// Directory holding the installed packages
    #[arg(long, default_value = "Pods")]
    pub pods_dir: PathBuf,

    /// Reinstall packages that track a head version
    #[arg(long)]
    pub update: bool,

    /// Record this resolution as the installed state
    #[arg(long)]
    pub save: bool,

    /// Print the state as JSON
    #[arg(long)]
    pub json: bool,
}
