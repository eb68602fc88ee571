//! CLI parse: clap types for Treeswap. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Treeswap CLI - move modified and added files out of a tree and back up the originals
#[derive(Parser)]
#[command(name = "treeswap")]
#[command(about = "Reconcile a modified directory tree against its baseline by content hash")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Hashing worker threads (default: available parallelism)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Disable colored status output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Locations shared by the swap and diff commands
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Directory holding the working tree, the backup area and the original tree
    pub root: PathBuf,
    /// Working (modified) tree, relative to ROOT
    pub working: PathBuf,
    /// Backup directory name, created under ROOT
    pub backup: PathBuf,
    /// Original (unmodified) tree relative to ROOT; required on the first run
    pub baseline: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Move changed and added files into the backup directory
    Swap {
        #[command(flatten)]
        tree: TreeArgs,
        /// Report what would be moved without touching the filesystem
        #[arg(long)]
        dry_run: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Classify working files against the baseline without moving anything
    Diff {
        #[command(flatten)]
        tree: TreeArgs,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Hash the original tree and write the baseline snapshot only
    Snapshot {
        /// Directory holding the original tree and the backup area
        root: PathBuf,
        /// Original (unmodified) tree, relative to ROOT
        baseline: PathBuf,
        /// Backup directory name, created under ROOT
        backup: PathBuf,
    },
}

impl Commands {
    /// Root directory the command operates in
    pub fn root(&self) -> &PathBuf {
        match self {
            Commands::Swap { tree, .. } | Commands::Diff { tree, .. } => &tree.root,
            Commands::Snapshot { root, .. } => root,
        }
    }
}
