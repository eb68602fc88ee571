//! CLI command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string for log spans (e.g. "swap", "diff").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Swap { dry_run: true, .. } => "swap.dry_run",
        Commands::Swap { .. } => "swap",
        Commands::Diff { .. } => "diff",
        Commands::Snapshot { .. } => "snapshot",
    }
}
