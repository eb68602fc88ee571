//! CLI route: single route table and run context. Dispatches to the swap pipeline and presentation.

use crate::config::{ConfigLoader, TreeswapConfig};
use crate::error::RunError;
use crate::swap::{SwapRequest, Swapper};
use std::path::Path;
use std::time::Instant;
use tracing::{info, info_span};

use crate::cli::command_name;
use crate::cli::parse::{Commands, TreeArgs};
use crate::cli::presentation::{
    format_diff_json, format_diff_text, format_snapshot_summary, format_swap_json,
    format_swap_text,
};

/// Runtime context for CLI execution: loaded configuration and the pipeline.
pub struct RunContext {
    swapper: Swapper,
    color: bool,
}

impl RunContext {
    /// Load configuration for `root`, or from `config_path` when given. Uses ConfigLoader only.
    pub fn load_config(
        root: &Path,
        config_path: Option<&Path>,
    ) -> Result<TreeswapConfig, RunError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(root)?,
        };
        Ok(config)
    }

    /// Build the run context from an already merged configuration.
    pub fn new(config: TreeswapConfig, color: bool) -> Result<Self, RunError> {
        Ok(Self {
            swapper: Swapper::new(config)?,
            color,
        })
    }

    pub fn swapper(&self) -> &Swapper {
        &self.swapper
    }

    /// Execute a command and return its rendered output.
    pub fn execute(&self, command: &Commands) -> Result<String, RunError> {
        let span = info_span!("command", name = command_name(command));
        let _guard = span.enter();
        let started = Instant::now();

        let result = self.execute_inner(command);

        info!(
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, RunError> {
        match command {
            Commands::Swap {
                tree,
                dry_run,
                format,
            } => {
                let format = OutputFormat::parse(format)?;
                let summary = self.swapper.run(&swap_request(tree, *dry_run))?;
                match format {
                    OutputFormat::Text => Ok(format_swap_text(&summary, self.color)),
                    OutputFormat::Json => format_swap_json(&summary),
                }
            }
            Commands::Diff { tree, format } => {
                let format = OutputFormat::parse(format)?;
                let report = self.swapper.diff(&swap_request(tree, true))?;
                match format {
                    OutputFormat::Text => Ok(format_diff_text(&report)),
                    OutputFormat::Json => format_diff_json(&report),
                }
            }
            Commands::Snapshot {
                root,
                baseline,
                backup,
            } => {
                let summary = self.swapper.write_snapshot_only(root, baseline, backup)?;
                Ok(format_snapshot_summary(&summary))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self, RunError> {
        match format {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(RunError::InvalidRequest(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

fn swap_request(tree: &TreeArgs, dry_run: bool) -> SwapRequest {
    SwapRequest {
        root: tree.root.clone(),
        working_sub: tree.working.clone(),
        backup_name: tree.backup.clone(),
        baseline_sub: tree.baseline.clone(),
        dry_run,
    }
}
