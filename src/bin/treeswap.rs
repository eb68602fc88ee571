//! Treeswap CLI Binary
//!
//! Command-line interface for moving modified and added files out of a tree.

use clap::Parser;
use std::io::IsTerminal;
use std::process;
use tracing::{error, info};
use treeswap::cli::{Cli, RunContext};
use treeswap::config::TreeswapConfig;
use treeswap::error::RunError;
use treeswap::logging::{init_logging, LoggingConfig};

fn main() {
    let cli = Cli::parse();

    let loaded = RunContext::load_config(cli.command.root(), cli.config.as_deref());

    // Build logging config from CLI args and config file
    let logging_config = build_logging_config(
        &cli,
        loaded.as_ref().map(|c| c.logging.clone()).unwrap_or_default(),
    );

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Treeswap starting");

    let config = match loaded {
        Ok(config) => apply_overrides(&cli, config),
        Err(e) => fail(e),
    };

    let color = !cli.no_color && std::io::stdout().is_terminal();
    let context = match RunContext::new(config, color) {
        Ok(ctx) => ctx,
        Err(e) => fail(e),
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            print!("{}", output);
        }
        Err(e) => fail(e),
    }
}

fn fail(e: RunError) -> ! {
    error!("Command failed: {}", e);
    eprintln!("{}", treeswap::cli::map_error(&e));
    process::exit(1);
}

/// Apply CLI flags that override the hashing section of the config.
fn apply_overrides(cli: &Cli, mut config: TreeswapConfig) -> TreeswapConfig {
    if let Some(workers) = cli.workers {
        config.hashing.workers = Some(workers);
    }
    config.logging = build_logging_config(cli, config.logging.clone());
    config
}

/// Build logging configuration from CLI args on top of the loaded config.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, mut config: LoggingConfig) -> LoggingConfig {
    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }
    if cli.no_color {
        config.color = false;
    }
    config
}
