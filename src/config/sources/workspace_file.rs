//! Tree-local config files: `<root>/config/config.toml`, then
//! `<root>/config/{TREESWAP_ENV}.toml`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_ENV: &str = "development";

/// Candidate files in increasing precedence. Missing files are left out.
pub fn workspace_config_paths(root: &Path) -> Vec<PathBuf> {
    let env_name = std::env::var("TREESWAP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    let config_dir = root.join("config");

    [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ]
    .into_iter()
    .filter(|path| path.is_file())
    .collect()
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(workspace_config_paths(root)
        .into_iter()
        .fold(builder, |builder, path| {
            debug!(config_path = %path.display(), "Adding tree configuration file");
            builder.add_source(File::from(path).required(false))
        }))
}
