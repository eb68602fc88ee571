//! Merge rules: defaults applied beneath every other source.

use crate::relocate::DEFAULT_ORIGINAL_SUFFIX;
use crate::snapshot::DEFAULT_SNAPSHOT_FILE;
use crate::tree::hasher::DEFAULT_CHUNK_SIZE;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("hashing.chunk_size", DEFAULT_CHUNK_SIZE as i64)?
        .set_default("hashing.follow_symlinks", false)?
        .set_default("relocation.original_suffix", DEFAULT_ORIGINAL_SUFFIX)?
        .set_default("relocation.snapshot_file", DEFAULT_SNAPSHOT_FILE)
}
