//! Configuration System
//!
//! Layered configuration: built-in defaults, the user-level config file, the
//! workspace config files and `TREESWAP_` environment variables, in increasing
//! order of precedence. CLI flags are applied on top by the binary.

use crate::logging::LoggingConfig;
use crate::relocate::DEFAULT_ORIGINAL_SUFFIX;
use crate::snapshot::DEFAULT_SNAPSHOT_FILE;
use crate::tree::hasher::DEFAULT_CHUNK_SIZE;
use crate::tree::walker::WalkerConfig;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeswapConfig {
    /// Tree hashing settings
    #[serde(default)]
    pub hashing: HashingConfig,

    /// Backup area settings
    #[serde(default)]
    pub relocation: RelocationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tree hashing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Worker threads (unset = available parallelism)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Read buffer size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Hash symlinks that point at regular files
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            workers: None,
            chunk_size: default_chunk_size(),
            follow_symlinks: false,
        }
    }
}

impl HashingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }
        if self.workers == Some(0) {
            return Err("workers must be greater than zero when set".to_string());
        }
        Ok(())
    }

    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            workers: self.workers,
            chunk_size: self.chunk_size,
            follow_symlinks: self.follow_symlinks,
        }
    }
}

/// Backup area settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationConfig {
    /// Suffix appended to preserved baseline copies of changed files
    #[serde(default = "default_original_suffix")]
    pub original_suffix: String,

    /// Snapshot file name inside the backup directory
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
}

fn default_original_suffix() -> String {
    DEFAULT_ORIGINAL_SUFFIX.to_string()
}

fn default_snapshot_file() -> String {
    DEFAULT_SNAPSHOT_FILE.to_string()
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            original_suffix: default_original_suffix(),
            snapshot_file: default_snapshot_file(),
        }
    }
}

impl RelocationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.original_suffix.is_empty() {
            return Err("original_suffix cannot be empty".to_string());
        }
        if self.snapshot_file.is_empty() {
            return Err("snapshot_file cannot be empty".to_string());
        }
        for (name, value) in [
            ("original_suffix", &self.original_suffix),
            ("snapshot_file", &self.snapshot_file),
        ] {
            if value.contains('/') || value.contains('\\') {
                return Err(format!("{} cannot contain path separators", name));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Hashing(String),
    Relocation(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Hashing(msg) => write!(f, "Hashing: {}", msg),
            ValidationError::Relocation(msg) => write!(f, "Relocation: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl TreeswapConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.hashing.validate() {
            errors.push(ValidationError::Hashing(e));
        }
        if let Err(e) = self.relocation.validate() {
            errors.push(ValidationError::Relocation(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
