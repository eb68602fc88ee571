//! Shared test utilities for integration tests
//!
//! Builds small trees on disk and lists them back, and serializes access to
//! process environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use treeswap::config::TreeswapConfig;
use treeswap::swap::{SwapRequest, Swapper};
use walkdir::WalkDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write `files` (relative path, content) under `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Every regular file under `root`, relative and `/`-separated, sorted.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

pub fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

pub fn swapper() -> Swapper {
    let mut config = TreeswapConfig::default();
    config.hashing.workers = Some(4);
    Swapper::new(config).unwrap()
}

/// Request against `root/mod` with backup `root/backup`
pub fn request(root: &Path, baseline: Option<&str>) -> SwapRequest {
    SwapRequest {
        root: root.to_path_buf(),
        working_sub: PathBuf::from("mod"),
        backup_name: PathBuf::from("backup"),
        baseline_sub: baseline.map(PathBuf::from),
        dry_run: false,
    }
}
