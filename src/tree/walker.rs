//! Concurrent tree walker
//!
//! Expands a directory tree on a rayon thread pool: every directory and every
//! file is one unit of work. Directory units list their children, register one
//! barrier unit per child, spawn them and then arrive. File units hash their
//! content into a shared concurrent map and arrive. The caller waits on the
//! [`FanOutBarrier`] and only then reads the inventory.

use crate::error::StorageError;
use crate::inventory::HashInventory;
use crate::tree::barrier::{BarrierStats, FanOutBarrier};
use crate::tree::hasher::{self, Digest, DEFAULT_CHUNK_SIZE};
use crate::tree::path;
use dashmap::DashMap;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Tree walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Worker threads in the pool (None = available parallelism)
    pub workers: Option<usize>,
    /// Read buffer size used by the hasher
    pub chunk_size: usize,
    /// Hash the target of symlinks that point at regular files
    pub follow_symlinks: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            workers: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            follow_symlinks: false,
        }
    }
}

/// A discovered filesystem entry awaiting processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Counters collected during a walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Files hashed into the inventory
    pub files: usize,
    /// Directories expanded, including the root
    pub directories: usize,
    /// Files or directories that could not be read
    pub failures: usize,
    /// Symlinks and special files left out of the walk
    pub skipped: usize,
    pub barrier: BarrierStats,
}

/// Result of walking one tree
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub root: PathBuf,
    pub inventory: HashInventory,
    pub stats: WalkStats,
}

/// State shared by every unit of one walk
struct ScanState {
    barrier: FanOutBarrier,
    inventory: DashMap<PathBuf, Digest>,
    files: AtomicUsize,
    directories: AtomicUsize,
    failures: AtomicUsize,
    skipped: AtomicUsize,
    config: WalkerConfig,
}

/// Retires a unit on drop, so a unit always arrives exactly once
struct Arrival<'a>(&'a FanOutBarrier);

impl Drop for Arrival<'_> {
    fn drop(&mut self) {
        self.0.arrive();
    }
}

/// Concurrent tree walker backed by a rayon thread pool
pub struct TreeWalker {
    pool: Arc<ThreadPool>,
    config: WalkerConfig,
}

impl TreeWalker {
    /// Create a walker with its own thread pool
    pub fn new(config: WalkerConfig) -> Result<Self, StorageError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("treeswap-hash-{}", i));
        if let Some(workers) = config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build().map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to build hashing thread pool: {}", e),
            ))
        })?;

        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Walk `root` and hash every regular file beneath it.
    ///
    /// Blocks until all discovered work, including work discovered after the
    /// walk started, has finished. Must not be called from inside the walker's
    /// own pool.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn walk(&self, root: &Path) -> Result<WalkOutcome, StorageError> {
        let start = Instant::now();
        let root = path::canonicalize_root(root)?;
        let metadata = fs::metadata(&root)?;
        info!(workers = self.worker_count(), "Starting tree walk");

        let state = Arc::new(ScanState {
            barrier: FanOutBarrier::new(),
            inventory: DashMap::new(),
            files: AtomicUsize::new(0),
            directories: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            config: self.config.clone(),
        });

        let unit = FileRef {
            path: root.clone(),
            is_dir: metadata.is_dir(),
        };
        state.barrier.register();
        spawn_unit(&self.pool, &state, unit);
        state.barrier.await_zero();

        let inventory: HashInventory = state
            .inventory
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        let stats = WalkStats {
            files: state.files.load(Ordering::Relaxed),
            directories: state.directories.load(Ordering::Relaxed),
            failures: state.failures.load(Ordering::Relaxed),
            skipped: state.skipped.load(Ordering::Relaxed),
            barrier: state.barrier.stats(),
        };

        info!(
            files = stats.files,
            directories = stats.directories,
            failures = stats.failures,
            duration_ms = start.elapsed().as_millis(),
            "Tree walk completed"
        );

        Ok(WalkOutcome {
            root,
            inventory,
            stats,
        })
    }
}

fn spawn_unit(pool: &Arc<ThreadPool>, state: &Arc<ScanState>, unit: FileRef) {
    let task_pool = Arc::clone(pool);
    let state = Arc::clone(state);
    pool.spawn(move || process_unit(&task_pool, &state, unit));
}

fn process_unit(pool: &Arc<ThreadPool>, state: &Arc<ScanState>, unit: FileRef) {
    let _arrival = Arrival(&state.barrier);

    if unit.is_dir {
        expand_directory(pool, state, &unit.path);
    } else {
        hash_into_inventory(state, unit.path);
    }
}

fn expand_directory(pool: &Arc<ThreadPool>, state: &Arc<ScanState>, dir: &Path) {
    state.directories.fetch_add(1, Ordering::Relaxed);

    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to list directory");
            state.failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let mut children = Vec::new();
    for entry in listing {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                state.failures.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        match classify_entry(&entry.path(), &state.config) {
            Ok(Some(child)) => children.push(child),
            Ok(None) => {
                state.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to stat entry");
                state.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // Children are registered while this directory is still outstanding.
    state.barrier.register_many(children.len());
    for child in children {
        spawn_unit(pool, state, child);
    }
}

fn classify_entry(path: &Path, config: &WalkerConfig) -> std::io::Result<Option<FileRef>> {
    let file_type = fs::symlink_metadata(path)?.file_type();

    if file_type.is_dir() {
        return Ok(Some(FileRef {
            path: path.to_path_buf(),
            is_dir: true,
        }));
    }
    if file_type.is_file() {
        return Ok(Some(FileRef {
            path: path.to_path_buf(),
            is_dir: false,
        }));
    }
    if file_type.is_symlink() && config.follow_symlinks && fs::metadata(path)?.is_file() {
        return Ok(Some(FileRef {
            path: path.to_path_buf(),
            is_dir: false,
        }));
    }

    debug!(path = %path.display(), "Skipping symlink or special file");
    Ok(None)
}

fn hash_into_inventory(state: &ScanState, file: PathBuf) {
    match hasher::hash_file(&file, state.config.chunk_size) {
        Ok(digest) => {
            state.files.fetch_add(1, Ordering::Relaxed);
            state.inventory.insert(file, digest);
        }
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Skipping file that could not be hashed");
            state.failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}
