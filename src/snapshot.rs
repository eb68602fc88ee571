//! Baseline snapshot persistence
//!
//! One record per baseline file, one record per line:
//!
//! ```text
//! <treeRoot>,<baselineSubPath>,<relativeFilePath>,<digestHex>
//! ```
//!
//! The relative file path starts with `/`, so joining tree root, baseline
//! sub-path and relative path gives back the absolute path that was hashed.
//! Fields are not escaped; a path containing a comma or a line break cannot
//! be represented. Such entries are left out when writing, and a line with
//! extra fields is rejected when loading.

use crate::error::StorageError;
use crate::inventory::HashInventory;
use crate::tree::hasher::Digest;
use crate::tree::path;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default snapshot file name inside the backup directory
pub const DEFAULT_SNAPSHOT_FILE: &str = "origFiles.csv";

const FIELD_COUNT: usize = 4;

/// On-disk form of one baseline inventory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub tree_root: String,
    pub baseline_sub_path: String,
    /// Relative file path with a leading `/`
    pub relative_path: String,
    pub digest: Digest,
}

impl SnapshotRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}",
            self.tree_root,
            self.baseline_sub_path,
            self.relative_path,
            self.digest.to_hex()
        )
    }

    /// Parse one line. `line_no` is 1-based and only used for errors.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, StorageError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(StorageError::MalformedSnapshot {
                line: line_no,
                reason: format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
            });
        }

        let digest = Digest::from_hex(fields[3].trim()).map_err(|e| {
            StorageError::MalformedSnapshot {
                line: line_no,
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            tree_root: fields[0].to_string(),
            baseline_sub_path: fields[1].to_string(),
            relative_path: fields[2].to_string(),
            digest,
        })
    }

    /// Root of the baseline tree this record belongs to
    pub fn baseline_root(&self) -> PathBuf {
        join_portable(Path::new(&self.tree_root), &self.baseline_sub_path)
    }

    /// Absolute path of the hashed file
    pub fn absolute_path(&self) -> PathBuf {
        join_portable(&self.baseline_root(), &self.relative_path)
    }
}

/// Join `/`- or `\`-separated components onto `base` with the platform separator
fn join_portable(base: &Path, relative: &str) -> PathBuf {
    path::normalize_separators(relative)
        .split('/')
        .filter(|c| !c.is_empty())
        .fold(base.to_path_buf(), |acc, c| acc.join(c))
}

/// A snapshot read back from disk
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    /// Tree root recorded in the snapshot (None for an empty snapshot)
    pub tree_root: Option<PathBuf>,
    /// Baseline sub-path recorded in the snapshot (None for an empty snapshot)
    pub baseline_sub_path: Option<PathBuf>,
    pub inventory: HashInventory,
}

impl LoadedSnapshot {
    pub fn baseline_root(&self) -> Option<PathBuf> {
        match (&self.tree_root, &self.baseline_sub_path) {
            (Some(root), Some(sub)) => Some(root.join(sub)),
            _ => None,
        }
    }
}

/// Snapshot location for a tree root and backup directory name
pub fn snapshot_path(tree_root: &Path, backup_name: &Path, file_name: &str) -> PathBuf {
    tree_root.join(backup_name).join(file_name)
}

/// Persist `inventory` as snapshot records.
///
/// `baseline_root` is the prefix stripped from inventory paths (the canonical
/// root the walker reported); `tree_root` and `baseline_sub` are only the
/// field values. Entries outside `baseline_root`, or whose path cannot be
/// stored on one line, are logged and left out. Returns the number of records
/// written.
///
/// The file is written beside the target and renamed into place, so an
/// interrupted write leaves the previous snapshot intact.
pub fn write_snapshot(
    snapshot: &Path,
    tree_root: &Path,
    baseline_sub: &Path,
    baseline_root: &Path,
    inventory: &HashInventory,
) -> Result<usize, StorageError> {
    let root_field = tree_root.to_string_lossy().to_string();
    let sub_field = path::display_relative(baseline_sub);
    check_field(&root_field)?;
    check_field(&sub_field)?;

    if let Some(parent) = snapshot.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(snapshot);
    let written = match write_records(&temp_path, &root_field, &sub_field, baseline_root, inventory)
    {
        Ok(written) => written,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
    };

    fs::rename(&temp_path, snapshot).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to move snapshot into place at {:?}: {}", snapshot, e),
        ))
    })?;

    info!(path = %snapshot.display(), records = written, "Baseline snapshot written");
    Ok(written)
}

fn write_records(
    temp_path: &Path,
    root_field: &str,
    sub_field: &str,
    baseline_root: &Path,
    inventory: &HashInventory,
) -> std::io::Result<usize> {
    let mut writer = BufWriter::new(File::create(temp_path)?);
    let mut written = 0;

    for (absolute, digest) in inventory.iter() {
        let Some(relative) = path::relative_to(baseline_root, absolute) else {
            warn!(path = %absolute.display(), "Entry outside baseline root not written to snapshot");
            continue;
        };
        let relative_field = format!("/{}", path::display_relative(&relative));
        if !is_storable(&relative_field) {
            warn!(path = ?absolute, "Path contains a comma or line break and cannot be stored in the snapshot");
            continue;
        }

        let record = SnapshotRecord {
            tree_root: root_field.to_string(),
            baseline_sub_path: sub_field.to_string(),
            relative_path: relative_field,
            digest: *digest,
        };
        writeln!(writer, "{}", record.to_line())?;
        written += 1;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(written)
}

/// `origFiles.csv` -> `origFiles.csv.tmp`
fn temp_path_for(snapshot: &Path) -> PathBuf {
    let mut name: OsString = snapshot.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    snapshot.with_file_name(name)
}

/// A field may not contain the separator or a line break
fn is_storable(field: &str) -> bool {
    !field.contains(&[',', '\n', '\r'][..])
}

fn check_field(field: &str) -> Result<(), StorageError> {
    if !is_storable(field) {
        return Err(StorageError::InvalidPath(format!(
            "{:?} contains a comma or line break and cannot be stored in a snapshot",
            field
        )));
    }
    Ok(())
}

/// Load a snapshot. A missing file is `Ok(None)`, not an error.
///
/// All records must name the same tree root and baseline sub-path.
pub fn load_snapshot(snapshot: &Path) -> Result<Option<LoadedSnapshot>, StorageError> {
    let file = match File::open(snapshot) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %snapshot.display(), "No baseline snapshot");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut origin: Option<(String, String)> = None;
    let mut inventory = HashInventory::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let line_no = index + 1;
        let record = SnapshotRecord::parse_line(line, line_no)?;

        let (root, sub) = origin
            .get_or_insert_with(|| (record.tree_root.clone(), record.baseline_sub_path.clone()));
        if *root != record.tree_root || *sub != record.baseline_sub_path {
            return Err(StorageError::MalformedSnapshot {
                line: line_no,
                reason: format!(
                    "record names baseline {},{} but earlier records name {},{}",
                    record.tree_root, record.baseline_sub_path, root, sub
                ),
            });
        }

        inventory.insert(record.absolute_path(), record.digest);
    }

    info!(path = %snapshot.display(), records = inventory.len(), "Baseline snapshot loaded");

    let (tree_root, baseline_sub_path) = match origin {
        Some((root, sub)) => (
            Some(PathBuf::from(root)),
            Some(join_portable(Path::new(""), &sub)),
        ),
        None => (None, None),
    };

    Ok(Some(LoadedSnapshot {
        tree_root,
        baseline_sub_path,
        inventory,
    }))
}
