//! Relocator: move changed and added files into the backup area
//!
//! Each relocated file lands at its relative path under the backup root.
//! For changed files the pristine baseline copy is preserved at the baseline's
//! own relative path plus a suffix. Afterwards directories left empty in the working tree are pruned
//! bottom-up.

use crate::reconcile::{Classification, ClassifiedEntry, Reconciliation};
use crate::tree::path;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};
use walkdir::WalkDir;

/// Default suffix for preserved baseline copies
pub const DEFAULT_ORIGINAL_SUFFIX: &str = "_orig";

/// What happened to one classified entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    /// Added file moved into the backup area
    Moved { destination: PathBuf },
    /// Changed file moved, baseline copy preserved beside it
    MovedWithOriginal {
        destination: PathBuf,
        original: PathBuf,
    },
    /// Changed file moved, but the baseline copy could not be made
    MovedOriginalUnavailable { destination: PathBuf, reason: String },
    /// Nothing moved
    Skipped { reason: String },
    /// Dry run: the move that would have happened
    Planned { destination: PathBuf },
}

impl EntryOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(
            self,
            EntryOutcome::Moved { .. }
                | EntryOutcome::MovedWithOriginal { .. }
                | EntryOutcome::MovedOriginalUnavailable { .. }
        )
    }
}

/// Outcome of one classified entry
#[derive(Debug, Clone, Serialize)]
pub struct RelocationRecord {
    pub relative_path: PathBuf,
    pub classification: Classification,
    pub outcome: EntryOutcome,
}

/// Result of a relocation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelocationReport {
    pub records: Vec<RelocationRecord>,
    /// Empty directories removed from the working tree
    pub pruned_directories: usize,
}

impl RelocationReport {
    pub fn moved(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_moved()).count()
    }

    pub fn skipped(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Skipped { .. }))
            .count()
    }
}

/// Executes the backup action implied by each classification
pub struct Relocator {
    working_root: PathBuf,
    backup_root: PathBuf,
    /// Baseline tree root, so preserved copies keep the baseline's own name
    baseline_root: Option<PathBuf>,
    original_suffix: String,
    dry_run: bool,
}

impl Relocator {
    pub fn new(working_root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            working_root: working_root.into(),
            backup_root: backup_root.into(),
            baseline_root: None,
            original_suffix: DEFAULT_ORIGINAL_SUFFIX.to_string(),
            dry_run: false,
        }
    }

    pub fn with_baseline_root(mut self, baseline_root: impl Into<PathBuf>) -> Self {
        self.baseline_root = Some(baseline_root.into());
        self
    }

    pub fn with_original_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.original_suffix = suffix.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Relocate every classified entry, then prune empty working directories.
    ///
    /// Per-entry failures are logged and recorded; they never stop the pass.
    #[instrument(skip_all, fields(backup = %self.backup_root.display(), dry_run = self.dry_run))]
    pub fn relocate(&self, reconciliation: &Reconciliation) -> RelocationReport {
        let mut report = RelocationReport::default();

        for entry in &reconciliation.entries {
            let outcome = self.relocate_entry(entry);
            report.records.push(RelocationRecord {
                relative_path: entry.relative_path.clone(),
                classification: entry.classification.clone(),
                outcome,
            });
        }

        if !self.dry_run {
            report.pruned_directories = prune_empty_dirs(&self.working_root);
        }

        info!(
            moved = report.moved(),
            skipped = report.skipped(),
            pruned = report.pruned_directories,
            "Relocation completed"
        );
        report
    }

    fn relocate_entry(&self, entry: &ClassifiedEntry) -> EntryOutcome {
        let destination = self.backup_root.join(&entry.relative_path);

        if matches!(entry.classification, Classification::Unchanged) {
            return EntryOutcome::Skipped {
                reason: "unchanged".to_string(),
            };
        }
        if self.dry_run {
            return EntryOutcome::Planned { destination };
        }

        if let Some(parent) = destination.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!(path = %parent.display(), error = %e, "Failed to create backup directory");
                return EntryOutcome::Skipped {
                    reason: format!("cannot create {}: {}", parent.display(), e),
                };
            }
        }

        let preserved = match &entry.classification {
            Classification::Changed { baseline } => {
                Some(self.preserve_original(baseline, &entry.relative_path))
            }
            _ => None,
        };

        if let Err(e) = move_file(&entry.working_path, &destination) {
            error!(
                path = %entry.working_path.display(),
                error = %e,
                "Failed to move file into backup"
            );
            return EntryOutcome::Skipped {
                reason: format!("move failed: {}", e),
            };
        }
        info!(
            path = %entry.relative_path.display(),
            destination = %destination.display(),
            "Moved file into backup"
        );

        match preserved {
            None => EntryOutcome::Moved { destination },
            Some(Ok(original)) => EntryOutcome::MovedWithOriginal {
                destination,
                original,
            },
            Some(Err(reason)) => EntryOutcome::MovedOriginalUnavailable {
                destination,
                reason,
            },
        }
    }

    /// Where the preserved copy of `baseline` goes: its path relative to the
    /// baseline root (falling back to the working relative path) plus the suffix
    fn original_target(&self, baseline: &Path, working_relative: &Path) -> PathBuf {
        let relative = self
            .baseline_root
            .as_deref()
            .and_then(|root| path::relative_to(root, baseline))
            .unwrap_or_else(|| working_relative.to_path_buf());
        with_suffix(&self.backup_root.join(relative), &self.original_suffix)
    }

    /// Copy the baseline file into the backup area under the original suffix
    fn preserve_original(&self, baseline: &Path, working_relative: &Path) -> Result<PathBuf, String> {
        let target = self.original_target(baseline, working_relative);
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create directory for original copy");
                return Err(format!("cannot create {}: {}", parent.display(), e));
            }
        }
        match fs::copy(baseline, &target) {
            Ok(_) => Ok(target),
            Err(e) => {
                warn!(
                    baseline = %baseline.display(),
                    target = %target.display(),
                    error = %e,
                    "Unable to copy original file"
                );
                Err(format!("cannot copy original {}: {}", baseline.display(), e))
            }
        }
    }
}

/// `file.ext` -> `file.ext<suffix>`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Move `src` to `dst`, replacing any existing file.
///
/// Falls back to copy and delete when a rename is not possible, for example
/// across filesystems.
fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !src.is_file() {
                return Err(rename_err);
            }
            fs::copy(src, dst)?;
            fs::remove_file(src)
        }
    }
}

/// Remove every directory under `root` that has no entries, deepest first.
///
/// A directory emptied by the removal of its last child is removed too. The
/// root itself is kept. Returns the number of directories removed.
pub fn prune_empty_dirs(root: &Path) -> usize {
    if !root.exists() {
        info!(path = %root.display(), "Directory has already been deleted");
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Failed to visit entry while pruning");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let is_empty = match fs::read_dir(path) {
            Ok(mut listing) => listing.next().is_none(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to list directory while pruning");
                false
            }
        };
        if !is_empty {
            continue;
        }

        match fs::remove_dir(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove empty directory"),
        }
    }
    removed
}
