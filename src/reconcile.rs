//! Reconciler: classify working-tree files against the baseline inventory
//!
//! Files are joined on their path relative to each tree root, compared
//! case-insensitively. A working file with no baseline counterpart is
//! `Added`; one whose digest differs is `Changed`; everything else is
//! `Unchanged` and needs no action.

use crate::inventory::HashInventory;
use crate::tree::path;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Verdict for a single working-tree file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Unchanged,
    /// Content differs from the matched baseline file
    Changed { baseline: PathBuf },
    /// No baseline file at the same relative position
    Added,
}

/// A working-tree file that needs relocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedEntry {
    pub working_path: PathBuf,
    pub relative_path: PathBuf,
    pub classification: Classification,
}

/// Output of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    /// Changed and added entries, sorted by relative path
    pub entries: Vec<ClassifiedEntry>,
    /// Working files identical to their baseline counterpart
    pub unchanged: usize,
    /// Baseline files shadowed by an earlier case-insensitive match
    pub duplicate_baseline_keys: usize,
    /// Working files that do not live under the working root
    pub unrooted: usize,
}

impl Reconciliation {
    pub fn changed(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.classification, Classification::Changed { .. }))
    }

    pub fn added(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.classification, Classification::Added))
    }

    /// True when every working file matched the baseline
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compares a working inventory against a baseline inventory
pub struct Reconciler {
    working_root: PathBuf,
    baseline_root: PathBuf,
}

impl Reconciler {
    pub fn new(working_root: impl Into<PathBuf>, baseline_root: impl Into<PathBuf>) -> Self {
        Self {
            working_root: working_root.into(),
            baseline_root: baseline_root.into(),
        }
    }

    /// Classify every working entry.
    ///
    /// When several baseline files share a case-insensitive relative path the
    /// first one in inventory order wins and the rest are reported as
    /// duplicates.
    #[instrument(skip_all, fields(working = working.len(), baseline = baseline.len()))]
    pub fn reconcile(&self, working: &HashInventory, baseline: &HashInventory) -> Reconciliation {
        let mut result = Reconciliation::default();

        let mut index: HashMap<String, (&Path, _)> = HashMap::with_capacity(baseline.len());
        for (baseline_path, digest) in baseline.iter() {
            let Some(relative) = path::relative_to(&self.baseline_root, baseline_path) else {
                warn!(path = %baseline_path.display(), "Baseline entry outside baseline root");
                continue;
            };
            let key = path::match_key(&relative);
            if let Some((kept, _)) = index.get(&key) {
                warn!(
                    path = %baseline_path.display(),
                    kept = %kept.display(),
                    "Duplicate case-insensitive baseline path ignored"
                );
                result.duplicate_baseline_keys += 1;
                continue;
            }
            index.insert(key, (baseline_path.as_path(), digest));
        }

        for (working_path, digest) in working.iter() {
            let Some(relative) = path::relative_to(&self.working_root, working_path) else {
                warn!(path = %working_path.display(), "Working entry outside working root");
                result.unrooted += 1;
                continue;
            };

            let classification = match index.get(&path::match_key(&relative)) {
                None => Classification::Added,
                Some((_, baseline_digest)) if *baseline_digest == digest => {
                    Classification::Unchanged
                }
                Some((baseline_path, _)) => Classification::Changed {
                    baseline: baseline_path.to_path_buf(),
                },
            };

            debug!(path = %relative.display(), ?classification, "Classified");
            if classification == Classification::Unchanged {
                result.unchanged += 1;
                continue;
            }
            result.entries.push(ClassifiedEntry {
                working_path: working_path.clone(),
                relative_path: relative,
                classification,
            });
        }

        result
            .entries
            .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        info!(
            changed = result.changed().count(),
            added = result.added().count(),
            unchanged = result.unchanged,
            "Reconciliation completed"
        );
        result
    }
}
