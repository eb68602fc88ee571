//! End-to-end swap pipeline
//!
//! Resolves the baseline (persisted snapshot or live hashing), hashes the
//! working tree, reconciles both inventories, relocates changed and added
//! files into the backup area and persists the baseline snapshot for the next
//! run. Everything that can fail for configuration reasons is checked before
//! the first filesystem mutation.

use crate::config::TreeswapConfig;
use crate::error::RunError;
use crate::inventory::HashInventory;
use crate::reconcile::{Reconciler, Reconciliation};
use crate::relocate::{RelocationReport, Relocator};
use crate::snapshot::{self, LoadedSnapshot};
use crate::tree::path;
use crate::tree::walker::{TreeWalker, WalkOutcome, WalkStats};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// One invocation of the pipeline
#[derive(Debug, Clone)]
pub struct SwapRequest {
    /// Directory containing the working tree, the backup area and optionally the baseline
    pub root: PathBuf,
    /// Working tree, relative to `root`
    pub working_sub: PathBuf,
    /// Backup directory name under `root`
    pub backup_name: PathBuf,
    /// Baseline tree relative to `root`; required when no snapshot exists yet
    pub baseline_sub: Option<PathBuf>,
    /// Hash and classify only; never touch the filesystem
    pub dry_run: bool,
}

/// Where the baseline inventory comes from
#[derive(Debug, Clone)]
pub enum BaselineSource {
    /// A snapshot left by a previous run
    Snapshot {
        path: PathBuf,
        snapshot: LoadedSnapshot,
    },
    /// Hash the baseline tree now
    Live { root: PathBuf, sub_path: PathBuf },
}

impl BaselineSource {
    pub fn kind(&self) -> BaselineKind {
        match self {
            BaselineSource::Snapshot { .. } => BaselineKind::Snapshot,
            BaselineSource::Live { .. } => BaselineKind::Live,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineKind {
    Snapshot,
    Live,
}

/// Validated, canonical locations for a request
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub working_root: PathBuf,
    pub backup_root: PathBuf,
    pub snapshot_path: PathBuf,
}

/// Baseline inventory ready for reconciliation
#[derive(Debug, Clone)]
struct Baseline {
    kind: BaselineKind,
    /// Prefix stripped from baseline paths
    root: PathBuf,
    /// Fields recorded in the snapshot
    tree_root: PathBuf,
    sub_path: PathBuf,
    inventory: HashInventory,
    stats: Option<WalkStats>,
}

/// Hashing and classification result
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub working_root: PathBuf,
    pub baseline_root: PathBuf,
    pub baseline: BaselineKind,
    pub working_stats: WalkStatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_stats: Option<WalkStatsSummary>,
    pub reconciliation: Reconciliation,
}

/// Serializable subset of [`WalkStats`]
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WalkStatsSummary {
    pub files: usize,
    pub directories: usize,
    pub failures: usize,
}

impl From<&WalkStats> for WalkStatsSummary {
    fn from(stats: &WalkStats) -> Self {
        Self {
            files: stats.files,
            directories: stats.directories,
            failures: stats.failures,
        }
    }
}

/// Result of a full run
#[derive(Debug, Clone, Serialize)]
pub struct SwapSummary {
    pub diff: DiffReport,
    pub backup_root: PathBuf,
    pub relocation: RelocationReport,
    /// Records written to the snapshot (None on dry runs or write failure)
    pub snapshot_records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_error: Option<String>,
    pub dry_run: bool,
    pub duration_ms: u128,
}

/// Result of hashing a baseline into a snapshot without a swap
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub snapshot_path: PathBuf,
    pub records: usize,
    /// Hashed files that could not be recorded
    pub skipped: usize,
    pub stats: WalkStatsSummary,
}

/// Runs the pipeline with one shared hashing pool
pub struct Swapper {
    config: TreeswapConfig,
    walker: TreeWalker,
}

impl Swapper {
    /// Validate configuration and build the hashing pool
    pub fn new(config: TreeswapConfig) -> Result<Self, RunError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            RunError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        let walker = TreeWalker::new(config.hashing.walker_config())?;
        Ok(Self { config, walker })
    }

    pub fn config(&self) -> &TreeswapConfig {
        &self.config
    }

    /// Check the request and resolve its canonical locations
    pub fn resolve_paths(&self, request: &SwapRequest) -> Result<ResolvedPaths, RunError> {
        require_single_component("backup name", &request.backup_name)?;
        require_relative("working sub-path", &request.working_sub)?;

        let root = path::canonicalize_root(&request.root).map_err(|_| {
            RunError::InvalidRequest(format!(
                "root directory {} does not exist",
                request.root.display()
            ))
        })?;
        let working_root = canonical_dir(&root, &request.working_sub, "working tree")?;
        let backup_root = root.join(&request.backup_name);

        if working_root == root
            || backup_root.starts_with(&working_root)
            || working_root.starts_with(&backup_root)
        {
            return Err(RunError::InvalidRequest(format!(
                "backup directory {} overlaps the working tree {}",
                backup_root.display(),
                working_root.display()
            )));
        }

        let snapshot_path = snapshot::snapshot_path(
            &root,
            &request.backup_name,
            &self.config.relocation.snapshot_file,
        );

        Ok(ResolvedPaths {
            root,
            working_root,
            backup_root,
            snapshot_path,
        })
    }

    /// Decide where the baseline comes from. Never mutates the filesystem.
    pub fn plan_baseline(
        &self,
        request: &SwapRequest,
        paths: &ResolvedPaths,
    ) -> Result<BaselineSource, RunError> {
        if let Some(snapshot) = snapshot::load_snapshot(&paths.snapshot_path)? {
            if let Some(sub) = &request.baseline_sub {
                info!(
                    baseline = %sub.display(),
                    snapshot = %paths.snapshot_path.display(),
                    "Snapshot found; ignoring the original installation sub-path"
                );
            }
            return Ok(BaselineSource::Snapshot {
                path: paths.snapshot_path.clone(),
                snapshot,
            });
        }

        let Some(sub) = &request.baseline_sub else {
            return Err(RunError::MissingBaseline {
                snapshot: paths.snapshot_path.clone(),
            });
        };
        require_relative("baseline sub-path", sub)?;

        let baseline_root = canonical_dir(&paths.root, sub, "baseline tree")?;
        if baseline_root.starts_with(&paths.working_root)
            || paths.working_root.starts_with(&baseline_root)
        {
            return Err(RunError::InvalidRequest(format!(
                "baseline tree {} overlaps the working tree {}",
                baseline_root.display(),
                paths.working_root.display()
            )));
        }
        if baseline_root.starts_with(&paths.backup_root)
            || paths.backup_root.starts_with(&baseline_root)
        {
            return Err(RunError::InvalidRequest(format!(
                "baseline tree {} overlaps the backup directory {}",
                baseline_root.display(),
                paths.backup_root.display()
            )));
        }

        Ok(BaselineSource::Live {
            root: baseline_root,
            sub_path: sub.clone(),
        })
    }

    /// Hash both trees and classify the working tree
    pub fn diff(&self, request: &SwapRequest) -> Result<DiffReport, RunError> {
        let paths = self.resolve_paths(request)?;
        let source = self.plan_baseline(request, &paths)?;
        let (report, _) = self.diff_resolved(request, &paths, source)?;
        Ok(report)
    }

    fn diff_resolved(
        &self,
        request: &SwapRequest,
        paths: &ResolvedPaths,
        source: BaselineSource,
    ) -> Result<(DiffReport, Baseline), RunError> {
        let (working, baseline) = match source {
            BaselineSource::Snapshot { snapshot, .. } => {
                let working = self.walker.walk(&paths.working_root)?;
                (working, baseline_from_snapshot(snapshot, request, paths))
            }
            BaselineSource::Live { root, sub_path } => {
                let (working, live) = self.walk_pair(&paths.working_root, &root);
                let live = live?;
                let baseline = Baseline {
                    kind: BaselineKind::Live,
                    root: live.root,
                    tree_root: paths.root.clone(),
                    sub_path,
                    inventory: live.inventory,
                    stats: Some(live.stats),
                };
                (working?, baseline)
            }
        };

        let reconciliation = Reconciler::new(&working.root, &baseline.root)
            .reconcile(&working.inventory, &baseline.inventory);

        let report = DiffReport {
            working_root: working.root.clone(),
            baseline_root: baseline.root.clone(),
            baseline: baseline.kind,
            working_stats: WalkStatsSummary::from(&working.stats),
            baseline_stats: baseline.stats.as_ref().map(WalkStatsSummary::from),
            reconciliation,
        };
        Ok((report, baseline))
    }

    /// Walk the working and baseline trees at the same time on the shared pool
    fn walk_pair(
        &self,
        working_root: &Path,
        baseline_root: &Path,
    ) -> (
        Result<WalkOutcome, crate::error::StorageError>,
        Result<WalkOutcome, crate::error::StorageError>,
    ) {
        std::thread::scope(|scope| {
            let baseline = scope.spawn(|| self.walker.walk(baseline_root));
            let working = self.walker.walk(working_root);
            let baseline = baseline
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (working, baseline)
        })
    }

    /// Run the whole pipeline
    #[instrument(skip_all, fields(root = %request.root.display(), dry_run = request.dry_run))]
    pub fn run(&self, request: &SwapRequest) -> Result<SwapSummary, RunError> {
        let start = Instant::now();

        let paths = self.resolve_paths(request)?;
        let source = self.plan_baseline(request, &paths)?;
        info!(baseline = ?source.kind(), working = %paths.working_root.display(), "Starting swap");

        let (diff, baseline) = self.diff_resolved(request, &paths, source)?;

        let relocation = Relocator::new(&paths.working_root, &paths.backup_root)
            .with_baseline_root(&baseline.root)
            .with_original_suffix(self.config.relocation.original_suffix.clone())
            .with_dry_run(request.dry_run)
            .relocate(&diff.reconciliation);

        let (snapshot_records, snapshot_error) = if request.dry_run {
            (None, None)
        } else {
            match snapshot::write_snapshot(
                &paths.snapshot_path,
                &baseline.tree_root,
                &baseline.sub_path,
                &baseline.root,
                &baseline.inventory,
            ) {
                Ok(records) if records < baseline.inventory.len() => {
                    let missing = baseline.inventory.len() - records;
                    warn!(
                        path = %paths.snapshot_path.display(),
                        records,
                        missing,
                        "Baseline snapshot is incomplete"
                    );
                    (
                        Some(records),
                        Some(format!(
                            "{} of {} baseline files could not be recorded",
                            missing,
                            baseline.inventory.len()
                        )),
                    )
                }
                Ok(records) => (Some(records), None),
                Err(e) => {
                    error!(path = %paths.snapshot_path.display(), error = %e, "Failed to write baseline snapshot");
                    (None, Some(e.to_string()))
                }
            }
        };

        let duration_ms = start.elapsed().as_millis();
        info!(
            moved = relocation.moved(),
            skipped = relocation.skipped(),
            duration_ms,
            "Swap completed"
        );

        Ok(SwapSummary {
            diff,
            backup_root: paths.backup_root,
            relocation,
            snapshot_records,
            snapshot_error,
            dry_run: request.dry_run,
            duration_ms,
        })
    }

    /// Hash a baseline tree and persist it as a snapshot, leaving every tree untouched
    pub fn write_snapshot_only(
        &self,
        root: &Path,
        baseline_sub: &Path,
        backup_name: &Path,
    ) -> Result<SnapshotSummary, RunError> {
        require_single_component("backup name", backup_name)?;
        require_relative("baseline sub-path", baseline_sub)?;

        let root = path::canonicalize_root(root).map_err(|_| {
            RunError::InvalidRequest(format!("root directory {} does not exist", root.display()))
        })?;
        let baseline_root = canonical_dir(&root, baseline_sub, "baseline tree")?;
        if root.join(backup_name).starts_with(&baseline_root) {
            return Err(RunError::InvalidRequest(format!(
                "backup directory {} is inside the baseline tree",
                root.join(backup_name).display()
            )));
        }
        let snapshot_path =
            snapshot::snapshot_path(&root, backup_name, &self.config.relocation.snapshot_file);

        let outcome = self.walker.walk(&baseline_root)?;
        let records = snapshot::write_snapshot(
            &snapshot_path,
            &root,
            baseline_sub,
            &outcome.root,
            &outcome.inventory,
        )?;
        let skipped = outcome.inventory.len() - records;
        if skipped > 0 {
            warn!(path = %snapshot_path.display(), skipped, "Baseline snapshot is incomplete");
        }

        Ok(SnapshotSummary {
            snapshot_path,
            records,
            skipped,
            stats: WalkStatsSummary::from(&outcome.stats),
        })
    }
}

fn baseline_from_snapshot(
    snapshot: LoadedSnapshot,
    request: &SwapRequest,
    paths: &ResolvedPaths,
) -> Baseline {
    let sub_path = snapshot
        .baseline_sub_path
        .clone()
        .or_else(|| request.baseline_sub.clone())
        .unwrap_or_default();
    let tree_root = snapshot
        .tree_root
        .clone()
        .unwrap_or_else(|| paths.root.clone());

    Baseline {
        kind: BaselineKind::Snapshot,
        root: tree_root.join(&sub_path),
        tree_root,
        sub_path,
        inventory: snapshot.inventory,
        stats: None,
    }
}

fn canonical_dir(root: &Path, sub: &Path, what: &str) -> Result<PathBuf, RunError> {
    let dir = path::canonicalize_root(&root.join(sub)).map_err(|_| {
        RunError::InvalidRequest(format!("{} {} does not exist", what, root.join(sub).display()))
    })?;
    if !dir.is_dir() {
        return Err(RunError::InvalidRequest(format!(
            "{} {} is not a directory",
            what,
            dir.display()
        )));
    }
    Ok(dir)
}

fn require_relative(what: &str, path: &Path) -> Result<(), RunError> {
    let valid = !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !valid {
        return Err(RunError::InvalidRequest(format!(
            "{} must be a relative path below the root, got {}",
            what,
            path.display()
        )));
    }
    Ok(())
}

fn require_single_component(what: &str, path: &Path) -> Result<(), RunError> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(RunError::InvalidRequest(format!(
            "{} must be a single directory name, got {}",
            what,
            path.display()
        ))),
    }
}
