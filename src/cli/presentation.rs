//! CLI presentation: status lines, tables and JSON for pipeline results.

use crate::error::RunError;
use crate::reconcile::{Classification, ClassifiedEntry};
use crate::relocate::{EntryOutcome, RelocationRecord};
use crate::swap::{BaselineKind, DiffReport, SnapshotSummary, SwapSummary};
use crate::tree::path::display_relative;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

#[derive(Clone, Copy)]
enum Severity {
    Info,
    Warning,
    Error,
    DryRun,
}

fn tag(severity: Severity, color: bool) -> String {
    let label = match severity {
        Severity::Info => "[INFO]",
        Severity::Warning => "[WARNING]",
        Severity::Error => "[ERROR]",
        Severity::DryRun => "[DRY RUN]",
    };
    if !color {
        return label.to_string();
    }
    match severity {
        Severity::Info => label.green().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Error => label.red().bold().to_string(),
        Severity::DryRun => label.cyan().to_string(),
    }
}

/// One human-readable status line for a relocated (or skipped) file.
pub fn status_line(record: &RelocationRecord, color: bool) -> String {
    let rel = display_relative(&record.relative_path);
    match &record.outcome {
        EntryOutcome::Moved { .. } => format!(
            "{} No corresponding file found for path {}, so moving file to backup directory.",
            tag(Severity::Info, color),
            rel
        ),
        EntryOutcome::MovedWithOriginal { .. } => format!(
            "{} Content mismatch for file {}, so copying original and moving modified file to backup directory.",
            tag(Severity::Info, color),
            rel
        ),
        EntryOutcome::MovedOriginalUnavailable { reason, .. } => format!(
            "{} Content mismatch for file {}; modified file moved to backup directory but the original could not be copied: {}",
            tag(Severity::Warning, color),
            rel,
            reason
        ),
        EntryOutcome::Skipped { reason } => format!(
            "{} Could not move {} to backup directory: {}",
            tag(Severity::Error, color),
            rel,
            reason
        ),
        EntryOutcome::Planned { destination } => {
            let action = match record.classification {
                Classification::Changed { .. } => "changed",
                _ => "added",
            };
            format!(
                "{} Would move {} file {} to {}",
                tag(Severity::DryRun, color),
                action,
                rel,
                destination.display()
            )
        }
    }
}

/// Status lines plus a completion summary for a swap run.
pub fn format_swap_text(summary: &SwapSummary, color: bool) -> String {
    let mut out = String::new();
    for record in &summary.relocation.records {
        out.push_str(&status_line(record, color));
        out.push('\n');
    }

    let reconciliation = &summary.diff.reconciliation;
    if reconciliation.is_clean() {
        out.push_str("No changed or added files found.\n");
    }

    if summary.dry_run {
        out.push_str(&format!(
            "Dry run complete: {} changed, {} added, {} unchanged. Nothing was moved.\n",
            reconciliation.changed().count(),
            reconciliation.added().count(),
            reconciliation.unchanged
        ));
        return out;
    }

    out.push_str(&format!(
        "Swap complete: {} moved, {} skipped, {} unchanged, {} empty directories removed ({} ms).\n",
        summary.relocation.moved(),
        summary.relocation.skipped(),
        reconciliation.unchanged,
        summary.relocation.pruned_directories,
        summary.duration_ms
    ));

    match (&summary.snapshot_records, &summary.snapshot_error) {
        (_, Some(error)) => out.push_str(&format!(
            "{} Baseline snapshot not fully written ({}); keep your original installation files.\n",
            tag(Severity::Warning, color),
            error
        )),
        (Some(_), None) if summary.diff.baseline == BaselineKind::Live => {
            out.push_str("You may now delete your original installation files.\n")
        }
        _ => {}
    }
    out
}

pub fn format_swap_json(summary: &SwapSummary) -> Result<String, RunError> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| RunError::InvalidRequest(format!("JSON serialization: {}", e)))
}

fn classification_label(entry: &ClassifiedEntry) -> &'static str {
    match entry.classification {
        Classification::Unchanged => "unchanged",
        Classification::Changed { .. } => "changed",
        Classification::Added => "added",
    }
}

/// Table of changed and added files with a counts footer.
pub fn format_diff_text(report: &DiffReport) -> String {
    let mut out = String::new();
    let baseline = match report.baseline {
        BaselineKind::Snapshot => "snapshot",
        BaselineKind::Live => "live",
    };
    out.push_str(&format!("Working tree: {}\n", report.working_root.display()));
    out.push_str(&format!(
        "Baseline: {} ({})\n\n",
        report.baseline_root.display(),
        baseline
    ));

    let reconciliation = &report.reconciliation;
    if reconciliation.is_clean() {
        out.push_str("No changed or added files.\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Path", "Status"]);
        for entry in &reconciliation.entries {
            table.add_row(vec![
                display_relative(&entry.relative_path),
                classification_label(entry).to_string(),
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }

    out.push_str(&format!(
        "\n{} changed, {} added, {} unchanged",
        reconciliation.changed().count(),
        reconciliation.added().count(),
        reconciliation.unchanged
    ));
    if report.working_stats.failures > 0 {
        out.push_str(&format!(
            ", {} unreadable",
            report.working_stats.failures
        ));
    }
    out.push('\n');
    out
}

pub fn format_diff_json(report: &DiffReport) -> Result<String, RunError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| RunError::InvalidRequest(format!("JSON serialization: {}", e)))
}

pub fn format_snapshot_summary(summary: &SnapshotSummary) -> String {
    let mut out = format!(
        "Snapshot written: {} ({} records from {} directories)\n",
        summary.snapshot_path.display(),
        summary.records,
        summary.stats.directories
    );
    if summary.skipped > 0 {
        out.push_str(&format!(
            "{} files have names that cannot be stored in the snapshot and were left out.\n",
            summary.skipped
        ));
    }
    if summary.stats.failures > 0 {
        out.push_str(&format!(
            "{} files could not be read and were left out.\n",
            summary.stats.failures
        ));
    }
    out
}
