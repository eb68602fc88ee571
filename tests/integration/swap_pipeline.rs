//! End-to-end tests for the swap pipeline

use super::test_utils::{list_files, read, request, swapper, write_tree};
use std::fs;
use tempfile::TempDir;
use treeswap::cli::format_swap_text;
use treeswap::error::RunError;
use treeswap::relocate::EntryOutcome;
use treeswap::snapshot::{load_snapshot, DEFAULT_SNAPSHOT_FILE};
use treeswap::swap::BaselineKind;

#[test]
fn test_added_file_moved_and_unchanged_file_kept() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1"), ("a/y.txt", "h2")]);
    write_tree(&root.join("mod"), &[("a/x.txt", "h1"), ("a/z.txt", "h3")]);

    let summary = swapper().run(&request(root, Some("orig"))).unwrap();

    let reconciliation = &summary.diff.reconciliation;
    assert_eq!(reconciliation.unchanged, 1);
    assert_eq!(reconciliation.added().count(), 1);
    assert_eq!(reconciliation.changed().count(), 0);
    assert_eq!(summary.diff.baseline, BaselineKind::Live);

    assert_eq!(list_files(&root.join("mod")), vec!["a/x.txt"]);
    assert_eq!(read(root.join("backup/a/z.txt")), "h3");
    assert!(!root.join("backup/a/y.txt").exists());
    // The baseline is read-only to the pipeline
    assert_eq!(list_files(&root.join("orig")), vec!["a/x.txt", "a/y.txt"]);

    assert_eq!(summary.snapshot_records, Some(2));
    let snapshot = load_snapshot(&root.join("backup").join(DEFAULT_SNAPSHOT_FILE))
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.inventory.len(), 2);
}

#[test]
fn test_changed_file_moved_with_original_copy() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("data/config.ini", "original")]);
    write_tree(&root.join("mod"), &[("data/config.ini", "modified")]);

    let summary = swapper().run(&request(root, Some("orig"))).unwrap();

    assert_eq!(summary.relocation.moved(), 1);
    assert!(matches!(
        summary.relocation.records[0].outcome,
        EntryOutcome::MovedWithOriginal { .. }
    ));
    assert_eq!(read(root.join("backup/data/config.ini")), "modified");
    assert_eq!(read(root.join("backup/data/config.ini_orig")), "original");
    assert!(!root.join("mod/data").exists());
    assert!(root.join("mod").is_dir());
}

#[test]
fn test_second_run_is_clean_and_uses_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1"), ("b/y.txt", "h2")]);
    write_tree(
        &root.join("mod"),
        &[("a/x.txt", "h1"), ("b/y.txt", "changed"), ("c/new.txt", "n")],
    );

    let swapper = swapper();
    let first = swapper.run(&request(root, Some("orig"))).unwrap();
    assert_eq!(first.relocation.moved(), 2);

    let second = swapper.run(&request(root, None)).unwrap();
    assert_eq!(second.diff.baseline, BaselineKind::Snapshot);
    assert!(second.diff.reconciliation.is_clean());
    assert_eq!(second.diff.reconciliation.unchanged, 1);
    assert!(second.relocation.records.is_empty());
}

#[test]
fn test_snapshot_outlives_deleted_baseline() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1")]);
    write_tree(&root.join("mod"), &[("a/x.txt", "h1")]);

    let swapper = swapper();
    swapper.run(&request(root, Some("orig"))).unwrap();
    fs::remove_dir_all(root.join("orig")).unwrap();
    fs::write(root.join("mod/a/x.txt"), "edited later").unwrap();

    let summary = swapper.run(&request(root, None)).unwrap();

    assert_eq!(summary.diff.reconciliation.changed().count(), 1);
    assert!(matches!(
        summary.relocation.records[0].outcome,
        EntryOutcome::MovedOriginalUnavailable { .. }
    ));
    assert_eq!(read(root.join("backup/a/x.txt")), "edited later");
    assert!(!root.join("backup/a/x.txt_orig").exists());
}

#[test]
fn test_nested_empty_directories_pruned() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("keep.txt", "k")]);
    write_tree(
        &root.join("mod"),
        &[("keep.txt", "k"), ("deep/nested/tree/only.txt", "added")],
    );
    fs::create_dir_all(root.join("mod/already/empty")).unwrap();

    let summary = swapper().run(&request(root, Some("orig"))).unwrap();

    assert!(!root.join("mod/deep").exists());
    assert!(!root.join("mod/already").exists());
    assert_eq!(summary.relocation.pruned_directories, 5);
    assert_eq!(list_files(&root.join("mod")), vec!["keep.txt"]);
    assert_eq!(
        read(root.join("backup/deep/nested/tree/only.txt")),
        "added"
    );
}

#[test]
fn test_matching_ignores_case() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("Data/Foo.txt", "same")]);
    write_tree(&root.join("mod"), &[("data/foo.txt", "same")]);

    let summary = swapper().run(&request(root, Some("orig"))).unwrap();

    assert!(summary.diff.reconciliation.is_clean());
    assert_eq!(summary.diff.reconciliation.unchanged, 1);
    assert_eq!(list_files(&root.join("mod")), vec!["data/foo.txt"]);
}

#[test]
fn test_missing_baseline_aborts_before_mutation() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("mod"), &[("a/z.txt", "h3")]);

    let result = swapper().run(&request(root, None));

    assert!(matches!(result, Err(RunError::MissingBaseline { .. })));
    assert_eq!(list_files(&root.join("mod")), vec!["a/z.txt"]);
    assert!(!root.join("backup").exists());
}

#[test]
fn test_dry_run_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1")]);
    write_tree(&root.join("mod"), &[("a/x.txt", "h2"), ("b/new.txt", "n")]);

    let mut req = request(root, Some("orig"));
    req.dry_run = true;
    let summary = swapper().run(&req).unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.relocation.records.len(), 2);
    assert!(summary
        .relocation
        .records
        .iter()
        .all(|r| matches!(r.outcome, EntryOutcome::Planned { .. })));
    assert_eq!(summary.snapshot_records, None);
    assert_eq!(list_files(&root.join("mod")), vec!["a/x.txt", "b/new.txt"]);
    assert!(!root.join("backup").exists());
}

#[test]
fn test_snapshot_command_then_swap_without_baseline() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1"), ("a/y.txt", "h2")]);
    write_tree(&root.join("mod"), &[("a/x.txt", "h1"), ("a/y.txt", "other")]);

    let swapper = swapper();
    let written = swapper
        .write_snapshot_only(root, "orig".as_ref(), "backup".as_ref())
        .unwrap();
    assert_eq!(written.records, 2);
    assert_eq!(written.stats.files, 2);

    let summary = swapper.run(&request(root, None)).unwrap();
    assert_eq!(summary.diff.baseline, BaselineKind::Snapshot);
    assert_eq!(summary.diff.reconciliation.changed().count(), 1);
    assert_eq!(read(root.join("backup/a/y.txt_orig")), "h2");
}

#[test]
fn test_diff_reports_without_moving() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1"), ("a/y.txt", "h2")]);
    write_tree(&root.join("mod"), &[("a/x.txt", "h1"), ("a/z.txt", "h3")]);

    let report = swapper().diff(&request(root, Some("orig"))).unwrap();

    assert_eq!(report.reconciliation.unchanged, 1);
    let added: Vec<_> = report.reconciliation.added().collect();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].relative_path, std::path::Path::new("a").join("z.txt"));
    assert_eq!(report.working_stats.files, 2);
    assert_eq!(report.baseline_stats.map(|s| s.files), Some(2));
    assert!(root.join("mod/a/z.txt").exists());
    assert!(!root.join("backup").exists());
}

#[test]
fn test_incomplete_snapshot_withholds_delete_message() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_tree(&root.join("orig"), &[("a/x.txt", "h1"), ("a/with,comma.txt", "c")]);
    write_tree(&root.join("mod"), &[("a/x.txt", "h1")]);

    let summary = swapper().run(&request(root, Some("orig"))).unwrap();

    assert_eq!(summary.snapshot_records, Some(1));
    assert!(summary.snapshot_error.is_some());
    let text = format_swap_text(&summary, false);
    assert!(text.contains("[WARNING] Baseline snapshot not fully written"));
    assert!(!text.contains("You may now delete your original installation files"));
}
