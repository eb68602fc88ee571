//! Tree walker tests: inventory totality and barrier accounting

use super::test_utils::write_tree;
use std::fs;
use tempfile::TempDir;
use treeswap::tree::hasher::{hash_bytes, hash_file, DEFAULT_CHUNK_SIZE};
use treeswap::tree::walker::{TreeWalker, WalkerConfig};

fn walker(workers: usize) -> TreeWalker {
    TreeWalker::new(WalkerConfig {
        workers: Some(workers),
        ..WalkerConfig::default()
    })
    .unwrap()
}

#[test]
fn test_wide_and_deep_tree_fully_hashed() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut files = Vec::new();
    for d in 0..8 {
        for f in 0..25 {
            files.push((format!("dir{}/file{}.dat", d, f), format!("{}-{}", d, f)));
        }
    }
    let deep = (0..30).map(|i| format!("n{}", i)).collect::<Vec<_>>().join("/");
    files.push((format!("{}/leaf.txt", deep), "leaf".to_string()));
    let borrowed: Vec<(&str, &str)> = files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();
    write_tree(root, &borrowed);
    fs::create_dir_all(root.join("empty/also_empty")).unwrap();

    for workers in [1, 2, 8] {
        let outcome = walker(workers).walk(root).unwrap();

        assert_eq!(outcome.inventory.len(), files.len());
        assert_eq!(outcome.stats.files, files.len());
        // root + 8 dirs + 30 nested + 2 empty
        assert_eq!(outcome.stats.directories, 1 + 8 + 30 + 2);
        assert_eq!(
            outcome.stats.barrier.registered,
            outcome.stats.files + outcome.stats.directories
        );
        assert_eq!(outcome.stats.barrier.arrived, outcome.stats.barrier.registered);

        let leaf = outcome.root.join(&deep).join("leaf.txt");
        assert_eq!(outcome.inventory.get(&leaf), Some(&hash_bytes(b"leaf")));
    }
}

#[test]
fn test_walker_digest_matches_hasher() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let content = vec![7u8; DEFAULT_CHUNK_SIZE * 3 + 17];
    fs::write(root.join("big.bin"), &content).unwrap();

    let outcome = walker(2).walk(root).unwrap();
    let path = outcome.root.join("big.bin");

    assert_eq!(outcome.inventory.get(&path), Some(&hash_bytes(&content)));
    assert_eq!(
        hash_file(&path, 4096).unwrap(),
        hash_file(&path, DEFAULT_CHUNK_SIZE).unwrap()
    );
}

#[test]
fn test_walker_reusable_across_walks() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(&temp_dir.path().join("one"), &[("a.txt", "a")]);
    write_tree(&temp_dir.path().join("two"), &[("b.txt", "b"), ("c/d.txt", "d")]);

    let walker = walker(3);
    assert_eq!(walker.walk(&temp_dir.path().join("one")).unwrap().inventory.len(), 1);
    assert_eq!(walker.walk(&temp_dir.path().join("two")).unwrap().inventory.len(), 2);
}
