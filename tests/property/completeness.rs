//! Property-based tests for walk completeness

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use treeswap::tree::barrier::FanOutBarrier;
use treeswap::tree::walker::{TreeWalker, WalkerConfig};

/// Relative file paths over a small alphabet so directories are shared
fn tree_layout() -> impl Strategy<Value = BTreeSet<Vec<u8>>> {
    prop::collection::btree_set(prop::collection::vec(0u8..3, 1..5), 0..24)
}

/// Turn each index sequence into `d0/d1/.../f<last>` so no path is both a file and a directory
fn materialize(root: &std::path::Path, layout: &BTreeSet<Vec<u8>>) -> (usize, usize) {
    let mut dirs = BTreeSet::new();
    let mut files = BTreeSet::new();
    for segments in layout {
        let (last, parents) = segments.split_last().unwrap();
        let mut dir = root.to_path_buf();
        for segment in parents {
            dir = dir.join(format!("d{}", segment));
            dirs.insert(dir.clone());
        }
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join(format!("f{}", last));
        fs::write(&file, format!("{:?}", segments)).unwrap();
        files.insert(file);
    }
    (files.len(), dirs.len())
}

#[test]
fn test_walk_totality_property() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(32));

    runner
        .run(&(tree_layout(), 1usize..6), |(layout, workers)| {
            let temp_dir = TempDir::new().unwrap();
            let (file_count, dir_count) = materialize(temp_dir.path(), &layout);

            let walker = TreeWalker::new(WalkerConfig {
                workers: Some(workers),
                ..WalkerConfig::default()
            })
            .unwrap();
            let outcome = walker.walk(temp_dir.path()).unwrap();

            prop_assert_eq!(outcome.inventory.len(), file_count);
            // Root counts as a directory unit too
            prop_assert_eq!(outcome.stats.directories, dir_count + 1);
            prop_assert_eq!(
                outcome.stats.barrier.registered,
                file_count + dir_count + 1
            );
            prop_assert_eq!(outcome.stats.barrier.arrived, outcome.stats.barrier.registered);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_barrier_reaches_zero_after_dynamic_fan_out() {
    let mut runner = proptest::test_runner::TestRunner::new(ProptestConfig::with_cases(64));

    // Each generation of units spawns `fan_out[i]` children per unit
    runner
        .run(&prop::collection::vec(0usize..4, 0..4), |fan_out| {
            let barrier = Arc::new(FanOutBarrier::new());
            barrier.register();

            fn unit(barrier: Arc<FanOutBarrier>, fan_out: Arc<Vec<usize>>, depth: usize) {
                let children = fan_out.get(depth).copied().unwrap_or(0);
                barrier.register_many(children);
                let handles: Vec<_> = (0..children)
                    .map(|_| {
                        let barrier = Arc::clone(&barrier);
                        let fan_out = Arc::clone(&fan_out);
                        thread::spawn(move || unit(barrier, fan_out, depth + 1))
                    })
                    .collect();
                barrier.arrive();
                for handle in handles {
                    handle.join().unwrap();
                }
            }

            let fan_out = Arc::new(fan_out);
            let expected: usize = (0..=fan_out.len())
                .map(|depth| fan_out[..depth].iter().product::<usize>())
                .sum();

            let root = {
                let barrier = Arc::clone(&barrier);
                let fan_out = Arc::clone(&fan_out);
                thread::spawn(move || unit(barrier, fan_out, 0))
            };
            barrier.await_zero();
            root.join().unwrap();

            prop_assert_eq!(barrier.outstanding(), 0);
            prop_assert_eq!(barrier.stats().registered, expected);
            prop_assert_eq!(barrier.stats().arrived, expected);
            Ok(())
        })
        .unwrap();
}
