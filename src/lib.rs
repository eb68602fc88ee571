//! Treeswap: hash-based tree reconciliation
//!
//! Compares a modified working tree against its baseline by content hash,
//! moves changed and added files into a backup area and records the baseline
//! inventory so later runs can skip rehashing it.

pub mod cli;
pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod reconcile;
pub mod relocate;
pub mod snapshot;
pub mod swap;
pub mod tree;
