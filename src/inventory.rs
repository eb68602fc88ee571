//! Hash inventory: absolute file path to content digest for one tree

use crate::tree::hasher::Digest;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mapping from absolute file path to digest.
///
/// Iteration is in sorted path order, which makes baseline tie-breaks
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashInventory {
    entries: BTreeMap<PathBuf, Digest>,
}

impl HashInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the previous digest for the path if any
    pub fn insert(&mut self, path: PathBuf, digest: Digest) -> Option<Digest> {
        self.entries.insert(path, digest)
    }

    pub fn get(&self, path: &Path) -> Option<&Digest> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Digest)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }
}

impl FromIterator<(PathBuf, Digest)> for HashInventory {
    fn from_iter<I: IntoIterator<Item = (PathBuf, Digest)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(PathBuf, Digest)> for HashInventory {
    fn extend<I: IntoIterator<Item = (PathBuf, Digest)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for HashInventory {
    type Item = (PathBuf, Digest);
    type IntoIter = std::collections::btree_map::IntoIter<PathBuf, Digest>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
