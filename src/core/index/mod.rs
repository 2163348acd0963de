//! # Hash Index Module
//!
//! Groups catalog records and found files by content hash for one
//! reconciliation pass. Pure bookkeeping: building an index has no side
//! effects, and an empty input yields an empty index.

use crate::core::catalog::PhotoRecord;
use crate::core::hasher::ContentHash;
use crate::core::scanner::FoundFile;
use std::collections::BTreeMap;

/// Items that carry a content hash
pub trait HashKeyed {
    fn content_hash(&self) -> &ContentHash;
}

impl HashKeyed for FoundFile {
    fn content_hash(&self) -> &ContentHash {
        &self.hash
    }
}

impl HashKeyed for PhotoRecord {
    fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }
}

/// An in-memory grouping of items by content hash.
///
/// Backed by a BTreeMap so iteration over hashes is deterministic,
/// which keeps downstream matching reproducible across runs.
#[derive(Debug)]
pub struct HashIndex<T> {
    groups: BTreeMap<ContentHash, Vec<T>>,
}

impl<T: HashKeyed> HashIndex<T> {
    /// Group items by their content hash
    pub fn build<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut groups: BTreeMap<ContentHash, Vec<T>> = BTreeMap::new();
        for item in items {
            groups
                .entry(item.content_hash().clone())
                .or_default()
                .push(item);
        }
        Self { groups }
    }

    /// All items sharing the given hash
    pub fn get(&self, hash: &ContentHash) -> Option<&[T]> {
        self.groups.get(hash).map(|v| v.as_slice())
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.groups.contains_key(hash)
    }

    /// Iterate over (hash, group) pairs in hash order
    pub fn iter(&self) -> impl Iterator<Item = (&ContentHash, &[T])> {
        self.groups.iter().map(|(h, v)| (h, v.as_slice()))
    }

    /// Number of distinct hashes
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(hash: &str, path: &str) -> FoundFile {
        FoundFile {
            hash: ContentHash::from_hex(hash),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn empty_input_yields_empty_index() {
        let index: HashIndex<FoundFile> = HashIndex::build(vec![]);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn duplicate_content_groups_together() {
        let index = HashIndex::build(vec![
            file("h1", "/x/a.jpg"),
            file("h2", "/x/b.jpg"),
            file("h1", "/y/a copy.jpg"),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&ContentHash::from_hex("h1")).unwrap().len(), 2);
        assert_eq!(index.get(&ContentHash::from_hex("h2")).unwrap().len(), 1);
    }

    #[test]
    fn iteration_is_hash_ordered() {
        let index = HashIndex::build(vec![
            file("zz", "/a.jpg"),
            file("aa", "/b.jpg"),
            file("mm", "/c.jpg"),
        ]);

        let hashes: Vec<_> = index.iter().map(|(h, _)| h.as_str().to_string()).collect();
        assert_eq!(hashes, vec!["aa", "mm", "zz"]);
    }

    #[test]
    fn unknown_hash_is_absent() {
        let index = HashIndex::build(vec![file("h1", "/a.jpg")]);
        assert!(index.get(&ContentHash::from_hex("h9")).is_none());
        assert!(!index.contains(&ContentHash::from_hex("h9")));
    }
}
