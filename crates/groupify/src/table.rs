//! Hash table of equivalence classes.
//!
//! Keys are complete transformed rows, copied into one flat arena so that a
//! class stays addressable after the output buffer is overwritten by later
//! checks. Entries are kept in insertion order, which mirrors the scan order
//! and makes re-traversal for rollups deterministic. The index only maps
//! row hashes to entry positions.

use crate::distribution::Distribution;
use crate::entry::GroupifyEntry;
use crate::hasher::hash_row;
use alloc::format;
use alloc::vec::Vec;
use hashbrown::HashTable;
use tessera_core::{Error, Result};

/// Equivalence-class table.
#[derive(Clone, Debug)]
pub struct Groupify {
    /// Number of columns per key.
    width: usize,
    /// Distributions tracked per entry.
    sensitive: usize,
    /// Entry positions keyed by the cached row hash.
    index: HashTable<u32>,
    /// Entries in insertion order.
    entries: Vec<GroupifyEntry>,
    /// Keys, `width` values per entry, same order as `entries`.
    keys: Vec<u32>,
}

impl Groupify {
    /// Creates an empty table for keys of `width` columns.
    pub fn new(width: usize, sensitive: usize) -> Self {
        Self::with_capacity(width, sensitive, 0)
    }

    /// Creates an empty table pre-sized for about `expected` classes.
    pub fn with_capacity(width: usize, sensitive: usize, expected: usize) -> Self {
        Self {
            width,
            sensitive,
            index: HashTable::with_capacity(expected),
            entries: Vec::with_capacity(expected),
            keys: Vec::with_capacity(expected * width),
        }
    }

    /// Number of columns per key.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of tracked sensitive attributes.
    #[inline]
    pub fn sensitive(&self) -> usize {
        self.sensitive
    }

    /// Removes every class, keeping the allocations.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys.clear();
        self.index.clear();
    }

    /// Grows the index so that `expected` classes fit without rehashing.
    pub fn reserve(&mut self, expected: usize) {
        let additional = expected.saturating_sub(self.entries.len());
        let entries = &self.entries;
        self.index.reserve(additional, |&i| entries[i as usize].hash);
        self.entries.reserve(additional);
        self.keys.reserve(additional * self.width);
    }

    /// Number of classes.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table holds no class.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    #[inline]
    pub fn entries(&self) -> &[GroupifyEntry] {
        &self.entries
    }

    /// Key of the entry at `index`.
    #[inline]
    pub fn key(&self, index: usize) -> &[u32] {
        &self.keys[index * self.width..(index + 1) * self.width]
    }

    /// Iterates over `(key, entry)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u32], &GroupifyEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, e)| (self.key(i), e))
    }

    /// Looks up the class of a transformed row.
    pub fn get(&self, key: &[u32]) -> Option<&GroupifyEntry> {
        self.find(key, hash_row(key)).map(|i| &self.entries[i])
    }

    /// Sum of all class sizes.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count as u64).sum()
    }

    /// Smallest class size, `None` for an empty table.
    pub fn min_count(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.count).min()
    }

    /// Returns the entry for `key`, creating it with `representative` if the
    /// key is new. Counters of a new entry start at zero.
    #[inline]
    pub(crate) fn accumulate(&mut self, key: &[u32], representative: usize) -> &mut GroupifyEntry {
        debug_assert_eq!(key.len(), self.width);
        let hash = hash_row(key);
        match self.find(key, hash) {
            Some(index) => &mut self.entries[index],
            None => self.insert(key, hash, representative),
        }
    }

    #[inline]
    fn find(&self, key: &[u32], hash: u64) -> Option<usize> {
        self.index
            .find(hash, |&i| {
                let i = i as usize;
                self.entries[i].hash == hash && self.key(i) == key
            })
            .map(|&i| i as usize)
    }

    fn insert(&mut self, key: &[u32], hash: u64, representative: usize) -> &mut GroupifyEntry {
        let index = self.entries.len();
        self.entries.push(GroupifyEntry::new(representative, hash, self.sensitive));
        self.keys.extend_from_slice(key);
        let entries = &self.entries;
        self.index
            .insert_unique(hash, index as u32, |&i| entries[i as usize].hash);
        &mut self.entries[index]
    }

    /// Folds a partial table built over a disjoint row range into this one.
    ///
    /// Sizes, secondary sizes and distributions are summed per key; the
    /// representative of a class already present here is kept.
    pub fn merge_from(&mut self, other: &Groupify) -> Result<()> {
        if other.width != self.width || other.sensitive != self.sensitive {
            return Err(Error::invalid_configuration(format!(
                "cannot merge a table of width {}/{} into one of width {}/{}",
                other.width, other.sensitive, self.width, self.sensitive
            )));
        }
        self.reserve(self.len() + other.len());
        for (key, source) in other.iter() {
            let entry = self.accumulate(key, source.representative);
            entry.count += source.count;
            entry.pcount += source.pcount;
            for (target, distribution) in entry.distributions.iter_mut().zip(&source.distributions) {
                target.merge(distribution);
            }
        }
        Ok(())
    }

    /// Canonical, order-independent description of the table.
    ///
    /// Two tables describe the same partition with the same statistics iff
    /// their summaries are equal.
    pub fn classes(&self) -> Vec<ClassSummary> {
        let mut classes: Vec<ClassSummary> = self
            .iter()
            .map(|(key, entry)| ClassSummary {
                key: key.to_vec(),
                count: entry.count,
                pcount: entry.pcount,
                distributions: entry.distributions.iter().map(Distribution::sorted).collect(),
            })
            .collect();
        classes.sort();
        classes
    }
}

/// Plain-data view of one class, used for comparisons.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassSummary {
    pub key: Vec<u32>,
    pub count: u32,
    pub pcount: u32,
    /// Sorted `(value, frequency)` pairs per sensitive attribute.
    pub distributions: Vec<Vec<(u32, u32)>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn add(table: &mut Groupify, key: &[u32], row: usize) {
        table.accumulate(key, row).count += 1;
    }

    #[test]
    fn test_accumulate_groups_equal_keys() {
        let mut table = Groupify::new(2, 0);
        add(&mut table, &[1, 2], 0);
        add(&mut table, &[3, 4], 1);
        add(&mut table, &[1, 2], 2);

        assert_eq!(table.len(), 2);
        let entry = table.get(&[1, 2]).unwrap();
        assert_eq!(entry.count(), 2);
        assert_eq!(entry.representative(), 0);
        assert!(table.get(&[2, 1]).is_none());
        assert_eq!(table.total_count(), 3);
        assert_eq!(table.min_count(), Some(1));
    }

    #[test]
    fn test_insertion_order() {
        let mut table = Groupify::new(1, 0);
        for (row, value) in [5u32, 3, 5, 9, 3, 1].iter().enumerate() {
            add(&mut table, &[*value], row);
        }
        let keys: Vec<u32> = table.iter().map(|(k, _)| k[0]).collect();
        assert_eq!(keys, vec![5, 3, 9, 1]);
        let reps: Vec<usize> = table.entries().iter().map(|e| e.representative()).collect();
        assert_eq!(reps, vec![0, 1, 3, 5]);
    }

    #[test]
    fn test_growth_keeps_entries() {
        let mut table = Groupify::new(2, 0);
        for i in 0..10_000u32 {
            add(&mut table, &[i % 2500, i / 2500], i as usize);
        }
        assert_eq!(table.len(), 10_000);
        for i in (0..10_000u32).step_by(97) {
            let entry = table.get(&[i % 2500, i / 2500]).unwrap();
            assert_eq!(entry.representative(), i as usize);
        }
        assert_eq!(table.index.len(), table.len());
        assert!(table.index.capacity() >= table.len());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut table = Groupify::with_capacity(1, 0, 1000);
        let capacity = table.index.capacity();
        assert!(capacity >= 1000);
        add(&mut table, &[1], 0);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.index.capacity(), capacity);
        assert!(table.get(&[1]).is_none());
    }

    #[test]
    fn test_colliding_hashes_stay_distinct() {
        // Keys with equal cached hashes only match on the full key
        let mut table = Groupify::new(1, 0);
        let hash = hash_row(&[1]);
        table.insert(&[1], hash, 0).count += 1;
        table.insert(&[2], hash, 1).count += 1;
        assert_eq!(table.find(&[1], hash), Some(0));
        assert_eq!(table.find(&[2], hash), Some(1));
        assert_eq!(table.find(&[3], hash), None);

        table.reserve(4096);
        assert_eq!(table.find(&[2], hash), Some(1));
        assert_eq!(table.get(&[1]).unwrap().representative(), 0);
    }

    #[test]
    fn test_zero_width_is_one_class() {
        let mut table = Groupify::new(0, 0);
        add(&mut table, &[], 0);
        add(&mut table, &[], 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].count(), 2);
    }

    #[test]
    fn test_merge_from() {
        let mut left = Groupify::new(1, 1);
        let e = left.accumulate(&[1], 0);
        e.count += 2;
        e.distributions[0].add(7, 2);

        let mut right = Groupify::new(1, 1);
        let e = right.accumulate(&[1], 5);
        e.count += 1;
        e.pcount += 1;
        e.distributions[0].add(8, 1);
        right.accumulate(&[2], 6).count += 1;

        left.merge_from(&right).unwrap();
        assert_eq!(left.len(), 2);
        let merged = left.get(&[1]).unwrap();
        assert_eq!(merged.count(), 3);
        assert_eq!(merged.pcount(), 1);
        assert_eq!(merged.representative(), 0);
        assert_eq!(merged.distribution(0).unwrap().sorted(), vec![(7, 2), (8, 1)]);

        assert!(left.merge_from(&Groupify::new(2, 1)).is_err());
    }

    #[test]
    fn test_classes_are_order_independent() {
        let mut a = Groupify::new(1, 0);
        add(&mut a, &[2], 0);
        add(&mut a, &[1], 1);
        let mut b = Groupify::new(1, 0);
        add(&mut b, &[1], 4);
        add(&mut b, &[2], 3);
        assert_eq!(a.classes(), b.classes());
    }
}
