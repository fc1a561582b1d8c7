//! Per-class frequency distribution of one sensitive attribute.

use alloc::vec::Vec;
use hashbrown::HashMap;

/// Value → frequency map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
    counts: HashMap<u32, u32>,
}

impl Distribution {
    /// Creates an empty distribution.
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Adds `frequency` occurrences of `value`.
    #[inline]
    pub fn add(&mut self, value: u32, frequency: u32) {
        *self.counts.entry(value).or_insert(0) += frequency;
    }

    /// Adds a packed `(values, frequencies)` pair.
    pub fn add_packed(&mut self, values: &[u32], frequencies: &[u32]) {
        for (&value, &frequency) in values.iter().zip(frequencies) {
            self.add(value, frequency);
        }
    }

    /// Adds every entry of `other`.
    pub fn merge(&mut self, other: &Distribution) {
        for (&value, &frequency) in &other.counts {
            self.add(value, frequency);
        }
    }

    /// Frequency of one value.
    #[inline]
    pub fn get(&self, value: u32) -> u32 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    /// Number of distinct values.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if no value was added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all frequencies.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&f| f as u64).sum()
    }

    /// Iterates over `(value, frequency)` in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.counts.iter().map(|(&v, &f)| (v, f))
    }

    /// Entries sorted by value.
    pub fn sorted(&self) -> Vec<(u32, u32)> {
        let mut entries: Vec<(u32, u32)> = self.iter().collect();
        entries.sort_unstable();
        entries
    }

    /// Packs the distribution into parallel arrays sorted by value.
    ///
    /// Equal distributions always pack to equal arrays, which is what makes
    /// interning them worthwhile.
    pub fn pack(&self) -> (Vec<u32>, Vec<u32>) {
        self.sorted().into_iter().unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_add_and_get() {
        let mut d = Distribution::new();
        d.add(3, 1);
        d.add(3, 2);
        d.add(1, 1);
        assert_eq!(d.get(3), 3);
        assert_eq!(d.get(7), 0);
        assert_eq!(d.len(), 2);
        assert_eq!(d.total(), 4);
    }

    #[test]
    fn test_pack_sorted() {
        let mut d = Distribution::new();
        d.add(9, 1);
        d.add(2, 4);
        d.add(5, 2);
        let (values, freqs) = d.pack();
        assert_eq!(values, vec![2, 5, 9]);
        assert_eq!(freqs, vec![4, 2, 1]);
    }

    #[test]
    fn test_merge_and_packed() {
        let mut a = Distribution::new();
        a.add(1, 1);
        let mut b = Distribution::new();
        b.add_packed(&[1, 2], &[2, 5]);
        a.merge(&b);
        assert_eq!(a.sorted(), vec![(1, 3), (2, 5)]);
    }
}
