//! Equivalence-class entries.

use crate::distribution::Distribution;
use alloc::vec::Vec;

/// One equivalence class.
#[derive(Clone, Debug)]
pub struct GroupifyEntry {
    /// First row that produced this class.
    pub(crate) representative: usize,
    /// Class size.
    pub(crate) count: u32,
    /// Secondary class size, 0 unless tracked.
    pub(crate) pcount: u32,
    /// One distribution per tracked sensitive attribute.
    pub(crate) distributions: Vec<Distribution>,
    /// Cached row hash.
    pub(crate) hash: u64,
}

impl GroupifyEntry {
    pub(crate) fn new(representative: usize, hash: u64, sensitive: usize) -> Self {
        Self {
            representative,
            count: 0,
            pcount: 0,
            distributions: (0..sensitive).map(|_| Distribution::new()).collect(),
            hash,
        }
    }

    /// Row index of the class representative.
    #[inline]
    pub fn representative(&self) -> usize {
        self.representative
    }

    /// Number of rows in the class.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of rows in the class that belong to the secondary subset.
    #[inline]
    pub fn pcount(&self) -> u32 {
        self.pcount
    }

    /// Distributions, one per tracked sensitive attribute.
    #[inline]
    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    /// Distribution of one sensitive attribute.
    #[inline]
    pub fn distribution(&self, attribute: usize) -> Option<&Distribution> {
        self.distributions.get(attribute)
    }
}
