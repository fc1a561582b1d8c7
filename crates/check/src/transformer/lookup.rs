//! Row kernels that rewrite the active columns of one buffer row.
//!
//! The fixed-width kernels unroll the column loop for the common case of a
//! few active columns; the dynamic kernel handles any width.

use alloc::vec::Vec;

/// Generalizes the active columns of one row.
pub(crate) trait RowLookup {
    fn apply(&self, source: &[u32], target: &mut [u32]);
}

/// Kernel for exactly `N` active columns.
pub(crate) struct FixedLookup<'a, const N: usize> {
    columns: [usize; N],
    maps: [&'a [u32]; N],
}

impl<'a, const N: usize> FixedLookup<'a, N> {
    pub(crate) fn new(columns: &[usize], maps: &[&'a [u32]]) -> Self {
        debug_assert_eq!(columns.len(), N);
        debug_assert_eq!(maps.len(), N);
        Self {
            columns: core::array::from_fn(|i| columns[i]),
            maps: core::array::from_fn(|i| maps[i]),
        }
    }
}

impl<const N: usize> RowLookup for FixedLookup<'_, N> {
    #[inline(always)]
    fn apply(&self, source: &[u32], target: &mut [u32]) {
        for i in 0..N {
            let column = self.columns[i];
            target[column] = self.maps[i][source[column] as usize];
        }
    }
}

/// Kernel for any number of active columns.
pub(crate) struct DynamicLookup<'a> {
    columns: Vec<usize>,
    maps: Vec<&'a [u32]>,
}

impl<'a> DynamicLookup<'a> {
    pub(crate) fn new(columns: &[usize], maps: &[&'a [u32]]) -> Self {
        debug_assert_eq!(columns.len(), maps.len());
        Self {
            columns: columns.to_vec(),
            maps: maps.to_vec(),
        }
    }
}

impl RowLookup for DynamicLookup<'_> {
    #[inline]
    fn apply(&self, source: &[u32], target: &mut [u32]) {
        for (&column, map) in self.columns.iter().zip(&self.maps) {
            target[column] = map[source[column] as usize];
        }
    }
}
