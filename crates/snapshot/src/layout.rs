//! Record layout for snapshots.
//!
//! Pre-computes field offsets and the stride once per configuration.

use tessera_core::{Error, Result};

/// Layout of one snapshot record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotLayout {
    /// Whether records carry the secondary count.
    secondary: bool,
    /// Number of sensitive attributes with a distribution.
    sensitive: usize,
}

impl SnapshotLayout {
    /// Offset of the representative row index.
    pub const REPRESENTATIVE: usize = 0;
    /// Offset of the class size.
    pub const COUNT: usize = 1;
    /// Fields every record carries.
    pub const BASE_STRIDE: usize = 2;

    /// Creates a layout.
    pub const fn new(secondary: bool, sensitive: usize) -> Self {
        Self {
            secondary,
            sensitive,
        }
    }

    /// Returns whether records carry the secondary count.
    #[inline]
    pub fn has_secondary(&self) -> bool {
        self.secondary
    }

    /// Returns the number of tracked sensitive attributes.
    #[inline]
    pub fn sensitive(&self) -> usize {
        self.sensitive
    }

    /// Offset of the secondary count, if present.
    #[inline]
    pub fn secondary_offset(&self) -> Option<usize> {
        self.secondary.then_some(Self::BASE_STRIDE)
    }

    /// Offset of the `(values_id, freqs_id)` pair of one sensitive attribute.
    #[inline]
    pub fn distribution_offset(&self, attribute: usize) -> usize {
        Self::BASE_STRIDE + self.secondary as usize + 2 * attribute
    }

    /// Number of `u32` words per record.
    #[inline]
    pub fn stride(&self) -> usize {
        Self::BASE_STRIDE + self.secondary as usize + 2 * self.sensitive
    }

    /// Fails unless `stride` is exactly what this layout decodes.
    pub fn expect_stride(&self, stride: usize) -> Result<()> {
        if stride != self.stride() {
            return Err(Error::stride_mismatch(self.stride(), stride));
        }
        Ok(())
    }
}
