//! Snapshot container and byte codec.
//!
//! Records live in one flat `u32` buffer at a fixed stride, so scanning a
//! snapshot is a linear walk with no per-record decoding beyond slicing.

use super::{flags, SnapshotLayout, HEADER_SIZE};
use alloc::format;
use alloc::vec::Vec;
use tessera_core::{Error, Result};

/// A compact encoding of an equivalence-class table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    layout: SnapshotLayout,
    /// Records, `layout.stride()` words each.
    data: Vec<u32>,
}

impl Snapshot {
    /// Creates an empty snapshot with room for `records` records.
    pub fn with_capacity(layout: SnapshotLayout, records: usize) -> Self {
        Self {
            layout,
            data: Vec::with_capacity(records * layout.stride()),
        }
    }

    /// Wraps an existing word buffer.
    pub fn from_words(layout: SnapshotLayout, data: Vec<u32>) -> Result<Self> {
        if data.len() % layout.stride() != 0 {
            return Err(Error::invalid_snapshot(format!(
                "{} words is not a multiple of stride {}",
                data.len(),
                layout.stride()
            )));
        }
        Ok(Self { layout, data })
    }

    /// Appends one record. `record` must be exactly one stride long.
    #[inline]
    pub fn push_record(&mut self, record: &[u32]) {
        debug_assert_eq!(record.len(), self.layout.stride());
        self.data.extend_from_slice(record);
    }

    /// Returns the layout.
    #[inline]
    pub fn layout(&self) -> SnapshotLayout {
        self.layout
    }

    /// Words per record.
    #[inline]
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// Number of records (equivalence classes).
    #[inline]
    pub fn record_count(&self) -> usize {
        self.data.len() / self.layout.stride()
    }

    /// Returns true if the snapshot holds no record.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over the records in encoding order.
    pub fn records(&self) -> impl Iterator<Item = SnapshotRecord<'_>> + '_ {
        let layout = self.layout;
        self.data
            .chunks_exact(layout.stride())
            .map(move |words| SnapshotRecord { words, layout })
    }

    /// Sum of all class sizes.
    pub fn total_count(&self) -> u64 {
        self.records().map(|r| r.count() as u64).sum()
    }

    /// Encodes the snapshot into its byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE + self.data.len() * 4);
        let flags = if self.layout.has_secondary() {
            flags::HAS_SECONDARY
        } else {
            0
        };

        // Header: record_count (4) + stride (4) + sensitive (4) + flags (4)
        buffer.extend_from_slice(&(self.record_count() as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.stride() as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.layout.sensitive() as u32).to_le_bytes());
        buffer.extend_from_slice(&flags.to_le_bytes());

        for word in &self.data {
            buffer.extend_from_slice(&word.to_le_bytes());
        }
        buffer
    }

    /// Decodes a snapshot from its byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::invalid_snapshot(format!(
                "buffer of {} bytes is shorter than the header",
                bytes.len()
            )));
        }
        let record_count = read_u32(bytes, 0) as usize;
        let stride = read_u32(bytes, 4) as usize;
        let sensitive = read_u32(bytes, 8) as usize;
        let flags = read_u32(bytes, 12);

        if flags & !flags::HAS_SECONDARY != 0 {
            return Err(Error::invalid_snapshot(format!(
                "unknown header flags {:#x}",
                flags
            )));
        }
        let secondary = flags & flags::HAS_SECONDARY != 0;
        let fits = sensitive
            .checked_mul(2)
            .and_then(|s| s.checked_add(SnapshotLayout::BASE_STRIDE + secondary as usize))
            .is_some();
        if !fits {
            return Err(Error::invalid_snapshot(format!(
                "{} sensitive attributes overflow the record stride",
                sensitive
            )));
        }
        let layout = SnapshotLayout::new(secondary, sensitive);
        layout.expect_stride(stride)?;

        let body = &bytes[HEADER_SIZE..];
        let expected = record_count
            .checked_mul(stride)
            .and_then(|words| words.checked_mul(4))
            .ok_or_else(|| {
                Error::invalid_snapshot(format!(
                    "{} records of stride {} overflow the body length",
                    record_count, stride
                ))
            })?;
        if body.len() != expected {
            return Err(Error::invalid_snapshot(format!(
                "expected {} body bytes for {} records, got {}",
                expected,
                record_count,
                body.len()
            )));
        }

        let data = body
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        Ok(Self { layout, data })
    }
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Cursor over one decoded record.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotRecord<'a> {
    words: &'a [u32],
    layout: SnapshotLayout,
}

impl<'a> SnapshotRecord<'a> {
    /// Representative row index.
    #[inline]
    pub fn representative(&self) -> usize {
        self.words[SnapshotLayout::REPRESENTATIVE] as usize
    }

    /// Class size.
    #[inline]
    pub fn count(&self) -> u32 {
        self.words[SnapshotLayout::COUNT]
    }

    /// Secondary class size, 0 if the layout has none.
    #[inline]
    pub fn pcount(&self) -> u32 {
        match self.layout.secondary_offset() {
            Some(offset) => self.words[offset],
            None => 0,
        }
    }

    /// `(values_id, freqs_id)` of one sensitive attribute.
    #[inline]
    pub fn distribution_ids(&self, attribute: usize) -> (u32, u32) {
        let offset = self.layout.distribution_offset(attribute);
        (self.words[offset], self.words[offset + 1])
    }
}
