//! Snapshot format for equivalence-class tables.
//!
//! A snapshot stores a previously computed table compactly so that a later
//! check can rebuild its classes from representatives instead of rescanning
//! every row. Distributions are not stored inline: each record references
//! interned value/frequency arrays in a `SnapshotDictionary`.
//!
//! ## Binary Format
//!
//! ```text
//! Header: 16 bytes
//! +--------------+--------+-----------+-------+
//! | record_count | stride | sensitive | flags |
//! | u32          | u32    | u32       | u32   |
//! +--------------+--------+-----------+-------+
//!
//! Records (fixed stride, u32 little-endian words):
//! [representative][count][pcount?][values_id, freqs_id] * sensitive
//! ...
//! ```

#![no_std]

extern crate alloc;

mod dictionary;
mod layout;
mod snapshot;

pub use dictionary::{IntArrayDictionary, SnapshotDictionary};
pub use layout::SnapshotLayout;
pub use snapshot::{Snapshot, SnapshotRecord};

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Header flags
pub mod flags {
    pub const HAS_SECONDARY: u32 = 1 << 0;
}
