//! Tessera Groupify - Equivalence-class table for the Tessera checker.
//!
//! This crate provides the structure a check populates:
//!
//! - `Groupify`: Chained hash table keyed by transformed rows
//! - `GroupifyEntry`: One class with its size, secondary size and distributions
//! - `Distribution`: Value → frequency map of a sensitive attribute
//! - `Statistics`: Delegates folding rows, entries or snapshot records into a table
//! - `StatisticsKind`: The supported requirement combinations
//!
//! # Example
//!
//! ```rust
//! use tessera_groupify::{CountStatistics, Groupify, Statistics};
//!
//! let mut table = Groupify::new(2, 0);
//! let rows: [[u32; 2]; 3] = [[1, 1], [1, 2], [1, 1]];
//! for (row, key) in rows.iter().enumerate() {
//!     CountStatistics.from_scan(&mut table, key, row);
//! }
//!
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.get(&[1, 1]).unwrap().count(), 2);
//! assert_eq!(table.total_count(), 3);
//! ```

#![no_std]

extern crate alloc;

pub mod distribution;
mod encode;
pub mod entry;
mod hasher;
pub mod statistics;
pub mod table;

pub use distribution::Distribution;
pub use entry::GroupifyEntry;
pub use hasher::hash_row;
pub use statistics::{
    CountStatistics, DistributionStatistics, SecondaryCountStatistics,
    SecondaryDistributionStatistics, Statistics, StatisticsKind,
};
pub use table::{ClassSummary, Groupify};
