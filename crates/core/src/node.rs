//! Lattice nodes and projection bitmasks.
//!
//! A `Node` is one point of the generalization lattice: a level per
//! quasi-identifying column. A `Projection` marks the columns whose
//! generalized values can be carried over instead of recomputed.

use alloc::vec::Vec;
use core::fmt;

/// Generalization level of a single column.
pub type Level = u32;

/// A point in the generalization lattice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    levels: Vec<Level>,
}

impl Node {
    /// Creates a node from its per-column levels.
    pub fn new(levels: Vec<Level>) -> Self {
        Self { levels }
    }

    /// Creates the bottom node (no generalization) for `columns` columns.
    pub fn bottom(columns: usize) -> Self {
        Self {
            levels: alloc::vec![0; columns],
        }
    }

    /// Returns the levels.
    #[inline]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Returns the level of one column.
    #[inline]
    pub fn level(&self, column: usize) -> Option<Level> {
        self.levels.get(column).copied()
    }

    /// Returns the number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if the node has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns true if every level of `self` is >= the matching level of `other`.
    ///
    /// Nodes of different length never dominate each other.
    pub fn dominates(&self, other: &Node) -> bool {
        self.levels.len() == other.levels.len()
            && self
                .levels
                .iter()
                .zip(other.levels.iter())
                .all(|(a, b)| a >= b)
    }
}

impl From<Vec<Level>> for Node {
    fn from(levels: Vec<Level>) -> Self {
        Self::new(levels)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, level) in self.levels.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", level)?;
        }
        write!(f, "]")
    }
}

/// Bitmask over quasi-identifying columns.
///
/// Bit `i` set means column `i` keeps its value from the output buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Projection(u64);

impl Projection {
    /// Maximum number of columns a projection can describe.
    pub const MAX_COLUMNS: usize = 64;

    /// The empty projection: every column is recomputed.
    pub const EMPTY: Projection = Projection(0);

    /// Creates a projection from raw bits.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Projection(bits)
    }

    /// Returns the raw bits.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Columns whose level is equal in both nodes.
    pub fn unchanged(a: &Node, b: &Node) -> Self {
        let bits = a
            .levels()
            .iter()
            .zip(b.levels().iter())
            .take(Self::MAX_COLUMNS)
            .enumerate()
            .filter(|(_, (x, y))| x == y)
            .fold(0u64, |acc, (i, _)| acc | (1 << i));
        Projection(bits)
    }

    /// Returns true if `column` is carried over.
    #[inline]
    pub fn contains(self, column: usize) -> bool {
        column < Self::MAX_COLUMNS && self.0 & (1 << column) != 0
    }

    /// Returns a copy with `column` added.
    #[inline]
    pub fn with(self, column: usize) -> Self {
        debug_assert!(column < Self::MAX_COLUMNS);
        Projection(self.0 | (1 << column))
    }

    /// Returns a copy with `column` removed.
    #[inline]
    pub fn without(self, column: usize) -> Self {
        debug_assert!(column < Self::MAX_COLUMNS);
        Projection(self.0 & !(1 << column))
    }

    /// Intersection of two projections.
    #[inline]
    pub fn intersect(self, other: Projection) -> Self {
        Projection(self.0 & other.0)
    }

    /// Returns true if no column is carried over.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of carried-over columns.
    #[inline]
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Indices of the columns among `0..columns` that are NOT carried over.
    pub fn active_columns(self, columns: usize) -> impl Iterator<Item = usize> {
        (0..columns).filter(move |&c| !self.contains(c))
    }
}
