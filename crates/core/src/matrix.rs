//! Dictionary-encoded data matrix.
//!
//! Rows × columns of `u32` codes stored row-major in a single allocation.
//! Hot loops take a row slice once (`row` / `row_mut`) and index columns
//! within it, which avoids recomputing `row * columns` per cell.

use crate::error::{Error, Result};
use alloc::format;
use alloc::vec::Vec;

/// A row-major matrix of integer codes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataMatrix {
    rows: usize,
    columns: usize,
    data: Vec<u32>,
}

impl DataMatrix {
    /// Creates a zero-filled matrix.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            data: alloc::vec![0; rows * columns],
        }
    }

    /// Creates a matrix from a flat row-major buffer.
    pub fn from_vec(columns: usize, data: Vec<u32>) -> Result<Self> {
        if columns == 0 {
            if !data.is_empty() {
                return Err(Error::invalid_configuration(
                    "Matrix without columns cannot hold data",
                ));
            }
            return Ok(Self {
                rows: 0,
                columns,
                data,
            });
        }
        if data.len() % columns != 0 {
            return Err(Error::invalid_configuration(format!(
                "Buffer of {} values is not a multiple of {} columns",
                data.len(),
                columns
            )));
        }
        Ok(Self {
            rows: data.len() / columns,
            columns,
            data,
        })
    }

    /// Creates a matrix from a list of rows. All rows must have equal length.
    pub fn from_rows(rows: &[Vec<u32>]) -> Result<Self> {
        let columns = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * columns);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns {
                return Err(Error::invalid_configuration(format!(
                    "Row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    columns
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            columns,
            data,
        })
    }

    /// Returns the number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Returns true if the matrix has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns one row.
    #[inline]
    pub fn row(&self, row: usize) -> &[u32] {
        let start = row * self.columns;
        &self.data[start..start + self.columns]
    }

    /// Returns one row mutably.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [u32] {
        let start = row * self.columns;
        &mut self.data[start..start + self.columns]
    }

    /// Returns the value at `(row, column)`.
    #[inline]
    pub fn value_at(&self, row: usize, column: usize) -> u32 {
        self.data[row * self.columns + column]
    }

    /// Sets the value at `(row, column)`.
    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: u32) {
        self.data[row * self.columns + column] = value;
    }

    /// Iterates over all rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u32]> {
        (0..self.rows).map(move |row| self.row(row))
    }

    /// Returns the underlying row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }
}

/// A fixed-size set of row indices, stored as a bitset.
///
/// Used to mark the rows that contribute to the secondary class count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowSet {
    words: Vec<u64>,
    len: usize,
}

impl RowSet {
    /// Creates an empty set over `len` rows.
    pub fn new(len: usize) -> Self {
        Self {
            words: alloc::vec![0; (len + 63) / 64],
            len,
        }
    }

    /// Creates a set containing every row.
    pub fn full(len: usize) -> Self {
        let mut set = Self::new(len);
        for row in 0..len {
            set.insert(row);
        }
        set
    }

    /// Creates a set from a list of flags.
    pub fn from_flags(flags: &[bool]) -> Self {
        let mut set = Self::new(flags.len());
        for (row, _) in flags.iter().enumerate().filter(|(_, &f)| f) {
            set.insert(row);
        }
        set
    }

    /// Adds a row.
    #[inline]
    pub fn insert(&mut self, row: usize) {
        debug_assert!(row < self.len);
        self.words[row / 64] |= 1 << (row % 64);
    }

    /// Returns true if the row is contained.
    #[inline]
    pub fn contains(&self, row: usize) -> bool {
        row < self.len && self.words[row / 64] & (1 << (row % 64)) != 0
    }

    /// Number of rows the set ranges over.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the set ranges over no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of contained rows.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
