//! Tessera Core - Core types for the Tessera transformation checker.
//!
//! This crate provides the read-only inputs every check works on:
//!
//! - `Node`: A point of the generalization lattice (one level per column)
//! - `Projection`: Columns whose generalized values are carried over
//! - `DataMatrix`: Dictionary-encoded, row-major table of `u32` codes
//! - `Hierarchy` / `HierarchySet`: Per-column generalization lookups
//! - `RowSet`: Row subset backing the secondary class count
//! - `Requirements`: Which per-class statistics must be produced
//! - `Interrupt`: Cooperative cancellation flag
//! - `Error`: Error types for configuration and checks
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{DataMatrix, Hierarchy, HierarchySet, Node};
//!
//! // One column over the values A..E (0..5), all mapped to X (5) at level 1
//! let hierarchy = Hierarchy::from_values(
//!     0,
//!     &[vec![0, 5], vec![1, 5], vec![2, 5], vec![3, 5], vec![4, 5]],
//! )
//! .unwrap();
//! let hierarchies = HierarchySet::new(vec![hierarchy]);
//!
//! let data = DataMatrix::from_rows(&[vec![0], vec![1], vec![2], vec![3], vec![4]]).unwrap();
//! hierarchies.validate_matrix(&data).unwrap();
//!
//! let top = hierarchies.top();
//! assert_eq!(top, Node::new(vec![1]));
//! assert!(top.dominates(&Node::bottom(1)));
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod hierarchy;
mod interrupt;
pub mod matrix;
pub mod node;
mod requirements;

pub use error::{Error, Result};
pub use hierarchy::{Hierarchy, HierarchySet};
pub use interrupt::Interrupt;
pub use matrix::{DataMatrix, RowSet};
pub use node::{Level, Node, Projection};
pub use requirements::Requirements;
