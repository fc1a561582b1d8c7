//! Tessera Check - Incremental equivalence-class computation over a
//! generalization lattice.
//!
//! An anonymization search visits many lattice nodes, each assigning a
//! generalization level to every quasi-identifying column. For each node the
//! checker groups the generalized rows into equivalence classes, and it does
//! so as cheaply as the previous checks allow:
//!
//! - **Rollup**: a node that dominates the previous one is computed by
//!   folding the previous classes instead of the dataset.
//! - **Snapshot scan**: a cached snapshot of any dominated node is folded
//!   instead of the dataset.
//! - **Projection**: columns whose generalized values in the output buffer are
//!   already correct are not recomputed.
//!
//! # Example
//!
//! ```rust
//! use tessera_check::{NodeCheckerBuilder, NoHistory, TransitionMode};
//! use tessera_core::{DataMatrix, Hierarchy, HierarchySet, Node};
//!
//! let data = DataMatrix::from_rows(&[vec![0], vec![1], vec![2], vec![3], vec![4]]).unwrap();
//! let letters = Hierarchy::from_levels(0, vec![vec![0, 1, 2, 3, 4], vec![5; 5]]).unwrap();
//! let mut checker = NodeCheckerBuilder::new(data, HierarchySet::new(vec![letters]))
//!     .build_with_history(NoHistory::new())
//!     .unwrap();
//!
//! assert_eq!(checker.check(&Node::new(vec![0])).unwrap().len(), 5);
//! assert_eq!(checker.check(&Node::new(vec![1])).unwrap().len(), 1);
//! assert_eq!(checker.last_check().unwrap().mode, TransitionMode::Rollup);
//! ```

#![no_std]

extern crate alloc;

mod checker;
pub mod history;
pub mod transformer;
pub mod transition;

pub use checker::{CheckInfo, NodeChecker, NodeCheckerBuilder};
pub use history::{History, HistoryConfig, NoHistory, SnapshotHistory};
pub use transformer::{Source, TransformScratch, Transformer};
pub use transition::{StateMachine, Transition, TransitionMode};
