//! Choice of how to compute the next node's classes.
//!
//! The state machine remembers the previously checked node and which columns
//! of the output buffer are known to hold one level for every row. From that
//! it decides, for each new node, between a full scan of the dataset, a
//! rollup of the previous table and a scan of a cached snapshot, and which
//! columns the transformer may leave untouched.
//!
//! Deciding is pure. The checker commits the transition only after the
//! transformer succeeded and resets the machine on any failure.

use alloc::vec::Vec;
use tessera_core::{Level, Node, Projection};
use tessera_snapshot::Snapshot;

use crate::history::History;

/// How a node's classes are computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionMode {
    /// Transform every dataset row.
    FullScan,
    /// Fold the classes of the previous node, which the new node dominates.
    Rollup,
    /// Fold the records of a cached snapshot.
    SnapshotScan,
}

/// A decided transition.
#[derive(Clone, Copy, Debug)]
pub struct Transition<'h> {
    pub mode: TransitionMode,
    /// Columns whose buffer values are already correct for the new node.
    pub projection: Projection,
    /// The snapshot and its node, for [`TransitionMode::SnapshotScan`].
    pub snapshot: Option<(&'h Snapshot, &'h Node)>,
}

impl Transition<'_> {
    /// A full scan recomputing the columns outside `projection`.
    pub fn full_scan(projection: Projection) -> Self {
        Self {
            mode: TransitionMode::FullScan,
            projection,
            snapshot: None,
        }
    }
}

/// Tracks what the previous check left behind.
#[derive(Clone, Debug)]
pub struct StateMachine {
    last_node: Option<Node>,
    last_mode: Option<TransitionMode>,
    /// Per column, the level every buffer row currently holds, if uniform.
    uniform: Vec<Option<Level>>,
}

impl StateMachine {
    /// Creates a machine for `columns` columns, with no previous check.
    pub fn new(columns: usize) -> Self {
        Self {
            last_node: None,
            last_mode: None,
            uniform: alloc::vec![None; columns],
        }
    }

    /// The node of the last committed check.
    pub fn last_node(&self) -> Option<&Node> {
        self.last_node.as_ref()
    }

    /// The mode of the last committed check.
    pub fn last_mode(&self) -> Option<TransitionMode> {
        self.last_mode
    }

    /// Columns that hold `node`'s level in every buffer row.
    pub fn uniform_projection(&self, node: &Node) -> Projection {
        self.uniform
            .iter()
            .zip(node.levels())
            .take(Projection::MAX_COLUMNS)
            .enumerate()
            .filter(|(_, (held, &level))| **held == Some(level))
            .fold(Projection::EMPTY, |p, (column, _)| p.with(column))
    }

    /// Decides how to check `node`.
    ///
    /// A usable snapshot wins over a rollup; a rollup is only chosen when
    /// `node` dominates the previous node.
    pub fn decide<'h, H: History + ?Sized>(&self, node: &Node, history: &'h H) -> Transition<'h> {
        let Some(last) = self.last_node.as_ref() else {
            return Transition::full_scan(self.uniform_projection(node));
        };

        if let Some((snapshot, source)) = history.lookup(node) {
            if node.dominates(source) {
                let reusable = match self.last_mode {
                    Some(TransitionMode::Rollup) | Some(TransitionMode::SnapshotScan)
                        if !source.dominates(last) =>
                    {
                        Projection::EMPTY
                    }
                    _ => Projection::unchanged(node, source),
                };
                return Transition {
                    mode: TransitionMode::SnapshotScan,
                    projection: reusable.intersect(self.uniform_projection(node)),
                    snapshot: Some((snapshot, source)),
                };
            }
            tracing::warn!(
                node = %node,
                source = %source,
                "history returned a snapshot the node does not dominate"
            );
        }

        if node.dominates(last) {
            return Transition {
                mode: TransitionMode::Rollup,
                projection: Projection::unchanged(node, last),
                snapshot: None,
            };
        }

        Transition::full_scan(self.uniform_projection(node))
    }

    /// Records a successfully executed transition.
    pub fn commit(&mut self, node: &Node, mode: TransitionMode, projection: Projection) {
        match mode {
            TransitionMode::FullScan => {
                for (held, &level) in self.uniform.iter_mut().zip(node.levels()) {
                    *held = Some(level);
                }
            }
            // Only representative rows were rewritten
            TransitionMode::Rollup | TransitionMode::SnapshotScan => {
                for (column, (held, &level)) in
                    self.uniform.iter_mut().zip(node.levels()).enumerate()
                {
                    if !projection.contains(column) && *held != Some(level) {
                        *held = None;
                    }
                }
            }
        }
        self.last_node = Some(node.clone());
        self.last_mode = Some(mode);
    }

    /// Forgets the previous check and everything known about the buffer.
    pub fn reset(&mut self) {
        self.last_node = None;
        self.last_mode = None;
        self.uniform.fill(None);
    }
}
