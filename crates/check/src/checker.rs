//! The node checker.

use alloc::format;
use alloc::sync::Arc;
use tessera_core::{
    DataMatrix, Error, HierarchySet, Interrupt, Node, Projection, Requirements, Result, RowSet,
};
use tessera_groupify::{Groupify, StatisticsKind};
use tessera_snapshot::SnapshotLayout;

use crate::history::{History, HistoryConfig, SnapshotHistory};
use crate::transformer::{Source, TransformScratch, Transformer};
use crate::transition::{StateMachine, Transition, TransitionMode};

/// Summary of the most recent successful check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckInfo {
    pub node: Node,
    pub mode: TransitionMode,
    /// Columns carried over from the buffer without recomputation.
    pub projection: Projection,
    /// Rows, entries or records folded.
    pub processed: usize,
    /// Classes in the resulting table.
    pub classes: usize,
}

/// Configures and validates a [`NodeChecker`].
#[derive(Clone, Debug)]
pub struct NodeCheckerBuilder {
    data: Arc<DataMatrix>,
    hierarchies: Arc<HierarchySet>,
    requirements: Requirements,
    sensitive: Option<Arc<DataMatrix>>,
    subset: Option<Arc<RowSet>>,
    interrupt: Option<Interrupt>,
    history: HistoryConfig,
}

impl NodeCheckerBuilder {
    /// Starts a configuration with class sizes only and a default history.
    pub fn new(data: impl Into<Arc<DataMatrix>>, hierarchies: impl Into<Arc<HierarchySet>>) -> Self {
        Self {
            data: data.into(),
            hierarchies: hierarchies.into(),
            requirements: Requirements::COUNTER,
            sensitive: None,
            subset: None,
            interrupt: None,
            history: HistoryConfig::default(),
        }
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sensitive values, one row per dataset row and one column per attribute.
    pub fn sensitive(mut self, sensitive: impl Into<Arc<DataMatrix>>) -> Self {
        self.sensitive = Some(sensitive.into());
        self
    }

    /// Rows counted by the secondary counter.
    pub fn subset(mut self, subset: impl Into<Arc<RowSet>>) -> Self {
        self.subset = Some(subset.into());
        self
    }

    pub fn interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Policy of the default snapshot history.
    pub fn history(mut self, config: HistoryConfig) -> Self {
        self.history = config;
        self
    }

    /// Builds a checker with a [`SnapshotHistory`].
    pub fn build(self) -> Result<NodeChecker<SnapshotHistory>> {
        let history = SnapshotHistory::new(self.data.rows(), self.history);
        self.build_with_history(history)
    }

    /// Builds a checker around a caller-supplied history.
    pub fn build_with_history<H: History>(self, mut history: H) -> Result<NodeChecker<H>> {
        let kind = StatisticsKind::select(self.requirements)?;
        let rows = self.data.rows();
        let columns = self.data.columns();

        if columns > Projection::MAX_COLUMNS {
            return Err(Error::invalid_configuration(format!(
                "{} columns exceed the limit of {}",
                columns,
                Projection::MAX_COLUMNS
            )));
        }
        if rows > u32::MAX as usize {
            return Err(Error::invalid_configuration(format!(
                "{} rows exceed the snapshot row index range",
                rows
            )));
        }
        self.hierarchies.validate_matrix(&self.data)?;

        let subset = if kind.has_secondary() {
            match self.subset {
                Some(subset) if subset.len() == rows => Some(subset),
                Some(subset) => {
                    return Err(Error::invalid_configuration(format!(
                        "subset covers {} rows, dataset has {}",
                        subset.len(),
                        rows
                    )))
                }
                None => {
                    return Err(Error::invalid_configuration(
                        "secondary counter requires a row subset",
                    ))
                }
            }
        } else {
            None
        };
        let sensitive = if kind.has_distribution() {
            match self.sensitive {
                Some(sensitive) if sensitive.rows() == rows && sensitive.columns() > 0 => {
                    Some(sensitive)
                }
                Some(sensitive) => {
                    return Err(Error::invalid_configuration(format!(
                        "sensitive values are {}x{}, expected {} rows and at least one column",
                        sensitive.rows(),
                        sensitive.columns(),
                        rows
                    )))
                }
                None => {
                    return Err(Error::invalid_configuration(
                        "distributions require sensitive values",
                    ))
                }
            }
        } else {
            None
        };

        let layout = kind.layout(sensitive.as_ref().map(|s| s.columns()).unwrap_or(0));
        history.clear();
        tracing::debug!(rows, columns, ?kind, "built node checker");

        Ok(NodeChecker {
            buffer: DataMatrix::new(rows, columns),
            current: Groupify::new(columns, layout.sensitive()),
            previous: Groupify::new(columns, layout.sensitive()),
            state: StateMachine::new(columns),
            scratch: TransformScratch::new(),
            data: self.data,
            hierarchies: self.hierarchies,
            sensitive,
            subset,
            interrupt: self.interrupt,
            kind,
            layout,
            history,
            last_check: None,
        })
    }
}

/// Computes equivalence classes for a sequence of lattice nodes, reusing
/// earlier work where the lattice structure allows it.
///
/// The returned table borrows the checker and stays valid until the next
/// call that takes `&mut self`.
#[derive(Debug)]
pub struct NodeChecker<H: History = SnapshotHistory> {
    data: Arc<DataMatrix>,
    hierarchies: Arc<HierarchySet>,
    sensitive: Option<Arc<DataMatrix>>,
    subset: Option<Arc<RowSet>>,
    interrupt: Option<Interrupt>,
    kind: StatisticsKind,
    layout: SnapshotLayout,
    /// Generalized rows. Only columns tracked by `state` are trustworthy.
    buffer: DataMatrix,
    scratch: TransformScratch,
    state: StateMachine,
    history: H,
    /// Table being filled.
    current: Groupify,
    /// Table of the last successful check.
    previous: Groupify,
    last_check: Option<CheckInfo>,
}

impl<H: History> NodeChecker<H> {
    /// Computes the classes of `node`.
    pub fn check(&mut self, node: &Node) -> Result<&Groupify> {
        self.execute(node, false)
    }

    /// Computes the classes of `node` from every dataset row.
    pub fn check_full_scan(&mut self, node: &Node) -> Result<&Groupify> {
        self.execute(node, true)
    }

    fn execute(&mut self, node: &Node, forced: bool) -> Result<&Groupify> {
        self.hierarchies.validate_node(node)?;

        let transition = if forced {
            Transition::full_scan(Projection::EMPTY)
        } else {
            self.state.decide(node, &self.history)
        };
        let mode = transition.mode;
        let projection = transition.projection;
        tracing::trace!(node = %node, ?mode, projection = projection.bits(), forced, "decided transition");
        let source = match (mode, transition.snapshot) {
            (TransitionMode::SnapshotScan, Some((snapshot, _))) => Source::Snapshot {
                snapshot,
                dictionary: self.history.dictionary(),
            },
            (TransitionMode::Rollup, _) => Source::Table(&self.previous),
            _ => Source::Rows {
                start: 0,
                stop: self.data.rows(),
            },
        };

        let transformer = Transformer::new_unchecked(&self.data, &self.hierarchies, self.kind)
            .with_subset(self.subset.as_deref())
            .with_sensitive(self.sensitive.as_deref())
            .with_interrupt(self.interrupt.as_ref());
        self.current.clear();
        let result = transformer.apply(
            &mut self.scratch,
            node,
            projection,
            source,
            &mut self.buffer,
            &mut self.current,
        );
        let processed = match result {
            Ok(processed) => processed,
            Err(err) => {
                self.abort();
                tracing::debug!(node = %node, ?mode, error = %err, "check aborted");
                return Err(err);
            }
        };

        if let Err(err) = self.history.store(node, &self.current, self.layout) {
            self.abort();
            return Err(err);
        }
        self.state.commit(node, mode, projection);
        core::mem::swap(&mut self.current, &mut self.previous);

        tracing::debug!(
            node = %node,
            ?mode,
            carried = projection.count(),
            processed,
            classes = self.previous.len(),
            "checked node"
        );
        self.last_check = Some(CheckInfo {
            node: node.clone(),
            mode,
            projection,
            processed,
            classes: self.previous.len(),
        });
        Ok(&self.previous)
    }

    fn abort(&mut self) {
        self.state.reset();
        self.current.clear();
        self.previous.clear();
        self.last_check = None;
    }

    /// Forgets the previous node. The next check is a cold full scan.
    pub fn reset(&mut self) {
        self.abort();
    }

    /// The table of the last successful check.
    pub fn table(&self) -> Option<&Groupify> {
        self.last_check.as_ref().map(|_| &self.previous)
    }

    pub fn last_check(&self) -> Option<&CheckInfo> {
        self.last_check.as_ref()
    }

    /// Generalized dataset rows as left by the last check.
    ///
    /// Rows that were not rescanned may hold values of earlier nodes.
    pub fn buffer(&self) -> &DataMatrix {
        &self.buffer
    }

    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Mutable access to the history. Stored snapshots stay valid for any
    /// later check, so no checker state is invalidated.
    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn kind(&self) -> StatisticsKind {
        self.kind
    }

    /// Layout of the snapshots this checker produces.
    pub fn layout(&self) -> SnapshotLayout {
        self.layout
    }

    pub fn data(&self) -> &Arc<DataMatrix> {
        &self.data
    }

    pub fn hierarchies(&self) -> &Arc<HierarchySet> {
        &self.hierarchies
    }
}
