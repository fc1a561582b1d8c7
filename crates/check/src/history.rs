//! Cache of class snapshots from earlier checks.
//!
//! A snapshot stored for node `S` can seed the check of any node that
//! dominates `S`: its records are the classes of `S`, and classes of a more
//! general node are unions of those.

use alloc::collections::VecDeque;
use hashbrown::HashSet;
use tessera_core::{Node, Result};
use tessera_groupify::Groupify;
use tessera_snapshot::{Snapshot, SnapshotDictionary, SnapshotLayout};

/// Source of reusable snapshots for the checker.
pub trait History {
    /// Returns a snapshot usable for `node` together with the node it was
    /// taken at. That node is always dominated by `node`.
    fn lookup(&self, node: &Node) -> Option<(&Snapshot, &Node)>;

    /// Dictionary the stored snapshots' distribution ids resolve against.
    fn dictionary(&self) -> &SnapshotDictionary;

    /// Offers the table just computed for `node`. Returns true if a snapshot
    /// was stored.
    fn store(&mut self, node: &Node, table: &Groupify, layout: SnapshotLayout) -> Result<bool>;

    /// Drops every stored snapshot.
    fn clear(&mut self);
}

/// A history that never stores anything.
#[derive(Debug, Default)]
pub struct NoHistory {
    dictionary: SnapshotDictionary,
}

impl NoHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl History for NoHistory {
    fn lookup(&self, _node: &Node) -> Option<(&Snapshot, &Node)> {
        None
    }

    fn dictionary(&self) -> &SnapshotDictionary {
        &self.dictionary
    }

    fn store(&mut self, _node: &Node, _table: &Groupify, _layout: SnapshotLayout) -> Result<bool> {
        Ok(false)
    }

    fn clear(&mut self) {}
}

/// Storage policy of [`SnapshotHistory`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept. Zero disables storage.
    pub capacity: usize,
    /// A table is only stored if it has at most this many classes per
    /// dataset row.
    pub max_dataset_ratio: f64,
    /// A table is only stored if it has at most this many classes per record
    /// of the snapshot it could already be derived from.
    pub max_snapshot_ratio: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 200,
            max_dataset_ratio: 0.2,
            max_snapshot_ratio: 0.8,
        }
    }
}

#[derive(Debug)]
struct HistoryEntry {
    node: Node,
    snapshot: Snapshot,
}

/// Bounded FIFO cache of snapshots.
///
/// Lookups return the smallest stored snapshot whose node the query
/// dominates. Evicting a snapshot releases its dictionary references.
#[derive(Debug)]
pub struct SnapshotHistory {
    config: HistoryConfig,
    rows: usize,
    dictionary: SnapshotDictionary,
    entries: VecDeque<HistoryEntry>,
    stored: HashSet<Node>,
}

impl SnapshotHistory {
    /// Creates an empty history for a dataset of `rows` rows.
    pub fn new(rows: usize, config: HistoryConfig) -> Self {
        Self {
            config,
            rows,
            dictionary: SnapshotDictionary::new(),
            entries: VecDeque::with_capacity(config.capacity.min(1024)),
            stored: HashSet::new(),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a snapshot of `node` is stored.
    pub fn contains(&self, node: &Node) -> bool {
        self.stored.contains(node)
    }

    /// Stored nodes, oldest first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().map(|e| &e.node)
    }

    fn evict_oldest(&mut self) {
        if let Some(evicted) = self.entries.pop_front() {
            self.dictionary.release_snapshot(&evicted.snapshot);
            self.stored.remove(&evicted.node);
            tracing::debug!(node = %evicted.node, "evicted snapshot");
        }
    }
}

impl History for SnapshotHistory {
    fn lookup(&self, node: &Node) -> Option<(&Snapshot, &Node)> {
        self.entries
            .iter()
            .filter(|e| node.dominates(&e.node))
            .min_by_key(|e| e.snapshot.record_count())
            .map(|e| (&e.snapshot, &e.node))
    }

    fn dictionary(&self) -> &SnapshotDictionary {
        &self.dictionary
    }

    fn store(&mut self, node: &Node, table: &Groupify, layout: SnapshotLayout) -> Result<bool> {
        if self.config.capacity == 0 || self.stored.contains(node) {
            return Ok(false);
        }
        let classes = table.len() as f64;
        if classes > self.config.max_dataset_ratio * self.rows as f64 {
            return Ok(false);
        }
        if let Some((existing, _)) = self.lookup(node) {
            if classes > self.config.max_snapshot_ratio * existing.record_count() as f64 {
                return Ok(false);
            }
        }

        let snapshot = table.to_snapshot(layout, &mut self.dictionary)?;
        while self.entries.len() >= self.config.capacity {
            self.evict_oldest();
        }
        tracing::debug!(node = %node, records = snapshot.record_count(), "stored snapshot");
        self.stored.insert(node.clone());
        self.entries.push_back(HistoryEntry {
            node: node.clone(),
            snapshot,
        });
        Ok(true)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.stored.clear();
        self.dictionary.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tessera_core::{DataMatrix, RowSet};
    use tessera_groupify::{SecondaryDistributionStatistics, Statistics, StatisticsKind};

    fn table(keys: &[u32]) -> Groupify {
        let subset = RowSet::full(keys.len());
        let sensitive = DataMatrix::new(keys.len(), 1);
        let stats = SecondaryDistributionStatistics::new(&subset, &sensitive);
        let mut table = Groupify::new(1, 1);
        for (row, &key) in keys.iter().enumerate() {
            stats.from_scan(&mut table, &[key], row);
        }
        table
    }

    fn permissive(capacity: usize) -> HistoryConfig {
        HistoryConfig {
            capacity,
            max_dataset_ratio: 1.0,
            max_snapshot_ratio: 1.0,
        }
    }

    fn layout() -> SnapshotLayout {
        StatisticsKind::CountSecondaryDistribution.layout(1)
    }

    #[test]
    fn test_no_history() {
        let mut history = NoHistory::new();
        let node = Node::new(vec![0]);
        assert!(!history.store(&node, &table(&[1, 2]), layout()).unwrap());
        assert!(history.lookup(&node).is_none());
    }

    #[test]
    fn test_lookup_requires_dominance() {
        let mut history = SnapshotHistory::new(4, permissive(4));
        let stored = Node::new(vec![1, 0]);
        assert!(history.store(&stored, &table(&[1, 2, 1, 2]), layout()).unwrap());

        assert!(history.lookup(&Node::new(vec![1, 1])).is_some());
        assert!(history.lookup(&Node::new(vec![1, 0])).is_some());
        assert!(history.lookup(&Node::new(vec![0, 1])).is_none());
        let (snapshot, source) = history.lookup(&Node::new(vec![2, 2])).unwrap();
        assert_eq!(source, &stored);
        assert_eq!(snapshot.record_count(), 2);
    }

    #[test]
    fn test_lookup_prefers_smallest_snapshot() {
        let mut history = SnapshotHistory::new(4, permissive(4));
        history.store(&Node::new(vec![0, 0]), &table(&[1, 2, 3, 4]), layout()).unwrap();
        history.store(&Node::new(vec![0, 1]), &table(&[1, 1, 3, 3]), layout()).unwrap();
        let (snapshot, source) = history.lookup(&Node::new(vec![1, 1])).unwrap();
        assert_eq!(source, &Node::new(vec![0, 1]));
        assert_eq!(snapshot.record_count(), 2);
    }

    #[test]
    fn test_store_policy() {
        let config = HistoryConfig {
            capacity: 4,
            max_dataset_ratio: 0.5,
            max_snapshot_ratio: 0.8,
        };
        let mut history = SnapshotHistory::new(4, config);
        // 4 classes over 4 rows exceeds the dataset ratio
        assert!(!history.store(&Node::new(vec![0]), &table(&[1, 2, 3, 4]), layout()).unwrap());
        assert!(history.store(&Node::new(vec![1]), &table(&[1, 1, 2, 2]), layout()).unwrap());
        // Same size as the snapshot it derives from
        assert!(!history.store(&Node::new(vec![2]), &table(&[1, 1, 2, 2]), layout()).unwrap());
        assert!(history.store(&Node::new(vec![3]), &table(&[1, 1, 1, 1]), layout()).unwrap());
        // Already stored
        assert!(!history.store(&Node::new(vec![3]), &table(&[1, 1, 1, 1]), layout()).unwrap());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_fifo_eviction_releases_dictionary() {
        let mut history = SnapshotHistory::new(8, permissive(2));
        history.store(&Node::new(vec![0, 0]), &table(&[1, 2]), layout()).unwrap();
        history.store(&Node::new(vec![0, 1]), &table(&[1, 1]), layout()).unwrap();
        history.store(&Node::new(vec![1, 0]), &table(&[3, 3]), layout()).unwrap();

        assert_eq!(history.len(), 2);
        assert!(!history.contains(&Node::new(vec![0, 0])));
        let nodes: vec::Vec<&Node> = history.nodes().collect();
        assert_eq!(nodes, vec![&Node::new(vec![0, 1]), &Node::new(vec![1, 0])]);
        for entry in &history.entries {
            assert!(history.dictionary.validate(&entry.snapshot).is_ok());
        }

        history.clear();
        assert!(history.is_empty());
        assert!(history.dictionary().values().is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut history = SnapshotHistory::new(8, permissive(0));
        assert!(!history.store(&Node::new(vec![0]), &table(&[1]), layout()).unwrap());
    }
}
