//! Generalize-and-group passes.
//!
//! A transformer rewrites the active columns of the output buffer to the
//! levels of a node and folds every processed unit into the output table
//! through the statistics delegate of the configured requirements. The
//! concrete kernel is picked once per call from the number of active columns,
//! so the per-row loop runs without any branching on configuration.

mod lookup;
mod scratch;

pub use scratch::TransformScratch;

use alloc::format;
use alloc::vec::Vec;
use lookup::{DynamicLookup, FixedLookup, RowLookup};
use tessera_core::{
    DataMatrix, Error, HierarchySet, Interrupt, Node, Projection, Result, RowSet,
};
use tessera_groupify::{
    CountStatistics, DistributionStatistics, Groupify, SecondaryCountStatistics,
    SecondaryDistributionStatistics, Statistics, StatisticsKind,
};
use tessera_snapshot::{Snapshot, SnapshotDictionary, SnapshotLayout};

use crate::transition::TransitionMode;

/// Number of units processed between two interrupt polls.
pub const CHUNK_SIZE: usize = 1 << 14;

/// What a transformation reads.
#[derive(Clone, Copy, Debug)]
pub enum Source<'s> {
    /// Dataset rows `start..stop`.
    Rows { start: usize, stop: usize },
    /// An explicit list of dataset rows.
    Representatives(&'s [usize]),
    /// The classes of a previous table.
    Table(&'s Groupify),
    /// The records of a snapshot.
    Snapshot {
        snapshot: &'s Snapshot,
        dictionary: &'s SnapshotDictionary,
    },
}

impl Source<'_> {
    /// The transition mode this source implements.
    pub fn mode(&self) -> TransitionMode {
        match self {
            Source::Rows { .. } | Source::Representatives(_) => TransitionMode::FullScan,
            Source::Table(_) => TransitionMode::Rollup,
            Source::Snapshot { .. } => TransitionMode::SnapshotScan,
        }
    }

    /// Number of units the source yields.
    pub fn len(&self) -> usize {
        match self {
            Source::Rows { start, stop } => stop.saturating_sub(*start),
            Source::Representatives(rows) => rows.len(),
            Source::Table(table) => table.len(),
            Source::Snapshot { snapshot, .. } => snapshot.record_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared inputs of every transformation over one dataset.
#[derive(Clone, Copy, Debug)]
pub struct Transformer<'a> {
    data: &'a DataMatrix,
    hierarchies: &'a HierarchySet,
    kind: StatisticsKind,
    subset: Option<&'a RowSet>,
    sensitive: Option<&'a DataMatrix>,
    interrupt: Option<&'a Interrupt>,
}

impl<'a> Transformer<'a> {
    /// Creates a transformer, failing unless every dataset value has a
    /// mapping in its column's hierarchy.
    pub fn new(
        data: &'a DataMatrix,
        hierarchies: &'a HierarchySet,
        kind: StatisticsKind,
    ) -> Result<Self> {
        hierarchies.validate_matrix(data)?;
        Ok(Self::new_unchecked(data, hierarchies, kind))
    }

    /// Creates a transformer over a dataset already validated against
    /// `hierarchies`.
    pub(crate) fn new_unchecked(
        data: &'a DataMatrix,
        hierarchies: &'a HierarchySet,
        kind: StatisticsKind,
    ) -> Self {
        Self {
            data,
            hierarchies,
            kind,
            subset: None,
            sensitive: None,
            interrupt: None,
        }
    }

    /// Rows counted by the secondary counter.
    pub fn with_subset(mut self, subset: Option<&'a RowSet>) -> Self {
        self.subset = subset;
        self
    }

    /// Sensitive values, one row per dataset row.
    pub fn with_sensitive(mut self, sensitive: Option<&'a DataMatrix>) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// Flag polled between chunks.
    pub fn with_interrupt(mut self, interrupt: Option<&'a Interrupt>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn kind(&self) -> StatisticsKind {
        self.kind
    }

    /// Snapshot layout matching the configured statistics.
    pub fn layout(&self) -> SnapshotLayout {
        self.kind
            .layout(self.sensitive.map(DataMatrix::columns).unwrap_or(0))
    }

    /// Creates an empty output table shaped for this transformer.
    pub fn new_table(&self) -> Groupify {
        Groupify::new(self.data.columns(), self.layout().sensitive())
    }

    /// Transforms `source` to `node` and folds it into `output`.
    ///
    /// Columns in `projection` are read from `buffer` as they are; the caller
    /// guarantees they already hold `node`'s levels for every row that is
    /// touched. Returns the number of units processed.
    pub fn apply(
        &self,
        scratch: &mut TransformScratch,
        node: &Node,
        projection: Projection,
        source: Source<'_>,
        buffer: &mut DataMatrix,
        output: &mut Groupify,
    ) -> Result<usize> {
        self.hierarchies.validate_node(node)?;
        self.validate(&source, buffer, output)?;

        scratch.prepare(node, projection);
        let mut maps: Vec<&[u32]> = Vec::with_capacity(scratch.active_columns().len());
        for (&column, &level) in scratch.active_columns().iter().zip(scratch.active_levels()) {
            let map = self.hierarchies.lookup(column, level).ok_or_else(|| {
                Error::invalid_node(format!("no level {} for column {}", level, column))
            })?;
            maps.push(map);
        }
        output.reserve(source.len());

        let columns = scratch.active_columns();
        match self.kind {
            StatisticsKind::Count => {
                self.dispatch(&CountStatistics, columns, &maps, source, buffer, output)
            }
            StatisticsKind::CountSecondary => {
                let stats = SecondaryCountStatistics::new(self.require_subset()?);
                self.dispatch(&stats, columns, &maps, source, buffer, output)
            }
            StatisticsKind::CountDistribution | StatisticsKind::Distribution => {
                let stats = DistributionStatistics::new(self.require_sensitive()?);
                self.dispatch(&stats, columns, &maps, source, buffer, output)
            }
            StatisticsKind::CountSecondaryDistribution => {
                let stats = SecondaryDistributionStatistics::new(
                    self.require_subset()?,
                    self.require_sensitive()?,
                );
                self.dispatch(&stats, columns, &maps, source, buffer, output)
            }
        }
    }

    fn require_subset(&self) -> Result<&'a RowSet> {
        self.subset.ok_or_else(|| {
            Error::invalid_configuration("secondary counter requires a row subset")
        })
    }

    fn require_sensitive(&self) -> Result<&'a DataMatrix> {
        self.sensitive.ok_or_else(|| {
            Error::invalid_configuration("distributions require sensitive values")
        })
    }

    fn validate(&self, source: &Source<'_>, buffer: &DataMatrix, output: &Groupify) -> Result<()> {
        let rows = self.data.rows();
        let columns = self.data.columns();
        if buffer.rows() != rows || buffer.columns() != columns {
            return Err(Error::invalid_configuration(format!(
                "buffer is {}x{}, dataset is {}x{}",
                buffer.rows(),
                buffer.columns(),
                rows,
                columns
            )));
        }
        if let Some(subset) = self.subset.filter(|s| s.len() != rows) {
            return Err(Error::invalid_configuration(format!(
                "subset covers {} rows, dataset has {}",
                subset.len(),
                rows
            )));
        }
        if let Some(sensitive) = self.sensitive.filter(|s| s.rows() != rows) {
            return Err(Error::invalid_configuration(format!(
                "sensitive values cover {} rows, dataset has {}",
                sensitive.rows(),
                rows
            )));
        }
        let layout = self.layout();
        if output.width() != columns || output.sensitive() != layout.sensitive() {
            return Err(Error::invalid_configuration(format!(
                "output table tracks {} columns and {} distributions, expected {} and {}",
                output.width(),
                output.sensitive(),
                columns,
                layout.sensitive()
            )));
        }

        match *source {
            Source::Rows { start, stop } => {
                if start > stop || stop > rows {
                    return Err(Error::invalid_configuration(format!(
                        "row range {}..{} outside 0..{}",
                        start, stop, rows
                    )));
                }
            }
            Source::Representatives(list) => {
                if let Some(&row) = list.iter().find(|&&row| row >= rows) {
                    return Err(Error::invalid_configuration(format!(
                        "row {} outside 0..{}",
                        row, rows
                    )));
                }
            }
            Source::Table(previous) => {
                if previous.width() != columns || previous.sensitive() != layout.sensitive() {
                    return Err(Error::invalid_configuration(
                        "previous table was built for another configuration",
                    ));
                }
            }
            Source::Snapshot {
                snapshot,
                dictionary,
            } => {
                layout.expect_stride(snapshot.stride())?;
                if snapshot.layout() != layout {
                    return Err(Error::invalid_snapshot(format!(
                        "snapshot layout {:?} does not match {:?}",
                        snapshot.layout(),
                        layout
                    )));
                }
                if let Some(record) = snapshot.records().find(|r| r.representative() >= rows) {
                    return Err(Error::invalid_snapshot(format!(
                        "representative {} outside 0..{}",
                        record.representative(),
                        rows
                    )));
                }
                dictionary.validate(snapshot)?;
            }
        }
        Ok(())
    }

    fn dispatch<S: Statistics>(
        &self,
        stats: &S,
        columns: &[usize],
        maps: &[&[u32]],
        source: Source<'_>,
        buffer: &mut DataMatrix,
        output: &mut Groupify,
    ) -> Result<usize> {
        macro_rules! fixed {
            ($n:literal) => {
                self.run(&FixedLookup::<$n>::new(columns, maps), stats, source, buffer, output)
            };
        }
        match columns.len() {
            0 => fixed!(0),
            1 => fixed!(1),
            2 => fixed!(2),
            3 => fixed!(3),
            4 => fixed!(4),
            5 => fixed!(5),
            6 => fixed!(6),
            7 => fixed!(7),
            8 => fixed!(8),
            _ => self.run(&DynamicLookup::new(columns, maps), stats, source, buffer, output),
        }
    }

    fn run<L: RowLookup, S: Statistics>(
        &self,
        lookup: &L,
        stats: &S,
        source: Source<'_>,
        buffer: &mut DataMatrix,
        output: &mut Groupify,
    ) -> Result<usize> {
        let data = self.data;
        match source {
            Source::Rows { start, stop } => {
                let mut chunk = start;
                while chunk < stop {
                    self.poll()?;
                    let end = (chunk + CHUNK_SIZE).min(stop);
                    for row in chunk..end {
                        lookup.apply(data.row(row), buffer.row_mut(row));
                        stats.from_scan(output, buffer.row(row), row);
                    }
                    chunk = end;
                }
                Ok(stop - start)
            }
            Source::Representatives(rows) => {
                for chunk in rows.chunks(CHUNK_SIZE) {
                    self.poll()?;
                    for &row in chunk {
                        lookup.apply(data.row(row), buffer.row_mut(row));
                        stats.from_scan(output, buffer.row(row), row);
                    }
                }
                Ok(rows.len())
            }
            Source::Table(previous) => {
                for chunk in previous.entries().chunks(CHUNK_SIZE) {
                    self.poll()?;
                    for entry in chunk {
                        let row = entry.representative();
                        lookup.apply(data.row(row), buffer.row_mut(row));
                        stats.from_entry(output, buffer.row(row), entry);
                    }
                }
                Ok(previous.len())
            }
            Source::Snapshot {
                snapshot,
                dictionary,
            } => {
                let mut processed = 0;
                for record in snapshot.records() {
                    if processed % CHUNK_SIZE == 0 {
                        self.poll()?;
                    }
                    let row = record.representative();
                    lookup.apply(data.row(row), buffer.row_mut(row));
                    stats.from_snapshot(output, buffer.row(row), record, dictionary);
                    processed += 1;
                }
                Ok(processed)
            }
        }
    }

    #[inline]
    fn poll(&self) -> Result<()> {
        match self.interrupt {
            Some(interrupt) => interrupt.check(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tessera_core::Hierarchy;

    /// 12 columns of `value >> level` hierarchies over 0..16.
    fn wide() -> (DataMatrix, HierarchySet) {
        let columns = 12;
        let rows: Vec<Vec<u32>> = (0..40u32)
            .map(|r| (0..columns as u32).map(|c| (r * 7 + c * 3) % 16).collect())
            .collect();
        let data = DataMatrix::from_rows(&rows).unwrap();
        let hierarchies = (0..columns)
            .map(|c| {
                let levels = (0..4).map(|l| (0..16u32).map(|v| v >> l).collect()).collect();
                Hierarchy::from_levels(c, levels).unwrap()
            })
            .collect();
        (data, hierarchies)
    }

    fn scan(
        transformer: &Transformer<'_>,
        node: &Node,
        projection: Projection,
        buffer: &mut DataMatrix,
    ) -> Groupify {
        let mut output = transformer.new_table();
        let mut scratch = TransformScratch::new();
        let rows = buffer.rows();
        transformer
            .apply(
                &mut scratch,
                node,
                projection,
                Source::Rows { start: 0, stop: rows },
                buffer,
                &mut output,
            )
            .unwrap();
        output
    }

    #[test]
    fn test_fixed_and_dynamic_kernels_agree() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let node = Node::new(vec![1, 2, 0, 3, 1, 1, 2, 0, 3, 2, 1, 0]);

        // 12 active columns runs the dynamic kernel
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let dynamic = scan(&transformer, &node, Projection::EMPTY, &mut buffer);

        // Carrying 5 columns over leaves 7 for a fixed kernel
        let carried = Projection::from_bits(0b1_0101_0101);
        let mut partial = buffer.clone();
        for row in 0..partial.rows() {
            for column in carried.active_columns(12) {
                partial.set(row, column, u32::MAX);
            }
        }
        let fixed = scan(&transformer, &node, carried, &mut partial);

        assert_eq!(dynamic.classes(), fixed.classes());
        assert_eq!(buffer, partial);
    }

    #[test]
    fn test_split_ranges_merge_to_full_scan() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let node = Node::new(vec![2; 12]);
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let full = scan(&transformer, &node, Projection::EMPTY, &mut buffer);

        let mut scratch = TransformScratch::new();
        let mut left = transformer.new_table();
        let mut right = transformer.new_table();
        transformer
            .apply(&mut scratch, &node, Projection::EMPTY, Source::Rows { start: 0, stop: 17 }, &mut buffer, &mut left)
            .unwrap();
        transformer
            .apply(&mut scratch, &node, Projection::EMPTY, Source::Rows { start: 17, stop: 40 }, &mut buffer, &mut right)
            .unwrap();
        left.merge_from(&right).unwrap();
        assert_eq!(left.classes(), full.classes());
    }

    #[test]
    fn test_representatives_scan() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let mut output = transformer.new_table();
        let processed = transformer
            .apply(
                &mut TransformScratch::new(),
                &Node::new(vec![3; 12]),
                Projection::EMPTY,
                Source::Representatives(&[0, 5, 39]),
                &mut buffer,
                &mut output,
            )
            .unwrap();
        assert_eq!(processed, 3);
        assert_eq!(output.total_count(), 3);
        assert_eq!(buffer.row(5), &data.row(5).iter().map(|v| v >> 3).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_rollup_of_previous_table() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let fine = scan(&transformer, &Node::new(vec![0; 12]), Projection::EMPTY, &mut buffer);

        let coarse_node = Node::new(vec![3; 12]);
        let mut rolled = transformer.new_table();
        let processed = transformer
            .apply(
                &mut TransformScratch::new(),
                &coarse_node,
                Projection::EMPTY,
                Source::Table(&fine),
                &mut buffer,
                &mut rolled,
            )
            .unwrap();
        assert_eq!(processed, fine.len());

        let mut cold_buffer = DataMatrix::new(data.rows(), data.columns());
        let cold = scan(&transformer, &coarse_node, Projection::EMPTY, &mut cold_buffer);
        assert_eq!(rolled.classes(), cold.classes());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let node = Node::new(vec![0; 12]);
        let mut scratch = TransformScratch::new();
        let mut output = transformer.new_table();

        let mut small = DataMatrix::new(3, 12);
        assert!(transformer
            .apply(&mut scratch, &node, Projection::EMPTY, Source::Rows { start: 0, stop: 3 }, &mut small, &mut output)
            .is_err());

        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        assert!(transformer
            .apply(&mut scratch, &node, Projection::EMPTY, Source::Rows { start: 0, stop: 41 }, &mut buffer, &mut output)
            .is_err());
        assert!(transformer
            .apply(&mut scratch, &Node::new(vec![4; 12]), Projection::EMPTY, Source::Rows { start: 0, stop: 1 }, &mut buffer, &mut output)
            .is_err());

        let secondary = Transformer::new(&data, &hierarchies, StatisticsKind::CountSecondary).unwrap();
        let result = secondary.apply(
            &mut scratch,
            &node,
            Projection::EMPTY,
            Source::Rows { start: 0, stop: 1 },
            &mut buffer,
            &mut output,
        );
        assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_snapshot_stride_mismatch() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let dictionary = SnapshotDictionary::new();
        let snapshot = Snapshot::from_words(SnapshotLayout::new(true, 0), vec![0, 1, 1]).unwrap();
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let mut output = transformer.new_table();
        let result = transformer.apply(
            &mut TransformScratch::new(),
            &Node::new(vec![0; 12]),
            Projection::EMPTY,
            Source::Snapshot {
                snapshot: &snapshot,
                dictionary: &dictionary,
            },
            &mut buffer,
            &mut output,
        );
        assert_eq!(result, Err(Error::stride_mismatch(2, 3)));
    }

    #[test]
    fn test_interrupt_aborts_scan() {
        let (data, hierarchies) = wide();
        let interrupt = Interrupt::new();
        interrupt.interrupt();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count)
            .unwrap()
            .with_interrupt(Some(&interrupt));
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let mut output = transformer.new_table();
        let result = transformer.apply(
            &mut TransformScratch::new(),
            &Node::new(vec![0; 12]),
            Projection::EMPTY,
            Source::Rows { start: 0, stop: 40 },
            &mut buffer,
            &mut output,
        );
        assert_eq!(result, Err(Error::Interrupted));
    }

    #[test]
    fn test_interrupt_aborts_rollup_and_snapshot_scan() {
        let (data, hierarchies) = wide();
        let transformer = Transformer::new(&data, &hierarchies, StatisticsKind::Count).unwrap();
        let mut buffer = DataMatrix::new(data.rows(), data.columns());
        let fine = scan(&transformer, &Node::new(vec![0; 12]), Projection::EMPTY, &mut buffer);
        let mut dictionary = SnapshotDictionary::new();
        let snapshot = fine.to_snapshot(transformer.layout(), &mut dictionary).unwrap();

        let interrupt = Interrupt::new();
        interrupt.interrupt();
        let transformer = transformer.with_interrupt(Some(&interrupt));
        let coarse = Node::new(vec![1; 12]);
        let sources = [
            Source::Table(&fine),
            Source::Snapshot {
                snapshot: &snapshot,
                dictionary: &dictionary,
            },
        ];
        for source in sources {
            let mut output = transformer.new_table();
            let result = transformer.apply(
                &mut TransformScratch::new(),
                &coarse,
                Projection::EMPTY,
                source,
                &mut buffer,
                &mut output,
            );
            assert_eq!(result, Err(Error::Interrupted), "{:?}", source.mode());
        }
    }

    #[test]
    fn test_rejects_value_missing_from_hierarchy() {
        let data = DataMatrix::from_rows(&[vec![0], vec![7]]).unwrap();
        let hierarchies = HierarchySet::new(vec![Hierarchy::identity(2)]);
        let result = Transformer::new(&data, &hierarchies, StatisticsKind::Count);
        assert_eq!(
            result.err(),
            Some(Error::MissingHierarchyValue {
                column: 0,
                row: 1,
                value: 7
            })
        );
    }
}
