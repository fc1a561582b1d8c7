//! Statistics delegates.
//!
//! A delegate folds one unit of input (a scanned row, an entry of the
//! previous table, or a snapshot record) into the output table. The five
//! supported requirement combinations each get their own implementation so
//! the row loops are monomorphized per combination and never branch on which
//! optional statistics are enabled.

use crate::entry::GroupifyEntry;
use crate::table::Groupify;
use tessera_core::{DataMatrix, Error, Requirements, Result, RowSet};
use tessera_snapshot::{SnapshotDictionary, SnapshotLayout, SnapshotRecord};

/// Folds input units into an equivalence-class table.
pub trait Statistics {
    /// Adds one scanned row whose transformed value is `key`.
    fn from_scan(&self, table: &mut Groupify, key: &[u32], row: usize);

    /// Folds a class of the previous table, now transformed to `key`.
    fn from_entry(&self, table: &mut Groupify, key: &[u32], entry: &GroupifyEntry);

    /// Folds one snapshot record, now transformed to `key`.
    fn from_snapshot(
        &self,
        table: &mut Groupify,
        key: &[u32],
        record: SnapshotRecord<'_>,
        dictionary: &SnapshotDictionary,
    );
}

/// The requirement combinations a delegate exists for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatisticsKind {
    /// COUNTER
    Count,
    /// COUNTER | SECONDARY_COUNTER
    CountSecondary,
    /// COUNTER | SECONDARY_COUNTER | DISTRIBUTION
    CountSecondaryDistribution,
    /// COUNTER | DISTRIBUTION
    CountDistribution,
    /// DISTRIBUTION. Class sizes are still maintained.
    Distribution,
}

impl StatisticsKind {
    /// Picks the delegate for a requirement bitmask.
    pub fn select(requirements: Requirements) -> Result<Self> {
        const C: u8 = Requirements::COUNTER.bits();
        const S: u8 = Requirements::SECONDARY_COUNTER.bits();
        const D: u8 = Requirements::DISTRIBUTION.bits();

        match requirements.bits() {
            b if b == C => Ok(StatisticsKind::Count),
            b if b == C | S => Ok(StatisticsKind::CountSecondary),
            b if b == C | S | D => Ok(StatisticsKind::CountSecondaryDistribution),
            b if b == C | D => Ok(StatisticsKind::CountDistribution),
            b if b == D => Ok(StatisticsKind::Distribution),
            b => Err(Error::unsupported_requirements(b)),
        }
    }

    /// Whether this delegate maintains the secondary count.
    #[inline]
    pub fn has_secondary(self) -> bool {
        matches!(
            self,
            StatisticsKind::CountSecondary | StatisticsKind::CountSecondaryDistribution
        )
    }

    /// Whether this delegate maintains distributions.
    #[inline]
    pub fn has_distribution(self) -> bool {
        matches!(
            self,
            StatisticsKind::CountSecondaryDistribution
                | StatisticsKind::CountDistribution
                | StatisticsKind::Distribution
        )
    }

    /// Snapshot layout this delegate encodes and decodes.
    pub fn layout(self, sensitive: usize) -> SnapshotLayout {
        let sensitive = if self.has_distribution() { sensitive } else { 0 };
        SnapshotLayout::new(self.has_secondary(), sensitive)
    }
}

/// Class sizes only.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountStatistics;

impl Statistics for CountStatistics {
    #[inline]
    fn from_scan(&self, table: &mut Groupify, key: &[u32], row: usize) {
        table.accumulate(key, row).count += 1;
    }

    #[inline]
    fn from_entry(&self, table: &mut Groupify, key: &[u32], entry: &GroupifyEntry) {
        table.accumulate(key, entry.representative).count += entry.count;
    }

    #[inline]
    fn from_snapshot(
        &self,
        table: &mut Groupify,
        key: &[u32],
        record: SnapshotRecord<'_>,
        _dictionary: &SnapshotDictionary,
    ) {
        table.accumulate(key, record.representative()).count += record.count();
    }
}

/// Class sizes and secondary sizes over a row subset.
#[derive(Clone, Copy, Debug)]
pub struct SecondaryCountStatistics<'a> {
    subset: &'a RowSet,
}

impl<'a> SecondaryCountStatistics<'a> {
    pub fn new(subset: &'a RowSet) -> Self {
        Self { subset }
    }
}

impl Statistics for SecondaryCountStatistics<'_> {
    #[inline]
    fn from_scan(&self, table: &mut Groupify, key: &[u32], row: usize) {
        let entry = table.accumulate(key, row);
        entry.count += 1;
        entry.pcount += self.subset.contains(row) as u32;
    }

    #[inline]
    fn from_entry(&self, table: &mut Groupify, key: &[u32], source: &GroupifyEntry) {
        let entry = table.accumulate(key, source.representative);
        entry.count += source.count;
        entry.pcount += source.pcount;
    }

    #[inline]
    fn from_snapshot(
        &self,
        table: &mut Groupify,
        key: &[u32],
        record: SnapshotRecord<'_>,
        _dictionary: &SnapshotDictionary,
    ) {
        let entry = table.accumulate(key, record.representative());
        entry.count += record.count();
        entry.pcount += record.pcount();
    }
}

/// Class sizes and sensitive-value distributions.
#[derive(Clone, Copy, Debug)]
pub struct DistributionStatistics<'a> {
    sensitive: &'a DataMatrix,
}

impl<'a> DistributionStatistics<'a> {
    pub fn new(sensitive: &'a DataMatrix) -> Self {
        Self { sensitive }
    }
}

impl Statistics for DistributionStatistics<'_> {
    #[inline]
    fn from_scan(&self, table: &mut Groupify, key: &[u32], row: usize) {
        let entry = table.accumulate(key, row);
        entry.count += 1;
        add_row(entry, self.sensitive.row(row));
    }

    #[inline]
    fn from_entry(&self, table: &mut Groupify, key: &[u32], source: &GroupifyEntry) {
        let entry = table.accumulate(key, source.representative);
        entry.count += source.count;
        merge_distributions(entry, source);
    }

    #[inline]
    fn from_snapshot(
        &self,
        table: &mut Groupify,
        key: &[u32],
        record: SnapshotRecord<'_>,
        dictionary: &SnapshotDictionary,
    ) {
        let entry = table.accumulate(key, record.representative());
        entry.count += record.count();
        add_record(entry, record, dictionary);
    }
}

/// Class sizes, secondary sizes and distributions.
#[derive(Clone, Copy, Debug)]
pub struct SecondaryDistributionStatistics<'a> {
    subset: &'a RowSet,
    sensitive: &'a DataMatrix,
}

impl<'a> SecondaryDistributionStatistics<'a> {
    pub fn new(subset: &'a RowSet, sensitive: &'a DataMatrix) -> Self {
        Self { subset, sensitive }
    }
}

impl Statistics for SecondaryDistributionStatistics<'_> {
    #[inline]
    fn from_scan(&self, table: &mut Groupify, key: &[u32], row: usize) {
        let entry = table.accumulate(key, row);
        entry.count += 1;
        entry.pcount += self.subset.contains(row) as u32;
        add_row(entry, self.sensitive.row(row));
    }

    #[inline]
    fn from_entry(&self, table: &mut Groupify, key: &[u32], source: &GroupifyEntry) {
        let entry = table.accumulate(key, source.representative);
        entry.count += source.count;
        entry.pcount += source.pcount;
        merge_distributions(entry, source);
    }

    #[inline]
    fn from_snapshot(
        &self,
        table: &mut Groupify,
        key: &[u32],
        record: SnapshotRecord<'_>,
        dictionary: &SnapshotDictionary,
    ) {
        let entry = table.accumulate(key, record.representative());
        entry.count += record.count();
        entry.pcount += record.pcount();
        add_record(entry, record, dictionary);
    }
}

#[inline]
fn add_row(entry: &mut GroupifyEntry, values: &[u32]) {
    for (distribution, &value) in entry.distributions.iter_mut().zip(values) {
        distribution.add(value, 1);
    }
}

#[inline]
fn merge_distributions(entry: &mut GroupifyEntry, source: &GroupifyEntry) {
    for (distribution, other) in entry.distributions.iter_mut().zip(&source.distributions) {
        distribution.merge(other);
    }
}

// Ids were checked with `SnapshotDictionary::validate` before the scan.
#[inline]
fn add_record(entry: &mut GroupifyEntry, record: SnapshotRecord<'_>, dictionary: &SnapshotDictionary) {
    for (attribute, distribution) in entry.distributions.iter_mut().enumerate() {
        let (values_id, freqs_id) = record.distribution_ids(attribute);
        if let Some((values, frequencies)) = dictionary.resolve(values_id, freqs_id) {
            distribution.add_packed(values, frequencies);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use tessera_snapshot::Snapshot;

    fn sensitive() -> DataMatrix {
        DataMatrix::from_rows(&[vec![10], vec![11], vec![10], vec![12]]).unwrap()
    }

    fn scan_all<S: Statistics>(stats: &S, keys: &[u32], sensitive: usize) -> Groupify {
        let mut table = Groupify::new(1, sensitive);
        for (row, &key) in keys.iter().enumerate() {
            stats.from_scan(&mut table, &[key], row);
        }
        table
    }

    #[test]
    fn test_select() {
        let c = Requirements::COUNTER;
        let s = Requirements::SECONDARY_COUNTER;
        let d = Requirements::DISTRIBUTION;
        assert_eq!(StatisticsKind::select(c).unwrap(), StatisticsKind::Count);
        assert_eq!(StatisticsKind::select(c | s).unwrap(), StatisticsKind::CountSecondary);
        assert_eq!(
            StatisticsKind::select(c | s | d).unwrap(),
            StatisticsKind::CountSecondaryDistribution
        );
        assert_eq!(StatisticsKind::select(c | d).unwrap(), StatisticsKind::CountDistribution);
        assert_eq!(StatisticsKind::select(d).unwrap(), StatisticsKind::Distribution);
    }

    #[test]
    fn test_select_rejects_unknown_combinations() {
        for bits in [0u8, 0b010, 0b110, 0b1000, 0b1001] {
            assert_eq!(
                StatisticsKind::select(Requirements::from_bits(bits)),
                Err(Error::unsupported_requirements(bits))
            );
        }
    }

    #[test]
    fn test_layouts() {
        assert_eq!(StatisticsKind::Count.layout(2).stride(), 2);
        assert_eq!(StatisticsKind::CountSecondary.layout(2).stride(), 3);
        assert_eq!(StatisticsKind::CountDistribution.layout(2).stride(), 6);
        assert_eq!(StatisticsKind::CountSecondaryDistribution.layout(2).stride(), 7);
        assert_eq!(StatisticsKind::Distribution.layout(1).stride(), 4);
    }

    #[test]
    fn test_delegates_agree_on_sizes() {
        let keys = [1, 2, 1, 1];
        let subset = RowSet::from_flags(&[true, true, false, true]);
        let sensitive = sensitive();

        let count = scan_all(&CountStatistics, &keys, 0);
        let secondary = scan_all(&SecondaryCountStatistics::new(&subset), &keys, 0);
        let distribution = scan_all(&DistributionStatistics::new(&sensitive), &keys, 1);
        let both = scan_all(
            &SecondaryDistributionStatistics::new(&subset, &sensitive),
            &keys,
            1,
        );

        for table in [&count, &secondary, &distribution, &both] {
            assert_eq!(table.get(&[1]).unwrap().count(), 3);
            assert_eq!(table.get(&[2]).unwrap().count(), 1);
        }
        assert_eq!(count.get(&[1]).unwrap().pcount(), 0);
        assert_eq!(secondary.get(&[1]).unwrap().pcount(), 2);
        assert_eq!(both.get(&[1]).unwrap().pcount(), 2);
        assert_eq!(
            distribution.get(&[1]).unwrap().distribution(0).unwrap().sorted(),
            vec![(10, 2), (12, 1)]
        );
        assert_eq!(both.classes()[0].distributions, vec![vec![(10, 2), (12, 1)]]);
    }

    #[test]
    fn test_from_entry_folds_classes() {
        let subset = RowSet::full(4);
        let sensitive = sensitive();
        let stats = SecondaryDistributionStatistics::new(&subset, &sensitive);
        let fine = scan_all(&stats, &[1, 2, 3, 1], 1);

        // Roll every class up into one
        let mut coarse = Groupify::new(1, 1);
        for entry in fine.entries() {
            stats.from_entry(&mut coarse, &[0], entry);
        }
        assert_eq!(coarse.len(), 1);
        let entry = &coarse.entries()[0];
        assert_eq!(entry.count(), 4);
        assert_eq!(entry.pcount(), 4);
        assert_eq!(entry.representative(), 0);
        assert_eq!(entry.distribution(0).unwrap().total(), 4);
    }

    #[test]
    fn test_from_snapshot_resolves_distributions() {
        let mut dictionary = SnapshotDictionary::new();
        let (v, f) = dictionary.intern(&[10, 12], &[2, 1]);
        let layout = StatisticsKind::CountSecondaryDistribution.layout(1);
        let snapshot = Snapshot::from_words(layout, vec![0, 3, 2, v, f]).unwrap();

        let subset = RowSet::full(4);
        let sensitive = sensitive();
        let stats = SecondaryDistributionStatistics::new(&subset, &sensitive);
        let mut table = Groupify::new(1, 1);
        for record in snapshot.records() {
            stats.from_snapshot(&mut table, &[7], record, &dictionary);
        }
        let entry = table.get(&[7]).unwrap();
        assert_eq!(entry.count(), 3);
        assert_eq!(entry.pcount(), 2);
        assert_eq!(entry.distribution(0).unwrap().sorted(), vec![(10, 2), (12, 1)]);
    }
}
