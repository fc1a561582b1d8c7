//! Snapshot encoding of equivalence-class tables.

use crate::table::Groupify;
use alloc::format;
use alloc::vec::Vec;
use tessera_core::{Error, Result};
use tessera_snapshot::{Snapshot, SnapshotDictionary, SnapshotLayout};

impl Groupify {
    /// Encodes the table as a snapshot, interning its distributions.
    ///
    /// Records follow the table's insertion order. The caller owns the
    /// dictionary references taken here and must release them together with
    /// the snapshot.
    pub fn to_snapshot(
        &self,
        layout: SnapshotLayout,
        dictionary: &mut SnapshotDictionary,
    ) -> Result<Snapshot> {
        if layout.sensitive() > self.sensitive() {
            return Err(Error::invalid_configuration(format!(
                "layout expects {} distributions, table tracks {}",
                layout.sensitive(),
                self.sensitive()
            )));
        }
        if self.entries().iter().any(|e| e.representative > u32::MAX as usize) {
            return Err(Error::invalid_configuration(
                "representative row index does not fit the snapshot format",
            ));
        }

        let mut snapshot = Snapshot::with_capacity(layout, self.len());
        let mut record: Vec<u32> = alloc::vec![0; layout.stride()];
        for entry in self.entries() {
            record[SnapshotLayout::REPRESENTATIVE] = entry.representative as u32;
            record[SnapshotLayout::COUNT] = entry.count;
            if let Some(offset) = layout.secondary_offset() {
                record[offset] = entry.pcount;
            }
            for attribute in 0..layout.sensitive() {
                let (values, frequencies) = entry.distributions[attribute].pack();
                let (values_id, freqs_id) = dictionary.intern(&values, &frequencies);
                let offset = layout.distribution_offset(attribute);
                record[offset] = values_id;
                record[offset + 1] = freqs_id;
            }
            snapshot.push_record(&record);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{SecondaryDistributionStatistics, Statistics, StatisticsKind};
    use alloc::vec;
    use tessera_core::{DataMatrix, RowSet};

    #[test]
    fn test_encode_records_in_order() {
        let subset = RowSet::from_flags(&[true, false, true]);
        let sensitive = DataMatrix::from_rows(&[vec![4], vec![4], vec![6]]).unwrap();
        let stats = SecondaryDistributionStatistics::new(&subset, &sensitive);

        let mut table = Groupify::new(1, 1);
        stats.from_scan(&mut table, &[9], 0);
        stats.from_scan(&mut table, &[9], 1);
        stats.from_scan(&mut table, &[3], 2);

        let mut dictionary = SnapshotDictionary::new();
        let layout = StatisticsKind::CountSecondaryDistribution.layout(1);
        let snapshot = table.to_snapshot(layout, &mut dictionary).unwrap();

        assert_eq!(snapshot.record_count(), 2);
        assert_eq!(snapshot.total_count(), 3);
        let first = snapshot.records().next().unwrap();
        assert_eq!(first.representative(), 0);
        assert_eq!(first.count(), 2);
        assert_eq!(first.pcount(), 1);
        let (v, f) = first.distribution_ids(0);
        assert_eq!(dictionary.resolve(v, f), Some((&[4][..], &[2][..])));
        assert!(dictionary.validate(&snapshot).is_ok());
    }

    #[test]
    fn test_encode_shares_equal_distributions() {
        let sensitive = DataMatrix::from_rows(&[vec![1], vec![1]]).unwrap();
        let stats = crate::statistics::DistributionStatistics::new(&sensitive);
        let mut table = Groupify::new(1, 1);
        stats.from_scan(&mut table, &[0], 0);
        stats.from_scan(&mut table, &[1], 1);

        let mut dictionary = SnapshotDictionary::new();
        let snapshot = table
            .to_snapshot(StatisticsKind::CountDistribution.layout(1), &mut dictionary)
            .unwrap();
        assert_eq!(dictionary.values().len(), 1);
        let ids: Vec<(u32, u32)> = snapshot.records().map(|r| r.distribution_ids(0)).collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(dictionary.values().refs(ids[0].0), 2);
    }

    #[test]
    fn test_encode_rejects_wider_layout() {
        let table = Groupify::new(1, 0);
        let mut dictionary = SnapshotDictionary::new();
        let layout = SnapshotLayout::new(false, 1);
        assert!(table.to_snapshot(layout, &mut dictionary).is_err());
    }
}
