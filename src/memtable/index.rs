// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::collections::BTreeMap;

use super::chunk::Locator;
use crate::types::DataValue;

/// Sorted row index: `(partition, segment) → row key → locator`.
///
/// Nested ordered maps, so full scans walk partitions, segments and row
/// keys in lexicographic `(P, S, R)` order.
#[derive(Default)]
pub struct RowIndex {
    partitions: BTreeMap<DataValue, BTreeMap<DataValue, BTreeMap<DataValue, Locator>>>,
}

impl RowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a locator; a later insert for the same `(p, s, r)` overwrites
    /// (last-writer-wins within a flush batch).
    pub fn insert(
        &mut self,
        partition: DataValue,
        segment: DataValue,
        row_key: DataValue,
        locator: Locator,
    ) {
        self.partitions
            .entry(partition)
            .or_default()
            .entry(segment)
            .or_default()
            .insert(row_key, locator);
    }

    /// All `(row key, locator)` pairs of one segment in row-key order.
    pub fn lookup(
        &self,
        partition: &DataValue,
        segment: &DataValue,
    ) -> impl Iterator<Item = (&DataValue, Locator)> + '_ {
        self.partitions
            .get(partition)
            .and_then(|segments| segments.get(segment))
            .into_iter()
            .flat_map(|rows| rows.iter().map(|(key, locator)| (key, *locator)))
    }

    /// All rows of the segments in `[segment_start, segment_end]` of one
    /// partition, in `(S, R)` order.
    pub fn lookup_range<'a>(
        &'a self,
        partition: &DataValue,
        segment_start: &DataValue,
        segment_end: &DataValue,
    ) -> impl Iterator<Item = (&'a DataValue, &'a DataValue, Locator)> + 'a {
        let range = segment_start.clone()..=segment_end.clone();
        self.partitions
            .get(partition)
            .into_iter()
            .flat_map(move |segments| {
                segments.range(range.clone()).flat_map(|(segment, rows)| {
                    rows.iter()
                        .map(move |(key, locator)| (segment, key, *locator))
                })
            })
    }

    /// All rows of one partition in `(S, R)` order.
    pub fn lookup_partition(
        &self,
        partition: &DataValue,
    ) -> impl Iterator<Item = (&DataValue, &DataValue, Locator)> + '_ {
        self.partitions
            .get(partition)
            .into_iter()
            .flat_map(|segments| {
                segments.iter().flat_map(|(segment, rows)| {
                    rows.iter()
                        .map(move |(key, locator)| (segment, key, *locator))
                })
            })
    }

    /// Every entry in deterministic `(P, S, R)` order.
    pub fn scan_all(
        &self,
    ) -> impl Iterator<Item = (&DataValue, &DataValue, &DataValue, Locator)> + '_ {
        self.partitions.iter().flat_map(|(partition, segments)| {
            segments.iter().flat_map(move |(segment, rows)| {
                rows.iter()
                    .map(move |(key, locator)| (partition, segment, key, *locator))
            })
        })
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: &str) -> DataValue {
        DataValue::String(v.into())
    }

    fn s(v: i32) -> DataValue {
        DataValue::Int32(v)
    }

    fn k(v: i64) -> DataValue {
        DataValue::Timestamp(v)
    }

    #[test]
    fn scan_order_is_lexicographic() {
        let mut index = RowIndex::new();
        index.insert(p("b"), s(0), k(1), Locator::new(0, 0));
        index.insert(p("a"), s(1), k(2), Locator::new(0, 1));
        index.insert(p("a"), s(0), k(9), Locator::new(0, 2));
        index.insert(p("a"), s(0), k(3), Locator::new(0, 3));

        let keys: Vec<_> = index
            .scan_all()
            .map(|(partition, segment, key, _)| {
                (partition.clone(), segment.clone(), key.clone())
            })
            .collect();
        assert_eq!(
            keys,
            vec![
                (p("a"), s(0), k(3)),
                (p("a"), s(0), k(9)),
                (p("a"), s(1), k(2)),
                (p("b"), s(0), k(1)),
            ]
        );
    }

    #[test]
    fn insert_overwrites_same_key() {
        let mut index = RowIndex::new();
        index.insert(p("a"), s(0), k(1), Locator::new(0, 0));
        index.insert(p("a"), s(0), k(1), Locator::new(1, 5));
        let found: Vec<_> = index.lookup(&p("a"), &s(0)).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, Locator::new(1, 5));
    }

    #[test]
    fn range_lookup_is_inclusive() {
        let mut index = RowIndex::new();
        for segment in 0..4 {
            index.insert(p("a"), s(segment), k(1), Locator::new(0, segment as u32));
        }
        let segments: Vec<_> = index
            .lookup_range(&p("a"), &s(1), &s(2))
            .map(|(segment, _, _)| segment.clone())
            .collect();
        assert_eq!(segments, vec![s(1), s(2)]);
    }
}
