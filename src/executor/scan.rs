// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::error::{QueryError, Result};
use super::{BoxedExecutor, ChildResponse, LabelSet, QueryResult, RangeVector, Sample};
use crate::memtable::ChunkedMemtable;
use crate::types::DataValue;

/// Leaf execution plan reading one partition out of the memtable.
///
/// Emits a single response holding one range vector with the caller's
/// label map and `(row key, value column)` samples in `(segment, row key)`
/// order, or no range vector at all if the partition has no persisted rows.
pub struct MemtableScanExec {
    memtable: Arc<ChunkedMemtable>,
    partition: DataValue,
    segment_range: Option<(DataValue, DataValue)>,
    labels: LabelSet,
    value_column: usize,
}

impl MemtableScanExec {
    pub fn new(
        memtable: Arc<ChunkedMemtable>,
        partition: DataValue,
        segment_range: Option<(DataValue, DataValue)>,
        labels: LabelSet,
        value_column: usize,
    ) -> Self {
        Self {
            memtable,
            partition,
            segment_range,
            labels,
            value_column,
        }
    }

    pub fn execute(self) -> BoxedExecutor {
        stream::once(async move {
            match self.scan() {
                Ok(result) => ChildResponse::Data(result),
                Err(error) => ChildResponse::Error(error),
            }
        })
        .boxed()
    }

    fn scan(&self) -> Result<QueryResult> {
        let views = match &self.segment_range {
            Some((start, end)) => self.memtable.read_range(&self.partition, start, end)?,
            None => self.memtable.read_partition(&self.partition)?,
        };
        let row_key_column = self.memtable.projection().row_key_ordinal();

        let mut samples = Vec::with_capacity(views.len());
        for view in views {
            let timestamp = match view.value(row_key_column) {
                DataValue::Timestamp(ts) | DataValue::Int64(ts) => ts,
                DataValue::Int32(ts) => ts as i64,
                other => {
                    return Err(QueryError::bad_query(format!(
                        "row key {} is not a timestamp",
                        other
                    )))
                }
            };
            let value = match view.value(self.value_column) {
                DataValue::Float64(value) => value.0,
                DataValue::Int64(value) => value as f64,
                DataValue::Int32(value) => value as f64,
                // gaps in a series stay gaps
                DataValue::Null => continue,
                other => {
                    return Err(QueryError::bad_query(format!(
                        "column {} holds non-numeric value {}",
                        self.value_column, other
                    )))
                }
            };
            samples.push(Sample::new(timestamp, value));
        }

        let range_vectors = if samples.is_empty() {
            Vec::new()
        } else {
            vec![RangeVector::new(self.labels.clone(), samples)]
        };
        Ok(QueryResult { range_vectors })
    }
}
