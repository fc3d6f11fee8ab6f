// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use bytes::Bytes;
use itertools::Itertools;

use super::error::{MemtableError, MemtableResult};
use super::projection::Projection;
use crate::types::Row;
use crate::vector::VectorBuilderImpl;

/// Accumulates rows column by column and materializes them as the encoded
/// vectors of one chunk.
pub struct ChunkBuilder {
    builders: Vec<VectorBuilderImpl>,
    capacity: usize,
}

impl ChunkBuilder {
    /// The projection is validated at construction, so builders exist for
    /// every column.
    pub fn new(projection: &Projection, capacity: usize) -> MemtableResult<Self> {
        assert_ne!(capacity, 0);
        let builders = projection
            .columns()
            .iter()
            .map(|column| VectorBuilderImpl::new(column.datatype(), capacity))
            .try_collect()?;
        Ok(Self { builders, capacity })
    }

    /// Append one row. The caller keeps `len() < capacity`.
    pub fn add_row(&mut self, row: &Row) -> MemtableResult<()> {
        assert!(self.len() < self.capacity, "chunk builder is full");
        if row.len() != self.builders.len() {
            return Err(MemtableError::RowArity {
                expected: self.builders.len(),
                actual: row.len(),
            });
        }
        for (builder, value) in self.builders.iter_mut().zip(row) {
            builder.push(value)?;
        }
        Ok(())
    }

    /// Current row count.
    pub fn len(&self) -> usize {
        self.builders.first().map_or(0, |builder| builder.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all buffered rows.
    pub fn reset(&mut self) {
        for builder in &mut self.builders {
            builder.reset();
        }
    }

    /// Materialize each column's encoded vector in schema order. Does not
    /// reset; the output depends only on rows added since the last `reset`.
    pub fn emit(&self) -> MemtableResult<Vec<Bytes>> {
        self.builders
            .iter()
            .map(|builder| builder.emit().map_err(MemtableError::from))
            .try_collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memtable::projection::ColumnDesc;
    use crate::types::{DataTypeExt, DataTypeKind, DataValue};
    use crate::vector::VectorReader;

    fn projection() -> Projection {
        Projection::try_new(
            vec![
                ColumnDesc::new("series", DataTypeKind::String.not_null()),
                ColumnDesc::new("timestamp", DataTypeKind::Timestamp.not_null()),
                ColumnDesc::new("value", DataTypeKind::Float64.nullable()),
            ],
            0,
            0,
            1,
        )
        .unwrap()
    }

    fn row(ts: i64, value: f64) -> Row {
        vec![
            DataValue::String("cpu".into()),
            DataValue::Timestamp(ts),
            DataValue::Float64(value.into()),
        ]
    }

    #[test]
    fn emits_one_vector_per_column() {
        let projection = projection();
        let mut builder = ChunkBuilder::new(&projection, 4).unwrap();
        builder.add_row(&row(1, 0.5)).unwrap();
        builder.add_row(&row(2, 1.5)).unwrap();
        assert_eq!(builder.len(), 2);

        let columns = builder.emit().unwrap();
        assert_eq!(columns.len(), 3);
        let timestamps =
            VectorReader::new(projection.columns()[1].datatype(), columns[1].clone()).unwrap();
        assert_eq!(timestamps.get(1), DataValue::Timestamp(2));
    }

    #[test]
    fn rejects_short_rows() {
        let projection = projection();
        let mut builder = ChunkBuilder::new(&projection, 4).unwrap();
        let err = builder
            .add_row(&vec![DataValue::String("cpu".into())])
            .unwrap_err();
        assert!(matches!(err, MemtableError::RowArity { .. }));
    }
}
