// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::cmp::Ordering;
use std::sync::Arc;

use super::error::{MemtableError, MemtableResult};
use crate::types::{DataType, DataValue, Row};
use crate::vector;

/// A descriptor of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    name: String,
    datatype: DataType,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        ColumnDesc {
            name: name.into(),
            datatype,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> &DataType {
        &self.datatype
    }
}

/// Read-only description of a dataset: the ordered column schema plus the
/// ordinals of the partition-key, segment-key and row-key columns.
///
/// Key extraction is a pure projection of the row at the key ordinal, and
/// key comparison is the total order on [`DataValue`].
#[derive(Debug, Clone)]
pub struct Projection {
    columns: Arc<[ColumnDesc]>,
    partition_key: usize,
    segment_key: usize,
    row_key: usize,
}

impl Projection {
    /// Validate and build a projection. Every column must use the native
    /// vector encoding and the key ordinals must name schema columns.
    pub fn try_new(
        columns: impl Into<Arc<[ColumnDesc]>>,
        partition_key: usize,
        segment_key: usize,
        row_key: usize,
    ) -> MemtableResult<Self> {
        let columns = columns.into();
        if columns.is_empty() {
            return Err(MemtableError::InvalidProjection(
                "schema has no columns".into(),
            ));
        }
        for column in columns.iter() {
            if !vector::supports(column.datatype().kind()) {
                return Err(MemtableError::SchemaIncompatible {
                    column: column.name().to_string(),
                    kind: column.datatype().kind(),
                });
            }
        }
        for (role, ordinal) in [
            ("partition key", partition_key),
            ("segment key", segment_key),
            ("row key", row_key),
        ] {
            if ordinal >= columns.len() {
                return Err(MemtableError::InvalidProjection(format!(
                    "{} ordinal {} is out of range ({} columns)",
                    role,
                    ordinal,
                    columns.len()
                )));
            }
        }
        Ok(Self {
            columns,
            partition_key,
            segment_key,
            row_key,
        })
    }

    /// The ordered column schema.
    pub fn columns(&self) -> &Arc<[ColumnDesc]> {
        &self.columns
    }

    pub fn partition_key_ordinal(&self) -> usize {
        self.partition_key
    }

    pub fn segment_key_ordinal(&self) -> usize {
        self.segment_key
    }

    pub fn row_key_ordinal(&self) -> usize {
        self.row_key
    }

    fn key_of(&self, row: &Row, ordinal: usize) -> MemtableResult<DataValue> {
        let value = row.get(ordinal).ok_or(MemtableError::RowArity {
            expected: self.columns.len(),
            actual: row.len(),
        })?;
        if value.is_null() {
            return Err(MemtableError::NullKey(
                self.columns[ordinal].name().to_string(),
            ));
        }
        Ok(value.clone())
    }

    pub fn partition_of(&self, row: &Row) -> MemtableResult<DataValue> {
        self.key_of(row, self.partition_key)
    }

    pub fn segment_of(&self, row: &Row) -> MemtableResult<DataValue> {
        self.key_of(row, self.segment_key)
    }

    pub fn row_key_of(&self, row: &Row) -> MemtableResult<DataValue> {
        self.key_of(row, self.row_key)
    }

    /// All three keys of a row at once.
    pub fn keys_of(&self, row: &Row) -> MemtableResult<(DataValue, DataValue, DataValue)> {
        Ok((
            self.partition_of(row)?,
            self.segment_of(row)?,
            self.row_key_of(row)?,
        ))
    }

    pub fn compare_partition(&self, a: &DataValue, b: &DataValue) -> Ordering {
        a.cmp(b)
    }

    pub fn compare_segment(&self, a: &DataValue, b: &DataValue) -> Ordering {
        a.cmp(b)
    }

    pub fn compare_row_key(&self, a: &DataValue, b: &DataValue) -> Ordering {
        a.cmp(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataTypeExt, DataTypeKind};

    fn schema() -> Vec<ColumnDesc> {
        vec![
            ColumnDesc::new("series", DataTypeKind::String.not_null()),
            ColumnDesc::new("timestamp", DataTypeKind::Timestamp.not_null()),
            ColumnDesc::new("value", DataTypeKind::Float64.nullable()),
        ]
    }

    #[test]
    fn rejects_unencodable_column() {
        let mut columns = schema();
        columns.push(ColumnDesc::new("raw", DataTypeKind::Blob.not_null()));
        let err = Projection::try_new(columns, 0, 0, 1).unwrap_err();
        assert!(matches!(err, MemtableError::SchemaIncompatible { .. }));
    }

    #[test]
    fn rejects_out_of_range_key() {
        let err = Projection::try_new(schema(), 0, 5, 1).unwrap_err();
        assert!(matches!(err, MemtableError::InvalidProjection(_)));
    }

    #[test]
    fn extracts_keys() {
        let projection = Projection::try_new(schema(), 0, 0, 1).unwrap();
        let row = vec![
            DataValue::String("cpu".into()),
            DataValue::Timestamp(42),
            DataValue::Float64(0.5.into()),
        ];
        assert_eq!(
            projection.partition_of(&row).unwrap(),
            DataValue::String("cpu".into())
        );
        assert_eq!(projection.row_key_of(&row).unwrap(), DataValue::Timestamp(42));

        let bad = vec![DataValue::Null, DataValue::Timestamp(1), DataValue::Null];
        assert!(matches!(
            projection.partition_of(&bad),
            Err(MemtableError::NullKey(_))
        ));
    }
}
