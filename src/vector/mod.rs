// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

//! Filo-style encoded columnar vectors.
//!
//! A vector is a self-contained byte buffer with O(1) random access:
//!
//! ```plain
//! | len (u32 LE) | validity bitmap (ceil(len/8) bytes, LSB-first) | payload |
//! ```
//!
//! Fixed-width payloads are dense little-endian cells; UTF-8 payloads are
//! `(len + 1)` u32 end offsets followed by the string bytes. Builders encode
//! eagerly, so `emit` is a cheap assembly step and the output depends only
//! on rows pushed since the last `reset`.

use bytes::Bytes;

use crate::types::{DataType, DataTypeKind, DataValue};

mod encode;
mod primitive;
mod utf8;

pub use encode::PrimitiveFixedWidthEncode;
pub use primitive::{PrimitiveVectorBuilder, PrimitiveVectorReader};
pub use utf8::{Utf8VectorBuilder, Utf8VectorReader};

/// Chunk lengths are u16, so no vector may exceed this row count.
pub const MAX_VECTOR_ROWS: usize = u16::MAX as usize;

#[derive(thiserror::Error, Debug)]
pub enum VectorError {
    #[error("type {0:?} has no native vector encoding")]
    Unsupported(DataTypeKind),
    #[error("cannot push {value} into a {expected:?} vector")]
    TypeMismatch {
        expected: DataTypeKind,
        value: DataValue,
    },
    #[error("vector of {0} rows exceeds the maximum chunk row count")]
    TooManyRows(usize),
    #[error("vector payload of {0} bytes exceeds the u32 offset range")]
    PayloadTooLarge(usize),
    #[error("encoded vector is corrupt: {0}")]
    Corrupt(String),
}

/// Whether the given kind has a native vector encoding.
pub fn supports(kind: DataTypeKind) -> bool {
    !matches!(kind, DataTypeKind::Blob)
}

/// Split an encoded vector into `(len, validity bitmap, payload)`.
fn split_header(buf: &Bytes) -> Result<(usize, Bytes, Bytes), VectorError> {
    if buf.len() < 4 {
        return Err(VectorError::Corrupt("vector shorter than its header".into()));
    }
    let raw: [u8; 4] = buf[..4].try_into().expect("header slice is 4 bytes");
    let len = u32::from_le_bytes(raw) as usize;
    let bitmap_len = (len + 7) / 8;
    if buf.len() < 4 + bitmap_len {
        return Err(VectorError::Corrupt(format!(
            "vector of {} rows is missing its validity bitmap",
            len
        )));
    }
    Ok((len, buf.slice(4..4 + bitmap_len), buf.slice(4 + bitmap_len..)))
}

/// Embeds the vector builders of all supported types.
pub enum VectorBuilderImpl {
    Bool(PrimitiveVectorBuilder<bool>),
    Int32(PrimitiveVectorBuilder<i32>),
    Int64(PrimitiveVectorBuilder<i64>),
    Timestamp(PrimitiveVectorBuilder<i64>),
    Float64(PrimitiveVectorBuilder<f64>),
    Utf8(Utf8VectorBuilder),
}

impl VectorBuilderImpl {
    /// Create a builder for the given column type.
    pub fn new(ty: &DataType, capacity: usize) -> Result<Self, VectorError> {
        Ok(match ty.kind() {
            DataTypeKind::Bool => Self::Bool(PrimitiveVectorBuilder::with_capacity(capacity)),
            DataTypeKind::Int32 => Self::Int32(PrimitiveVectorBuilder::with_capacity(capacity)),
            DataTypeKind::Int64 => Self::Int64(PrimitiveVectorBuilder::with_capacity(capacity)),
            DataTypeKind::Timestamp => {
                Self::Timestamp(PrimitiveVectorBuilder::with_capacity(capacity))
            }
            DataTypeKind::Float64 => {
                Self::Float64(PrimitiveVectorBuilder::with_capacity(capacity))
            }
            DataTypeKind::String => Self::Utf8(Utf8VectorBuilder::with_capacity(capacity)),
            kind => return Err(VectorError::Unsupported(kind)),
        })
    }

    fn kind(&self) -> DataTypeKind {
        match self {
            Self::Bool(_) => DataTypeKind::Bool,
            Self::Int32(_) => DataTypeKind::Int32,
            Self::Int64(_) => DataTypeKind::Int64,
            Self::Timestamp(_) => DataTypeKind::Timestamp,
            Self::Float64(_) => DataTypeKind::Float64,
            Self::Utf8(_) => DataTypeKind::String,
        }
    }

    /// Appends a cell to the back of the vector.
    pub fn push(&mut self, value: &DataValue) -> Result<(), VectorError> {
        match (self, value) {
            (Self::Bool(b), DataValue::Bool(v)) => b.push(Some(v)),
            (Self::Int32(b), DataValue::Int32(v)) => b.push(Some(v)),
            (Self::Int64(b), DataValue::Int64(v)) => b.push(Some(v)),
            (Self::Timestamp(b), DataValue::Timestamp(v)) => b.push(Some(v)),
            (Self::Float64(b), DataValue::Float64(v)) => b.push(Some(&v.0)),
            (Self::Utf8(b), DataValue::String(v)) => b.push(Some(v)),
            (Self::Bool(b), DataValue::Null) => b.push(None),
            (Self::Int32(b), DataValue::Null) => b.push(None),
            (Self::Int64(b), DataValue::Null) => b.push(None),
            (Self::Timestamp(b), DataValue::Null) => b.push(None),
            (Self::Float64(b), DataValue::Null) => b.push(None),
            (Self::Utf8(b), DataValue::Null) => b.push(None),
            (builder, value) => {
                return Err(VectorError::TypeMismatch {
                    expected: builder.kind(),
                    value: value.clone(),
                })
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(b) => b.len(),
            Self::Int32(b) => b.len(),
            Self::Int64(b) => b.len(),
            Self::Timestamp(b) => b.len(),
            Self::Float64(b) => b.len(),
            Self::Utf8(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all buffered cells.
    pub fn reset(&mut self) {
        match self {
            Self::Bool(b) => b.reset(),
            Self::Int32(b) => b.reset(),
            Self::Int64(b) => b.reset(),
            Self::Timestamp(b) => b.reset(),
            Self::Float64(b) => b.reset(),
            Self::Utf8(b) => b.reset(),
        }
    }

    /// Materialize the encoded vector. Does not reset.
    pub fn emit(&self) -> Result<Bytes, VectorError> {
        match self {
            Self::Bool(b) => b.emit(),
            Self::Int32(b) => b.emit(),
            Self::Int64(b) => b.emit(),
            Self::Timestamp(b) => b.emit(),
            Self::Float64(b) => b.emit(),
            Self::Utf8(b) => b.emit(),
        }
    }
}

/// Embeds the vector readers of all supported types.
pub enum VectorReader {
    Bool(PrimitiveVectorReader<bool>),
    Int32(PrimitiveVectorReader<i32>),
    Int64(PrimitiveVectorReader<i64>),
    Timestamp(PrimitiveVectorReader<i64>),
    Float64(PrimitiveVectorReader<f64>),
    Utf8(Utf8VectorReader),
}

impl VectorReader {
    /// Parse an encoded vector of the given column type.
    pub fn new(ty: &DataType, buf: Bytes) -> Result<Self, VectorError> {
        Ok(match ty.kind() {
            DataTypeKind::Bool => Self::Bool(PrimitiveVectorReader::new(buf)?),
            DataTypeKind::Int32 => Self::Int32(PrimitiveVectorReader::new(buf)?),
            DataTypeKind::Int64 => Self::Int64(PrimitiveVectorReader::new(buf)?),
            DataTypeKind::Timestamp => Self::Timestamp(PrimitiveVectorReader::new(buf)?),
            DataTypeKind::Float64 => Self::Float64(PrimitiveVectorReader::new(buf)?),
            DataTypeKind::String => Self::Utf8(Utf8VectorReader::new(buf)?),
            kind => return Err(VectorError::Unsupported(kind)),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Bool(r) => r.len(),
            Self::Int32(r) => r.len(),
            Self::Int64(r) => r.len(),
            Self::Timestamp(r) => r.len(),
            Self::Float64(r) => r.len(),
            Self::Utf8(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the cell at `row`. O(1).
    pub fn get(&self, row: usize) -> DataValue {
        match self {
            Self::Bool(r) => r.get(row).map_or(DataValue::Null, DataValue::Bool),
            Self::Int32(r) => r.get(row).map_or(DataValue::Null, DataValue::Int32),
            Self::Int64(r) => r.get(row).map_or(DataValue::Null, DataValue::Int64),
            Self::Timestamp(r) => r.get(row).map_or(DataValue::Null, DataValue::Timestamp),
            Self::Float64(r) => r
                .get(row)
                .map_or(DataValue::Null, |v| DataValue::Float64(v.into())),
            Self::Utf8(r) => r
                .get(row)
                .map_or(DataValue::Null, |v| DataValue::String(v.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataTypeExt;

    #[test]
    fn dispatch_roundtrip() {
        let ty = DataTypeKind::Timestamp.not_null();
        let mut builder = VectorBuilderImpl::new(&ty, 2).unwrap();
        builder.push(&DataValue::Timestamp(1000)).unwrap();
        builder.push(&DataValue::Timestamp(2000)).unwrap();
        let reader = VectorReader::new(&ty, builder.emit().unwrap()).unwrap();
        assert_eq!(reader.get(1), DataValue::Timestamp(2000));
    }

    #[test]
    fn push_rejects_mismatched_value() {
        let ty = DataTypeKind::Int64.not_null();
        let mut builder = VectorBuilderImpl::new(&ty, 2).unwrap();
        let err = builder.push(&DataValue::String("x".into())).unwrap_err();
        assert!(matches!(err, VectorError::TypeMismatch { .. }));
    }

    #[test]
    fn blob_has_no_encoding() {
        let ty = DataTypeKind::Blob.not_null();
        assert!(!supports(ty.kind()));
        assert!(matches!(
            VectorBuilderImpl::new(&ty, 1),
            Err(VectorError::Unsupported(DataTypeKind::Blob))
        ));
    }
}
