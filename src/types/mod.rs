// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

//! Logical column types and values.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A wrapper around `f64` providing implementations of `Eq`, `Ord` and `Hash`.
pub type F64 = OrderedFloat<f64>;

/// The set of logical column types understood by the ingestion core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTypeKind {
    Bool,
    Int32,
    Int64,
    /// Milliseconds since the Unix epoch. Stored like `Int64`, but kept as a
    /// distinct kind so row keys read back as timestamps.
    Timestamp,
    Float64,
    String,
    /// Opaque binary. Has no native vector encoding; a projection naming a
    /// blob column fails construction.
    Blob,
}

/// Data type with nullability.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub kind: DataTypeKind,
    pub nullable: bool,
}

impl std::fmt::Debug for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if self.nullable {
            write!(f, " (null)")?;
        }
        Ok(())
    }
}

impl DataType {
    pub const fn new(kind: DataTypeKind, nullable: bool) -> DataType {
        DataType { kind, nullable }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn kind(&self) -> DataTypeKind {
        self.kind
    }
}

/// The extension methods for [`DataType`].
pub trait DataTypeExt {
    fn nullable(self) -> DataType;
    fn not_null(self) -> DataType;
}

impl DataTypeExt for DataTypeKind {
    fn nullable(self) -> DataType {
        DataType::new(self, true)
    }

    fn not_null(self) -> DataType {
        DataType::new(self, false)
    }
}

/// Primitive cell value.
///
/// The derived `Ord` is the total order used by key comparators; floats are
/// totally ordered through [`OrderedFloat`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataValue {
    // NOTE: Null comes first.
    // => NULL is less than any non-NULL values
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Timestamp(i64),
    Float64(F64),
    String(String),
    Blob(Vec<u8>),
}

/// Ingested row type, indexed by column ordinal.
pub type Row = Vec<DataValue>;

impl DataValue {
    /// Returns `true` if value is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type of value. `None` means NULL.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(DataTypeKind::Bool.not_null()),
            Self::Int32(_) => Some(DataTypeKind::Int32.not_null()),
            Self::Int64(_) => Some(DataTypeKind::Int64.not_null()),
            Self::Timestamp(_) => Some(DataTypeKind::Timestamp.not_null()),
            Self::Float64(_) => Some(DataTypeKind::Float64.not_null()),
            Self::String(_) => Some(DataTypeKind::String.not_null()),
            Self::Blob(_) => Some(DataTypeKind::Blob.not_null()),
        }
    }

    /// Whether the value can live in a column of the given type.
    pub fn fits(&self, ty: &DataType) -> bool {
        match self.data_type() {
            None => ty.is_nullable(),
            Some(own) => own.kind() == ty.kind(),
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "'{v}'"),
            Self::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}
