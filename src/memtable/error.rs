// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use crate::types::DataTypeKind;
use crate::vector::VectorError;

#[derive(thiserror::Error, Debug)]
pub enum MemtableError {
    #[error("column '{column}' of type {kind:?} is not supported by the native vector encoding")]
    SchemaIncompatible { column: String, kind: DataTypeKind },
    #[error("projection is invalid: {0}")]
    InvalidProjection(String),
    #[error("failed to encode chunk: {0}")]
    Encode(#[from] VectorError),
    #[error("row has {actual} columns, expected {expected}")]
    RowArity { expected: usize, actual: usize },
    #[error("key column '{0}' must not be null")]
    NullKey(String),
    #[error("chunk {0} not found")]
    ChunkNotFound(u32),
    #[error("chunk store is empty")]
    EmptyStore,
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type MemtableResult<T> = std::result::Result<T, MemtableError>;
