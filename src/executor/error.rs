// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use crate::memtable::MemtableError;

/// The result type of query execution.
pub type Result<T, E = QueryError> = std::result::Result<T, E>;

/// The error type of query execution.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("invalid join: {0}")]
    InvalidJoin(String),
    #[error("expected {expected} responses from child plans but received {actual}")]
    InsufficientResponses { expected: usize, actual: usize },
    #[error("bad query: {0}")]
    BadQuery(String),
    #[error("storage error: {0}")]
    Memtable(#[from] MemtableError),
}

impl QueryError {
    pub fn invalid_join(message: impl ToString) -> Self {
        QueryError::InvalidJoin(message.to_string())
    }

    pub fn bad_query(message: impl ToString) -> Self {
        QueryError::BadQuery(message.to_string())
    }
}
