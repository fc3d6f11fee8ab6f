// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;

use bytes::Bytes;
use smallvec::SmallVec;

use super::error::{MemtableError, MemtableResult};
use super::projection::ColumnDesc;
use crate::types::{DataValue, Row};
use crate::vector::VectorReader;

/// Packed physical row address: high 32 bits chunk id, low 32 bits row
/// number within the chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locator(u64);

impl Locator {
    pub fn new(chunk_id: u32, row_no: u32) -> Self {
        Self(((chunk_id as u64) << 32) | row_no as u64)
    }

    pub fn chunk_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn row_no(self) -> u32 {
        self.0 as u32
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chunk_id(), self.row_no())
    }
}

/// An immutable columnar block: one encoded vector per schema column.
pub struct Chunk {
    columns: SmallVec<[Bytes; 8]>,
    len: u16,
}

impl Chunk {
    pub fn columns(&self) -> &[Bytes] {
        &self.columns
    }

    pub fn len(&self) -> u16 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Random-access reader over one chunk. Parsed once when the chunk is
/// published and shared by all row views into it.
pub struct ChunkReader {
    chunk: Arc<Chunk>,
    vectors: Vec<VectorReader>,
}

impl ChunkReader {
    fn new(chunk: Arc<Chunk>, schema: &[ColumnDesc]) -> MemtableResult<Self> {
        let vectors = chunk
            .columns()
            .iter()
            .zip(schema)
            .map(|(buf, column)| VectorReader::new(column.datatype(), buf.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { chunk, vectors })
    }

    pub fn num_rows(&self) -> usize {
        self.chunk.len() as usize
    }

    /// Decode the cell at `(column, row)`. O(1).
    pub fn value(&self, column: usize, row_no: u32) -> DataValue {
        self.vectors[column].get(row_no as usize)
    }

    /// Decode a whole row.
    pub fn row(&self, row_no: u32) -> Row {
        self.vectors
            .iter()
            .map(|vector| vector.get(row_no as usize))
            .collect()
    }

    /// A cheap view positioned at `row_no`.
    pub fn position(self: &Arc<Self>, row_no: u32) -> RowView {
        RowView {
            reader: self.clone(),
            row_no,
        }
    }
}

/// A borrowed-by-`Arc` view of one physical row. Stays readable even if the
/// underlying chunk is popped from the store afterwards.
#[derive(Clone)]
pub struct RowView {
    reader: Arc<ChunkReader>,
    row_no: u32,
}

impl RowView {
    pub fn value(&self, column: usize) -> DataValue {
        self.reader.value(column, self.row_no)
    }

    pub fn values(&self) -> Row {
        self.reader.row(self.row_no)
    }

    pub fn row_no(&self) -> u32 {
        self.row_no
    }
}

/// Append-only sequence of chunks, indexed by monotonic id. Ids equal the
/// chunk's position, and the id of a popped partial chunk is reused by its
/// replacement, so ids stay dense; downstream persisters must treat the
/// last chunk as mutable-until-full.
pub struct ChunkStore {
    schema: Arc<[ColumnDesc]>,
    chunks: Vec<Arc<Chunk>>,
    readers: Vec<Arc<ChunkReader>>,
}

impl ChunkStore {
    pub fn new(schema: Arc<[ColumnDesc]>) -> Self {
        Self {
            schema,
            chunks: Vec::new(),
            readers: Vec::new(),
        }
    }

    /// Publish a new chunk; returns its id.
    pub fn append(
        &mut self,
        columns: impl IntoIterator<Item = Bytes>,
        len: u16,
    ) -> MemtableResult<u32> {
        let chunk = Arc::new(Chunk {
            columns: columns.into_iter().collect(),
            len,
        });
        let reader = Arc::new(ChunkReader::new(chunk.clone(), &self.schema)?);
        let id = self.chunks.len() as u32;
        self.chunks.push(chunk);
        self.readers.push(reader);
        Ok(id)
    }

    /// Remove and return the most recent chunk.
    pub fn pop_last(&mut self) -> MemtableResult<(u32, Arc<Chunk>)> {
        let chunk = self.chunks.pop().ok_or(MemtableError::EmptyStore)?;
        self.readers.pop();
        Ok((self.chunks.len() as u32, chunk))
    }

    pub fn last(&self) -> Option<&Arc<Chunk>> {
        self.chunks.last()
    }

    pub fn reader(&self, chunk_id: u32) -> MemtableResult<Arc<ChunkReader>> {
        self.readers
            .get(chunk_id as usize)
            .cloned()
            .ok_or(MemtableError::ChunkNotFound(chunk_id))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total rows across all chunks.
    pub fn num_rows(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len() as usize).sum()
    }

    /// Lengths of all chunks in id order.
    pub fn chunk_lengths(&self) -> Vec<u16> {
        self.chunks.iter().map(|chunk| chunk.len()).collect()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.readers.clear();
    }
}
