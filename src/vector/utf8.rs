// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use bitvec::prelude::{BitVec, Lsb0};
use bytes::{Bytes, BytesMut};

use super::{VectorError, MAX_VECTOR_ROWS};

/// Encodes var-length UTF-8 data into a vector. The payload is
/// `(len + 1)` u32 end offsets followed by the string bytes; null cells are
/// empty with a zero validity bit.
pub struct Utf8VectorBuilder {
    valid: BitVec<u8, Lsb0>,
    /// End offset of each item pushed so far.
    offsets: Vec<u32>,
    data: Vec<u8>,
}

impl Utf8VectorBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            valid: BitVec::with_capacity(capacity),
            offsets: Vec::with_capacity(capacity),
            data: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Option<&str>) {
        self.valid.push(value.is_some());
        self.data.extend(value.unwrap_or_default().as_bytes());
        self.offsets.push(self.data.len() as u32);
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    pub fn reset(&mut self) {
        self.valid.clear();
        self.offsets.clear();
        self.data.clear();
    }

    /// Materialize the encoded vector. Does not reset the builder.
    pub fn emit(&self) -> Result<Bytes, VectorError> {
        let len = self.len();
        if len > MAX_VECTOR_ROWS {
            return Err(VectorError::TooManyRows(len));
        }
        if self.data.len() > u32::MAX as usize {
            return Err(VectorError::PayloadTooLarge(self.data.len()));
        }
        let bitmap = self.valid.as_raw_slice();
        let mut buf =
            BytesMut::with_capacity(4 + bitmap.len() + 4 * (len + 1) + self.data.len());
        buf.extend_from_slice(&(len as u32).to_le_bytes());
        buf.extend_from_slice(bitmap);
        buf.extend_from_slice(&0u32.to_le_bytes());
        for end in &self.offsets {
            buf.extend_from_slice(&end.to_le_bytes());
        }
        buf.extend_from_slice(&self.data);
        Ok(buf.freeze())
    }
}

/// Zero-copy random-access reader over an encoded UTF-8 vector.
pub struct Utf8VectorReader {
    len: usize,
    valid: Bytes,
    offsets: Bytes,
    data: Bytes,
}

impl Utf8VectorReader {
    pub fn new(buf: Bytes) -> Result<Self, VectorError> {
        let (len, valid, payload) = super::split_header(&buf)?;
        let offsets_size = 4 * (len + 1);
        if payload.len() < offsets_size {
            return Err(VectorError::Corrupt(format!(
                "utf8 payload of {} bytes cannot hold {} offsets",
                payload.len(),
                len + 1
            )));
        }
        let offsets = payload.slice(..offsets_size);
        let data = payload.slice(offsets_size..);
        let reader = Self {
            len,
            valid,
            offsets,
            data,
        };
        if len > 0 && reader.offset_at(len) != reader.data.len() {
            return Err(VectorError::Corrupt(
                "utf8 offsets do not cover the data section".into(),
            ));
        }
        Ok(reader)
    }

    fn offset_at(&self, idx: usize) -> usize {
        let raw: [u8; 4] = self.offsets[idx * 4..idx * 4 + 4]
            .try_into()
            .expect("offset slice is 4 bytes");
        u32::from_le_bytes(raw) as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Retrieve the cell at `row`, `None` for nulls. O(1).
    pub fn get(&self, row: usize) -> Option<&str> {
        assert!(row < self.len, "row {} out of bounds ({})", row, self.len);
        if self.valid[row / 8] & (1 << (row % 8)) == 0 {
            return None;
        }
        let bytes = &self.data[self.offset_at(row)..self.offset_at(row + 1)];
        // emitted from &str, so the payload is valid UTF-8
        Some(std::str::from_utf8(bytes).expect("vector holds valid utf8"))
    }
}
