// Copyright 2026 TempoLight Project Authors. Licensed under Apache-2.0.

use std::marker::PhantomData;

use bitvec::prelude::{BitVec, Lsb0};
use bytes::{Bytes, BytesMut};

use super::encode::PrimitiveFixedWidthEncode;
use super::{VectorError, MAX_VECTOR_ROWS};

/// Eagerly encodes fixed-width data into a vector. The payload is simply an
/// array of little-endian fixed-width cells; null cells hold the type
/// default and a zero validity bit.
pub struct PrimitiveVectorBuilder<T: PrimitiveFixedWidthEncode> {
    valid: BitVec<u8, Lsb0>,
    data: Vec<u8>,
    _phantom: PhantomData<T>,
}

impl<T: PrimitiveFixedWidthEncode> PrimitiveVectorBuilder<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            valid: BitVec::with_capacity(capacity),
            data: Vec::with_capacity(capacity * T::WIDTH),
            _phantom: PhantomData,
        }
    }

    pub fn push(&mut self, value: Option<&T>) {
        self.valid.push(value.is_some());
        value.unwrap_or(T::DEFAULT_VALUE).encode(&mut self.data);
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    pub fn reset(&mut self) {
        self.valid.clear();
        self.data.clear();
    }

    /// Materialize the encoded vector. Does not reset the builder.
    pub fn emit(&self) -> Result<Bytes, VectorError> {
        let len = self.len();
        if len > MAX_VECTOR_ROWS {
            return Err(VectorError::TooManyRows(len));
        }
        let bitmap = self.valid.as_raw_slice();
        let mut buf = BytesMut::with_capacity(4 + bitmap.len() + self.data.len());
        buf.extend_from_slice(&(len as u32).to_le_bytes());
        buf.extend_from_slice(bitmap);
        buf.extend_from_slice(&self.data);
        Ok(buf.freeze())
    }
}

/// Zero-copy random-access reader over an encoded fixed-width vector.
pub struct PrimitiveVectorReader<T: PrimitiveFixedWidthEncode> {
    len: usize,
    valid: Bytes,
    data: Bytes,
    _phantom: PhantomData<T>,
}

impl<T: PrimitiveFixedWidthEncode> PrimitiveVectorReader<T> {
    pub fn new(buf: Bytes) -> Result<Self, VectorError> {
        let (len, valid, payload) = super::split_header(&buf)?;
        if payload.len() != len * T::WIDTH {
            return Err(VectorError::Corrupt(format!(
                "fixed-width payload of {} bytes does not hold {} cells",
                payload.len(),
                len
            )));
        }
        Ok(Self {
            len,
            valid,
            data: payload,
            _phantom: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Retrieve the cell at `row`, `None` for nulls. O(1).
    pub fn get(&self, row: usize) -> Option<T> {
        assert!(row < self.len, "row {} out of bounds ({})", row, self.len);
        if self.valid[row / 8] & (1 << (row % 8)) == 0 {
            return None;
        }
        let mut cell = &self.data[row * T::WIDTH..(row + 1) * T::WIDTH];
        Some(T::decode(&mut cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_read_with_nulls() {
        let mut builder = PrimitiveVectorBuilder::<i64>::with_capacity(4);
        builder.push(Some(&42));
        builder.push(None);
        builder.push(Some(&-1));
        let reader = PrimitiveVectorReader::<i64>::new(builder.emit().unwrap()).unwrap();
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.get(0), Some(42));
        assert_eq!(reader.get(1), None);
        assert_eq!(reader.get(2), Some(-1));
    }

    #[test]
    fn emit_does_not_reset() {
        let mut builder = PrimitiveVectorBuilder::<f64>::with_capacity(2);
        builder.push(Some(&1.5));
        let first = builder.emit().unwrap();
        builder.push(Some(&2.5));
        let second = builder.emit().unwrap();
        assert_eq!(
            PrimitiveVectorReader::<f64>::new(first).unwrap().len(),
            1
        );
        let reader = PrimitiveVectorReader::<f64>::new(second).unwrap();
        assert_eq!(reader.get(1), Some(2.5));
    }

    #[test]
    fn reset_discards_prior_state() {
        let mut builder = PrimitiveVectorBuilder::<i32>::with_capacity(2);
        builder.push(Some(&7));
        builder.reset();
        builder.push(Some(&8));
        let reader = PrimitiveVectorReader::<i32>::new(builder.emit().unwrap()).unwrap();
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.get(0), Some(8));
    }
}
