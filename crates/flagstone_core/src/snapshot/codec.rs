//! Big-endian cursor reader and writer used by the snapshot format.

use crate::ecs::Column;
use crate::snapshot::SnapshotError;

/// Growable big-endian writer.
pub(crate) struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Append the first `count` values of `values`.
    #[inline]
    fn put_all<T: Copy, const N: usize>(
        &mut self,
        values: &[T],
        count: usize,
        encode: fn(T) -> [u8; N],
    ) {
        for &value in &values[..count.min(values.len())] {
            self.buf.extend_from_slice(&encode(value));
        }
    }

    /// Append rows `0..count` of `column` at its element width.
    pub fn put_column(&mut self, column: &Column, count: usize) {
        match column {
            Column::I8(v) => self.put_all(v, count, i8::to_be_bytes),
            Column::U8(v) => self.put_all(v, count, u8::to_be_bytes),
            Column::I16(v) => self.put_all(v, count, i16::to_be_bytes),
            Column::U16(v) => self.put_all(v, count, u16::to_be_bytes),
            Column::I32(v) => self.put_all(v, count, i32::to_be_bytes),
            Column::U32(v) => self.put_all(v, count, u32::to_be_bytes),
            Column::F32(v) => self.put_all(v, count, f32::to_be_bytes),
            Column::F64(v) => self.put_all(v, count, f64::to_be_bytes),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked big-endian reader over a borrowed buffer.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], SnapshotError> {
        let end = self
            .offset
            .checked_add(needed)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(SnapshotError::TruncatedSnapshot {
                needed,
                offset: self.offset,
                len: self.bytes.len(),
            })?;
        let chunk = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(chunk)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], SnapshotError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_u32(&mut self) -> Result<u32, SnapshotError> {
        self.take_array().map(u32::from_be_bytes)
    }

    fn get_all<T, const N: usize>(
        &mut self,
        dst: &mut [T],
        count: usize,
        decode: fn([u8; N]) -> T,
    ) -> Result<(), SnapshotError> {
        let count = count.min(dst.len());
        // Check the whole run up front so a short buffer fails before any write.
        let bytes = self.take(count * N)?;
        for (slot, chunk) in dst[..count].iter_mut().zip(bytes.chunks_exact(N)) {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            *slot = decode(raw);
        }
        Ok(())
    }

    /// Overwrite rows `0..count` of `column` from the buffer.
    pub fn get_column(&mut self, column: &mut Column, count: usize) -> Result<(), SnapshotError> {
        match column {
            Column::I8(v) => self.get_all(v, count, i8::from_be_bytes),
            Column::U8(v) => self.get_all(v, count, u8::from_be_bytes),
            Column::I16(v) => self.get_all(v, count, i16::from_be_bytes),
            Column::U16(v) => self.get_all(v, count, u16::from_be_bytes),
            Column::I32(v) => self.get_all(v, count, i32::from_be_bytes),
            Column::U32(v) => self.get_all(v, count, u32::from_be_bytes),
            Column::F32(v) => self.get_all(v, count, f32::from_be_bytes),
            Column::F64(v) => self.get_all(v, count, f64::from_be_bytes),
        }
    }
}
