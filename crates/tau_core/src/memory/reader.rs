//! Cursor over a borrowed byte slice.

use bytemuck::Pod;

/// Reads values front to back from a byte slice.
///
/// Every read is bounds-checked and returns `None` instead of reading past
/// the end; the cursor only advances on success.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the current offset from the start of the buffer.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buffer.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads a `Pod` value in native byte order, unaligned.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> Option<T> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Borrows the next `len` bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(len)?;
        let bytes = self.buffer.get(self.position..end)?;
        self.position = end;
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteArena;

    #[test]
    fn test_reads_what_arena_wrote() {
        let mut arena = ByteArena::new(64);
        arena.write_u8(3).unwrap();
        arena.write_pod(&-5i32).unwrap();
        arena.write_pod(&2.5f64).unwrap();
        arena.write_bytes(b"abc").unwrap();

        let mut reader = ByteReader::new(arena.written());
        assert_eq!(reader.read_u8(), Some(3));
        assert_eq!(reader.read_pod::<i32>(), Some(-5));
        assert_eq!(reader.read_pod::<f64>(), Some(2.5));
        assert_eq!(reader.read_bytes(3), Some(&b"abc"[..]));
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert_eq!(reader.read_pod::<u32>(), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_bytes(usize::MAX), None);
        assert_eq!(reader.read_bytes(3), Some(&[1u8, 2, 3][..]));
    }
}
