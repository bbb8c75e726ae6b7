//! # Byte Arena
//!
//! A bump-cursor byte buffer that is written front to back and cleared all
//! at once.

use bytemuck::{bytes_of, Pod};
use thiserror::Error;

/// Returned when a write does not fit in the remaining space.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("arena full: need {required} bytes, {remaining} remaining")]
pub struct ArenaFull {
    /// Bytes the write needed.
    pub required: usize,
    /// Bytes that were left.
    pub remaining: usize,
}

/// A fixed-capacity, zero-initialized byte arena.
///
/// Writes bump a cursor. The storage is never reallocated; a write that
/// does not fit fails without touching the arena.
///
/// # Thread Safety
///
/// The arena has no interior mutability. Hand it to another thread by
/// moving it.
///
/// # Example
///
/// ```rust
/// use tau_core::ByteArena;
///
/// let mut arena = ByteArena::new(16);
/// arena.write_bytes(&[1, 2, 3]).unwrap();
/// assert_eq!(arena.written(), &[1, 2, 3]);
///
/// arena.clear_consumed(3);
/// assert!(arena.is_zeroed());
/// ```
#[derive(Debug)]
pub struct ByteArena {
    storage: Box<[u8]>,
    cursor: usize,
}

impl ByteArena {
    /// Creates a zero-filled arena of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the number of bytes written since the last clear.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.cursor
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Returns the whole storage, including the unwritten tail.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage
    }

    /// Returns the written prefix.
    #[inline]
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.storage[..self.cursor]
    }

    /// Checks that `len` more bytes fit.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaFull`] if they do not.
    #[inline]
    pub fn ensure(&self, len: usize) -> Result<(), ArenaFull> {
        if len > self.remaining() {
            return Err(ArenaFull {
                required: len,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Appends raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaFull`] if the bytes do not fit; nothing is written.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ArenaFull> {
        self.ensure(bytes.len())?;
        let end = self.cursor + bytes.len();
        self.storage[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }

    /// Appends a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaFull`] if the arena is full.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<(), ArenaFull> {
        self.write_bytes(&[value])
    }

    /// Appends a `Pod` value in native byte order, unaligned.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaFull`] if the value does not fit.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> Result<(), ArenaFull> {
        self.write_bytes(bytes_of(value))
    }

    /// Zeroes everything read or written this cycle and rewinds the cursor.
    ///
    /// `consumed` is how far a reader advanced; the zeroed region covers
    /// both that and the written prefix.
    pub fn clear_consumed(&mut self, consumed: usize) {
        let end = consumed.max(self.cursor).min(self.capacity());
        self.storage[..end].fill(0);
        self.cursor = 0;
    }

    /// Rewinds the cursor without zeroing.
    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Returns true if every byte of storage is zero.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.storage.iter().all(|&b| b == 0)
    }
}
