//! Instruction buffer storage.

use tau_core::ByteArena;

use super::{InstructionDecoder, InstructionEncoder};

/// Fixed-capacity, zero-filled instruction storage.
///
/// One of these is being written by the producer while the other is
/// replayed by the render thread. The last byte of capacity is reserved for
/// the terminator, so a buffer can always be finished.
#[derive(Debug)]
pub struct InstructionBuffer {
    pub(crate) arena: ByteArena,
    pub(crate) records: usize,
    pub(crate) finished: bool,
}

impl InstructionBuffer {
    /// Smallest usable capacity: one terminator plus one byte of payload room.
    pub const MIN_CAPACITY: usize = 2;

    /// Creates a zero-filled buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            arena: ByteArena::new(capacity.max(Self::MIN_CAPACITY)),
            records: 0,
            finished: false,
        }
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.arena.used()
    }

    /// Bytes still available to records, excluding the terminator byte.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.arena.remaining().saturating_sub(1)
    }

    /// Records encoded since the last clear, terminator excluded.
    #[must_use]
    pub const fn records(&self) -> usize {
        self.records
    }

    /// True once the terminator has been written.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// True if nothing has been written since the last clear.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// The full storage, including the zero-filled tail.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.arena.as_slice()
    }

    /// The written prefix.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        self.arena.written()
    }

    /// Returns an encoder appending to this buffer.
    pub fn encoder(&mut self) -> InstructionEncoder<'_> {
        InstructionEncoder::new(self)
    }

    /// Returns a decoder reading from the start of this buffer.
    #[must_use]
    pub fn decoder(&self) -> InstructionDecoder<'_> {
        InstructionDecoder::new(self.bytes())
    }

    /// Zeroes everything a decoder consumed and everything written, then
    /// readies the buffer for the next frame.
    pub fn clear_consumed(&mut self, consumed: usize) {
        self.arena.clear_consumed(consumed);
        self.records = 0;
        self.finished = false;
    }

    /// Zeroes the whole buffer.
    pub fn clear(&mut self) {
        let capacity = self.capacity();
        self.clear_consumed(capacity);
    }

    /// True if every byte is zero.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.arena.is_zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Instruction;

    #[test]
    fn test_new_buffer_is_zeroed() {
        let buffer = InstructionBuffer::new(64);
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.remaining(), 63);
        assert!(buffer.is_empty());
        assert!(buffer.is_zeroed());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = InstructionBuffer::new(64);
        {
            let mut encoder = buffer.encoder();
            encoder
                .encode(&Instruction::ClearBuffers { mask: 0x4000 })
                .unwrap();
            encoder.finish().unwrap();
        }
        assert_eq!(buffer.records(), 1);
        assert!(buffer.is_finished());
        assert!(!buffer.is_zeroed());

        buffer.clear_consumed(6);
        assert_eq!(buffer.records(), 0);
        assert!(!buffer.is_finished());
        assert!(buffer.is_empty());
        assert!(buffer.is_zeroed());
    }

    #[test]
    fn test_tiny_capacity_is_raised() {
        let buffer = InstructionBuffer::new(0);
        assert_eq!(buffer.capacity(), InstructionBuffer::MIN_CAPACITY);
    }
}
