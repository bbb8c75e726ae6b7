//! Render-side half of the double buffer.

use std::mem;

use crate::command::InstructionBuffer;

/// Holds the front buffer: the one being (or last) replayed.
///
/// The back buffer is never stored here. It is either being recorded by
/// the producer or in flight through one of the two handshakes, so the
/// render thread cannot touch it.
#[derive(Debug)]
pub(crate) struct FrameSwap {
    front: InstructionBuffer,
    swaps: u64,
}

impl FrameSwap {
    pub(crate) fn new(front: InstructionBuffer) -> Self {
        Self { front, swaps: 0 }
    }

    /// Installs `incoming` as the front buffer and returns the previous one.
    /// Moves two pointers, whatever the buffers hold.
    pub(crate) fn swap(&mut self, incoming: InstructionBuffer) -> InstructionBuffer {
        self.swaps += 1;
        mem::replace(&mut self.front, incoming)
    }

    pub(crate) fn front_mut(&mut self) -> &mut InstructionBuffer {
        &mut self.front
    }

    pub(crate) const fn swaps(&self) -> u64 {
        self.swaps
    }
}
