//! # Instruction Encoding
//!
//! The wire format shared by the producer and the render thread.
//!
//! ```text
//! ┌────────┬──────────────┬────────┬──────────────┬─────┬────────┬──────────┐
//! │ opcode │ payload      │ opcode │ payload      │ ... │ 0x00   │ 0 0 0 ...│
//! └────────┴──────────────┴────────┴──────────────┴─────┴────────┴──────────┘
//!                                                        finish    zero tail
//! ```
//!
//! Records are packed with no padding. Multi-byte fields use native byte
//! order; both ends of the stream live in the same process.

mod buffer;
mod decoder;
mod encoder;
pub(crate) mod instruction;
mod opcode;

pub use buffer::InstructionBuffer;
pub use decoder::InstructionDecoder;
pub use encoder::InstructionEncoder;
pub use instruction::{Instruction, TextCommand, UniformType, UniformValue};
pub use opcode::Opcode;
