//! # Instruction Encoder
//!
//! Appends records to an [`InstructionBuffer`]. A record is checked against
//! the space left (minus the reserved terminator byte) before any byte is
//! written, so an overflow never leaves a partial record behind.

use tau_core::{ArenaFull, ByteArena};

use super::instruction::{TextCommand, UniformValue};
use super::{Instruction, InstructionBuffer, Opcode};
use crate::error::EncodeError;

/// Writer over one [`InstructionBuffer`].
pub struct InstructionEncoder<'b> {
    buffer: &'b mut InstructionBuffer,
}

impl<'b> InstructionEncoder<'b> {
    pub(crate) fn new(buffer: &'b mut InstructionBuffer) -> Self {
        Self { buffer }
    }

    /// Encodes one record and returns its size in bytes.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::AlreadyFinished`] after [`finish`](Self::finish)
    /// - [`EncodeError::PayloadTooLarge`] if a text payload exceeds `u32::MAX`
    /// - [`EncodeError::BufferOverflow`] if the record does not fit
    pub fn encode(&mut self, instruction: &Instruction<'_>) -> Result<usize, EncodeError> {
        if self.buffer.finished {
            return Err(EncodeError::AlreadyFinished);
        }
        let opcode = instruction.opcode();
        if let Instruction::RenderText(text) = instruction {
            if u32::try_from(text.text.len()).is_err() {
                return Err(EncodeError::PayloadTooLarge {
                    opcode,
                    len: text.text.len(),
                });
            }
        }

        // Terminators go through finish() so the reserved byte stays free.
        if opcode == Opcode::FinishRender {
            self.finish()?;
            return Ok(1);
        }

        let required = instruction.encoded_len();
        let remaining = self.buffer.remaining();
        if required > remaining {
            return Err(EncodeError::BufferOverflow {
                opcode,
                required,
                remaining,
            });
        }

        write_record(&mut self.buffer.arena, instruction).map_err(|full| {
            EncodeError::BufferOverflow {
                opcode,
                required: full.required,
                remaining: full.remaining,
            }
        })?;
        self.buffer.records += 1;
        Ok(required)
    }

    /// Writes the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::AlreadyFinished`] if called twice.
    pub fn finish(&mut self) -> Result<(), EncodeError> {
        if self.buffer.finished {
            return Err(EncodeError::AlreadyFinished);
        }
        self.buffer
            .arena
            .write_u8(Opcode::FinishRender as u8)
            .map_err(|full| EncodeError::BufferOverflow {
                opcode: Opcode::FinishRender,
                required: full.required,
                remaining: full.remaining,
            })?;
        self.buffer.finished = true;
        Ok(())
    }

    /// Bytes still available to records.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }
}

fn write_record(arena: &mut ByteArena, instruction: &Instruction<'_>) -> Result<(), ArenaFull> {
    arena.write_u8(instruction.opcode() as u8)?;
    match *instruction {
        Instruction::FinishRender => {}
        Instruction::LoadShaderUniform { location, value } => {
            arena.write_u8(value.uniform_type() as u8)?;
            arena.write_pod(&location)?;
            write_uniform(arena, &value)?;
        }
        Instruction::ActivateShaderProgram { program } => arena.write_pod(&program)?,
        Instruction::ActivateTextureUnit { unit } => arena.write_u8(unit)?,
        Instruction::BindTexture { texture, unit }
        | Instruction::UnbindTexture { texture, unit } => {
            arena.write_pod(&texture.raw())?;
            arena.write_u8(unit)?;
        }
        Instruction::BindBufferDescriptor { descriptor }
        | Instruction::UnbindBufferDescriptor { descriptor } => {
            arena.write_pod(&descriptor.raw())?;
        }
        Instruction::BindBuffer { target, buffer } => {
            arena.write_pod(&target)?;
            arena.write_pod(&buffer)?;
        }
        Instruction::EnableVertexAttribute { index }
        | Instruction::DisableVertexAttribute { index } => arena.write_pod(&index)?,
        Instruction::DrawArrays { mode, first, count } => {
            arena.write_pod(&mode)?;
            arena.write_pod(&first)?;
            arena.write_pod(&count)?;
        }
        Instruction::DrawElements {
            mode,
            count,
            index_type,
            offset,
        } => {
            arena.write_pod(&mode)?;
            arena.write_pod(&count)?;
            arena.write_pod(&index_type)?;
            arena.write_pod(&offset)?;
        }
        Instruction::ClearBuffers { mask } => arena.write_pod(&mask)?,
        Instruction::LoadBufferData {
            target,
            data,
            usage,
        } => {
            arena.write_pod(&target)?;
            arena.write_pod(&(data.len() as u64))?;
            arena.write_bytes(data)?;
            arena.write_pod(&usage)?;
        }
        Instruction::ModifyBufferData {
            target,
            offset,
            data,
        } => {
            arena.write_pod(&target)?;
            arena.write_pod(&offset)?;
            arena.write_pod(&(data.len() as u64))?;
            arena.write_bytes(data)?;
        }
        Instruction::Enable { capability } | Instruction::Disable { capability } => {
            arena.write_pod(&capability)?;
        }
        Instruction::FaceWinding { mode } => arena.write_pod(&mode)?,
        Instruction::ResizeViewport {
            x,
            y,
            width,
            height,
        } => arena.write_pod(&[x, y, width, height])?,
        Instruction::RenderText(ref text) => write_text(arena, text)?,
    }
    Ok(())
}

fn write_uniform(arena: &mut ByteArena, value: &UniformValue) -> Result<(), ArenaFull> {
    match value {
        UniformValue::Integer(v) => arena.write_pod(v),
        UniformValue::Float(v) => arena.write_pod(v),
        UniformValue::Double(v) => arena.write_pod(v),
        UniformValue::Vec2f(v) => arena.write_pod(v),
        UniformValue::Vec3f(v) => arena.write_pod(v),
        UniformValue::Vec4f(v) => arena.write_pod(v),
        UniformValue::Mat4f(v) => arena.write_pod(v),
    }
}

fn write_text(arena: &mut ByteArena, text: &TextCommand<'_>) -> Result<(), ArenaFull> {
    arena.write_pod(&text.renderer.raw())?;
    arena.write_pod(&[text.x, text.y, text.scale])?;
    arena.write_pod(&text.color)?;
    arena.write_pod(&text.transform)?;
    arena.write_pod(&(text.text.len() as u32))?;
    arena.write_bytes(text.text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{gl, ResourceHandle};

    #[test]
    fn test_fixed_records_have_declared_size() {
        let mut buffer = InstructionBuffer::new(256);
        let mut encoder = buffer.encoder();
        // (record, opcode byte + field widths on the wire)
        let cases = [
            (Instruction::ActivateShaderProgram { program: 3 }, 1 + 4),
            (Instruction::ActivateTextureUnit { unit: 2 }, 1 + 1),
            (
                Instruction::BindTexture {
                    texture: ResourceHandle::from_raw(7),
                    unit: 1,
                },
                1 + 4 + 1,
            ),
            (
                Instruction::DrawArrays {
                    mode: gl::TRIANGLES,
                    first: 0,
                    count: 3,
                },
                1 + 4 + 4 + 4,
            ),
            (
                Instruction::DrawElements {
                    mode: gl::TRIANGLES,
                    count: 6,
                    index_type: gl::UNSIGNED_INT,
                    offset: 0,
                },
                1 + 4 + 4 + 4 + 8,
            ),
            (
                Instruction::ResizeViewport {
                    x: 0,
                    y: 0,
                    width: 800,
                    height: 600,
                },
                1 + 4 * 4,
            ),
        ];
        for (instruction, size) in &cases {
            assert_eq!(instruction.encoded_len(), *size);
            assert_eq!(encoder.encode(instruction).unwrap(), *size);
        }
    }

    #[test]
    fn test_draw_arrays_layout() {
        let mut buffer = InstructionBuffer::new(64);
        buffer
            .encoder()
            .encode(&Instruction::DrawArrays {
                mode: gl::TRIANGLES,
                first: 1,
                count: 3,
            })
            .unwrap();

        let bytes = buffer.written();
        assert_eq!(bytes[0], Opcode::DrawArrays as u8);
        assert_eq!(&bytes[1..5], &gl::TRIANGLES.to_ne_bytes());
        assert_eq!(&bytes[5..9], &1i32.to_ne_bytes());
        assert_eq!(&bytes[9..13], &3i32.to_ne_bytes());
    }

    #[test]
    fn test_overflow_writes_nothing() {
        let mut buffer = InstructionBuffer::new(16);
        let data = [0xAB; 32];
        let mut encoder = buffer.encoder();
        let err = encoder
            .encode(&Instruction::LoadBufferData {
                target: gl::ARRAY_BUFFER,
                data: &data,
                usage: gl::STATIC_DRAW,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::BufferOverflow {
                opcode: Opcode::LoadBufferData,
                remaining: 15,
                ..
            }
        ));
        assert!(buffer.is_empty());
        assert!(buffer.is_zeroed());
    }

    #[test]
    fn test_terminator_always_fits() {
        // 5 byte records fill 15 of 16 bytes; the last byte stays reserved.
        let mut buffer = InstructionBuffer::new(16);
        let mut encoder = buffer.encoder();
        for _ in 0..3 {
            encoder.encode(&Instruction::ClearBuffers { mask: 1 }).unwrap();
        }
        assert_eq!(encoder.remaining(), 0);
        assert!(encoder.encode(&Instruction::Enable { capability: 1 }).is_err());
        encoder.finish().unwrap();
        assert_eq!(buffer.used(), 16);
    }

    #[test]
    fn test_encode_after_finish_fails() {
        let mut buffer = InstructionBuffer::new(32);
        let mut encoder = buffer.encoder();
        encoder.finish().unwrap();
        assert_eq!(
            encoder.encode(&Instruction::ClearBuffers { mask: 1 }),
            Err(EncodeError::AlreadyFinished)
        );
        assert_eq!(encoder.finish(), Err(EncodeError::AlreadyFinished));
    }

    #[test]
    fn test_finish_instruction_routes_to_finish() {
        let mut buffer = InstructionBuffer::new(4);
        let mut encoder = buffer.encoder();
        assert_eq!(encoder.encode(&Instruction::FinishRender), Ok(1));
        assert!(buffer.is_finished());
        assert_eq!(buffer.records(), 0);
    }
}
