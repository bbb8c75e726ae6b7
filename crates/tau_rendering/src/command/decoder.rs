//! # Instruction Decoder
//!
//! Walks a buffer record by record. Iteration ends after the terminator or
//! at the first error; an unknown opcode is never skipped because its
//! payload length is unknowable.

use tau_core::ByteReader;

use super::instruction::{TextCommand, UniformType, UniformValue};
use super::{Instruction, Opcode};
use crate::backend::ResourceHandle;
use crate::error::DecodeError;

/// Iterator over the records of one buffer.
///
/// Yields `(offset, instruction)` pairs. The terminator itself is yielded
/// as [`Instruction::FinishRender`] before iteration stops.
pub struct InstructionDecoder<'a> {
    reader: ByteReader<'a>,
    done: bool,
}

impl<'a> InstructionDecoder<'a> {
    /// Creates a decoder over `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(bytes),
            done: false,
        }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.reader.position()
    }

    /// True once the terminator or an error has been reached.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    fn decode_next(&mut self) -> Result<(usize, Instruction<'a>), DecodeError> {
        let offset = self.reader.position();
        let byte = self
            .reader
            .read_u8()
            .ok_or(DecodeError::MissingTerminator { offset })?;
        let opcode =
            Opcode::from_u8(byte).ok_or(DecodeError::UnknownOpcode { opcode: byte, offset })?;
        let truncated = DecodeError::Truncated { opcode, offset };
        let r = &mut self.reader;

        let instruction = match opcode {
            Opcode::FinishRender => Instruction::FinishRender,
            Opcode::LoadShaderUniform => {
                let tag = r.read_u8().ok_or(truncated.clone())?;
                let kind = UniformType::from_u8(tag)
                    .ok_or(DecodeError::UnknownUniformType { tag, offset })?;
                let location = r.read_pod::<i32>().ok_or(truncated.clone())?;
                let value = read_uniform(r, kind).ok_or(truncated)?;
                Instruction::LoadShaderUniform { location, value }
            }
            Opcode::ActivateShaderProgram => Instruction::ActivateShaderProgram {
                program: r.read_pod().ok_or(truncated)?,
            },
            Opcode::ActivateTextureUnit => Instruction::ActivateTextureUnit {
                unit: r.read_u8().ok_or(truncated)?,
            },
            Opcode::BindTexture | Opcode::UnbindTexture => {
                let texture = read_handle(r).ok_or(truncated.clone())?;
                let unit = r.read_u8().ok_or(truncated)?;
                if opcode == Opcode::BindTexture {
                    Instruction::BindTexture { texture, unit }
                } else {
                    Instruction::UnbindTexture { texture, unit }
                }
            }
            Opcode::BindBufferDescriptor => Instruction::BindBufferDescriptor {
                descriptor: read_handle(r).ok_or(truncated)?,
            },
            Opcode::UnbindBufferDescriptor => Instruction::UnbindBufferDescriptor {
                descriptor: read_handle(r).ok_or(truncated)?,
            },
            Opcode::BindBuffer => {
                let [target, buffer] = r.read_pod::<[u32; 2]>().ok_or(truncated)?;
                Instruction::BindBuffer { target, buffer }
            }
            Opcode::EnableVertexAttribute => Instruction::EnableVertexAttribute {
                index: r.read_pod().ok_or(truncated)?,
            },
            Opcode::DisableVertexAttribute => Instruction::DisableVertexAttribute {
                index: r.read_pod().ok_or(truncated)?,
            },
            Opcode::DrawArrays => {
                let mode = r.read_pod::<u32>().ok_or(truncated.clone())?;
                let [first, count] = r.read_pod::<[i32; 2]>().ok_or(truncated)?;
                Instruction::DrawArrays { mode, first, count }
            }
            Opcode::DrawElements => {
                let mode = r.read_pod::<u32>().ok_or(truncated.clone())?;
                let count = r.read_pod::<i32>().ok_or(truncated.clone())?;
                let index_type = r.read_pod::<u32>().ok_or(truncated.clone())?;
                let offset = r.read_pod::<u64>().ok_or(truncated)?;
                Instruction::DrawElements {
                    mode,
                    count,
                    index_type,
                    offset,
                }
            }
            Opcode::ClearBuffers => Instruction::ClearBuffers {
                mask: r.read_pod().ok_or(truncated)?,
            },
            Opcode::LoadBufferData => {
                let target = r.read_pod::<u32>().ok_or(truncated.clone())?;
                let data = read_sized(r).ok_or(truncated.clone())?;
                let usage = r.read_pod::<u32>().ok_or(truncated)?;
                Instruction::LoadBufferData {
                    target,
                    data,
                    usage,
                }
            }
            Opcode::ModifyBufferData => {
                let target = r.read_pod::<u32>().ok_or(truncated.clone())?;
                let offset = r.read_pod::<u64>().ok_or(truncated.clone())?;
                let data = read_sized(r).ok_or(truncated)?;
                Instruction::ModifyBufferData {
                    target,
                    offset,
                    data,
                }
            }
            Opcode::Enable => Instruction::Enable {
                capability: r.read_pod().ok_or(truncated)?,
            },
            Opcode::Disable => Instruction::Disable {
                capability: r.read_pod().ok_or(truncated)?,
            },
            Opcode::FaceWinding => Instruction::FaceWinding {
                mode: r.read_pod().ok_or(truncated)?,
            },
            Opcode::ResizeViewport => {
                let [x, y, width, height] = r.read_pod::<[i32; 4]>().ok_or(truncated)?;
                Instruction::ResizeViewport {
                    x,
                    y,
                    width,
                    height,
                }
            }
            Opcode::RenderText => Instruction::RenderText(read_text(r, offset)?),
        };
        Ok((offset, instruction))
    }
}

impl<'a> Iterator for InstructionDecoder<'a> {
    type Item = Result<(usize, Instruction<'a>), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.decode_next();
        if matches!(item, Err(_) | Ok((_, Instruction::FinishRender))) {
            self.done = true;
        }
        Some(item)
    }
}

fn read_handle(r: &mut ByteReader<'_>) -> Option<ResourceHandle> {
    r.read_pod::<u32>().map(ResourceHandle::from_raw)
}

fn read_sized<'a>(r: &mut ByteReader<'a>) -> Option<&'a [u8]> {
    let size = r.read_pod::<u64>()?;
    r.read_bytes(usize::try_from(size).ok()?)
}

fn read_uniform(r: &mut ByteReader<'_>, kind: UniformType) -> Option<UniformValue> {
    Some(match kind {
        UniformType::Integer => UniformValue::Integer(r.read_pod()?),
        UniformType::Float => UniformValue::Float(r.read_pod()?),
        UniformType::Double => UniformValue::Double(r.read_pod()?),
        UniformType::Vec2f => UniformValue::Vec2f(r.read_pod()?),
        UniformType::Vec3f => UniformValue::Vec3f(r.read_pod()?),
        UniformType::Vec4f => UniformValue::Vec4f(r.read_pod()?),
        UniformType::Mat4f => UniformValue::Mat4f(r.read_pod()?),
    })
}

fn read_text<'a>(r: &mut ByteReader<'a>, offset: usize) -> Result<TextCommand<'a>, DecodeError> {
    let truncated = DecodeError::Truncated {
        opcode: Opcode::RenderText,
        offset,
    };
    let renderer = read_handle(r).ok_or(truncated.clone())?;
    let [x, y, scale] = r.read_pod::<[f32; 3]>().ok_or(truncated.clone())?;
    let color = r.read_pod::<[f32; 3]>().ok_or(truncated.clone())?;
    let transform = r.read_pod::<[f32; 16]>().ok_or(truncated.clone())?;
    let len = r.read_pod::<u32>().ok_or(truncated.clone())?;
    let bytes = r.read_bytes(len as usize).ok_or(truncated)?;
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidText { offset })?;
    Ok(TextCommand {
        renderer,
        x,
        y,
        scale,
        color,
        transform,
        text,
    })
}
