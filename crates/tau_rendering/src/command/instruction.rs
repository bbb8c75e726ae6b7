//! Typed instruction records.
//!
//! Each variant is one record on the wire. Byte layouts (all values native
//! endian, unaligned, after the opcode byte):
//!
//! ```text
//! LoadShaderUniform       tag:u8 location:i32 value:(by tag)
//! ActivateShaderProgram   program:u32
//! ActivateTextureUnit     unit:u8
//! Bind/UnbindTexture      texture:u32 unit:u8
//! Bind/UnbindDescriptor   descriptor:u32
//! BindBuffer              target:u32 buffer:u32
//! Enable/DisableVertexAttribute index:u32
//! DrawArrays              mode:u32 first:i32 count:i32
//! DrawElements            mode:u32 count:i32 index_type:u32 offset:u64
//! ClearBuffers            mask:u32
//! LoadBufferData          target:u32 size:u64 data:[u8; size] usage:u32
//! ModifyBufferData        target:u32 offset:u64 size:u64 data:[u8; size]
//! Enable/Disable          capability:u32
//! FaceWinding             mode:u32
//! ResizeViewport          x:i32 y:i32 width:i32 height:i32
//! RenderText              renderer:u32 x:f32 y:f32 scale:f32 color:[f32; 3]
//!                         transform:[f32; 16] len:u32 text:[u8; len]
//! ```

use super::Opcode;
use crate::backend::{GlEnum, ResourceHandle};

/// Type tag of a [`UniformValue`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `i32`
    Integer = 0,
    /// `f32`
    Float = 1,
    /// `f64`
    Double = 2,
    /// `[f32; 2]`
    Vec2f = 3,
    /// `[f32; 3]`
    Vec3f = 4,
    /// `[f32; 4]`
    Vec4f = 5,
    /// Column-major `[f32; 16]`
    Mat4f = 6,
}

impl UniformType {
    /// Decodes a tag byte.
    #[must_use]
    pub const fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => UniformType::Integer,
            1 => UniformType::Float,
            2 => UniformType::Double,
            3 => UniformType::Vec2f,
            4 => UniformType::Vec3f,
            5 => UniformType::Vec4f,
            6 => UniformType::Mat4f,
            _ => return None,
        })
    }

    /// Size of the value that follows the location.
    #[must_use]
    pub const fn value_len(self) -> usize {
        match self {
            UniformType::Integer | UniformType::Float => 4,
            UniformType::Double | UniformType::Vec2f => 8,
            UniformType::Vec3f => 12,
            UniformType::Vec4f => 16,
            UniformType::Mat4f => 64,
        }
    }
}

/// A shader uniform value. Matrices travel by value, not by pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer or sampler unit.
    Integer(i32),
    /// Scalar float.
    Float(f32),
    /// Scalar double.
    Double(f64),
    /// Two-component float vector.
    Vec2f([f32; 2]),
    /// Three-component float vector.
    Vec3f([f32; 3]),
    /// Four-component float vector.
    Vec4f([f32; 4]),
    /// 4x4 float matrix, column-major.
    Mat4f([f32; 16]),
}

impl UniformValue {
    /// Returns the wire tag for this value.
    #[must_use]
    pub const fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Integer(_) => UniformType::Integer,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Double(_) => UniformType::Double,
            UniformValue::Vec2f(_) => UniformType::Vec2f,
            UniformValue::Vec3f(_) => UniformType::Vec3f,
            UniformValue::Vec4f(_) => UniformType::Vec4f,
            UniformValue::Mat4f(_) => UniformType::Mat4f,
        }
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Integer(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<f64> for UniformValue {
    fn from(value: f64) -> Self {
        UniformValue::Double(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2f(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3f(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        UniformValue::Vec4f(value)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(value: [f32; 16]) -> Self {
        UniformValue::Mat4f(value)
    }
}

/// Payload of a render-text record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextCommand<'a> {
    /// Registered text renderer.
    pub renderer: ResourceHandle,
    /// Baseline origin, x.
    pub x: f32,
    /// Baseline origin, y.
    pub y: f32,
    /// Glyph scale.
    pub scale: f32,
    /// RGB color.
    pub color: [f32; 3],
    /// Projection applied to the glyph quads.
    pub transform: [f32; 16],
    /// The string to draw.
    pub text: &'a str,
}

/// Bytes of a render-text record before the string.
pub(crate) const TEXT_HEADER_LEN: usize = 4 + 4 + 4 + 4 + 12 + 64 + 4;

/// One decoded or to-be-encoded instruction record.
///
/// Variable-length payloads borrow from the caller when encoding and from
/// the instruction buffer when decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction<'a> {
    /// Stream terminator.
    FinishRender,
    /// Set a uniform on the current program.
    LoadShaderUniform {
        /// Uniform location.
        location: i32,
        /// Value to load.
        value: UniformValue,
    },
    /// Make a program current; `0` deactivates.
    ActivateShaderProgram {
        /// Program name.
        program: u32,
    },
    /// Select the active texture unit.
    ActivateTextureUnit {
        /// Unit offset from unit 0.
        unit: u8,
    },
    /// Bind a registered texture.
    BindTexture {
        /// Texture handle.
        texture: ResourceHandle,
        /// Texture unit.
        unit: u8,
    },
    /// Unbind a registered texture.
    UnbindTexture {
        /// Texture handle.
        texture: ResourceHandle,
        /// Texture unit.
        unit: u8,
    },
    /// Bind a registered buffer descriptor.
    BindBufferDescriptor {
        /// Descriptor handle.
        descriptor: ResourceHandle,
    },
    /// Unbind a registered buffer descriptor.
    UnbindBufferDescriptor {
        /// Descriptor handle.
        descriptor: ResourceHandle,
    },
    /// Bind a buffer object; `0` unbinds the target.
    BindBuffer {
        /// Buffer target.
        target: GlEnum,
        /// Buffer name.
        buffer: u32,
    },
    /// Enable a vertex attribute array.
    EnableVertexAttribute {
        /// Attribute index.
        index: u32,
    },
    /// Disable a vertex attribute array.
    DisableVertexAttribute {
        /// Attribute index.
        index: u32,
    },
    /// Non-indexed draw.
    DrawArrays {
        /// Primitive mode.
        mode: GlEnum,
        /// First vertex.
        first: i32,
        /// Vertex count.
        count: i32,
    },
    /// Indexed draw from the bound element buffer.
    DrawElements {
        /// Primitive mode.
        mode: GlEnum,
        /// Index count.
        count: i32,
        /// Index type.
        index_type: GlEnum,
        /// Byte offset into the element buffer.
        offset: u64,
    },
    /// Clear framebuffer planes.
    ClearBuffers {
        /// Bitmask of planes.
        mask: u32,
    },
    /// Allocate and fill the buffer bound to `target`.
    LoadBufferData {
        /// Buffer target.
        target: GlEnum,
        /// Contents.
        data: &'a [u8],
        /// Usage hint.
        usage: GlEnum,
    },
    /// Overwrite part of the buffer bound to `target`.
    ModifyBufferData {
        /// Buffer target.
        target: GlEnum,
        /// Byte offset into the buffer.
        offset: u64,
        /// Replacement bytes.
        data: &'a [u8],
    },
    /// Enable a capability.
    Enable {
        /// Capability.
        capability: GlEnum,
    },
    /// Disable a capability.
    Disable {
        /// Capability.
        capability: GlEnum,
    },
    /// Set front-face winding.
    FaceWinding {
        /// Winding mode.
        mode: GlEnum,
    },
    /// Set the viewport.
    ResizeViewport {
        /// Left edge.
        x: i32,
        /// Bottom edge.
        y: i32,
        /// Width in pixels.
        width: i32,
        /// Height in pixels.
        height: i32,
    },
    /// Draw text.
    RenderText(TextCommand<'a>),
}

impl Instruction<'_> {
    /// Returns the record's opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Instruction::FinishRender => Opcode::FinishRender,
            Instruction::LoadShaderUniform { .. } => Opcode::LoadShaderUniform,
            Instruction::ActivateShaderProgram { .. } => Opcode::ActivateShaderProgram,
            Instruction::ActivateTextureUnit { .. } => Opcode::ActivateTextureUnit,
            Instruction::BindTexture { .. } => Opcode::BindTexture,
            Instruction::UnbindTexture { .. } => Opcode::UnbindTexture,
            Instruction::BindBufferDescriptor { .. } => Opcode::BindBufferDescriptor,
            Instruction::UnbindBufferDescriptor { .. } => Opcode::UnbindBufferDescriptor,
            Instruction::BindBuffer { .. } => Opcode::BindBuffer,
            Instruction::EnableVertexAttribute { .. } => Opcode::EnableVertexAttribute,
            Instruction::DisableVertexAttribute { .. } => Opcode::DisableVertexAttribute,
            Instruction::DrawArrays { .. } => Opcode::DrawArrays,
            Instruction::DrawElements { .. } => Opcode::DrawElements,
            Instruction::ClearBuffers { .. } => Opcode::ClearBuffers,
            Instruction::LoadBufferData { .. } => Opcode::LoadBufferData,
            Instruction::ModifyBufferData { .. } => Opcode::ModifyBufferData,
            Instruction::Enable { .. } => Opcode::Enable,
            Instruction::Disable { .. } => Opcode::Disable,
            Instruction::FaceWinding { .. } => Opcode::FaceWinding,
            Instruction::ResizeViewport { .. } => Opcode::ResizeViewport,
            Instruction::RenderText(_) => Opcode::RenderText,
        }
    }

    /// Bytes that follow the opcode on the wire.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        match self {
            Instruction::FinishRender => 0,
            Instruction::ActivateTextureUnit { .. } => 1,
            Instruction::ActivateShaderProgram { .. }
            | Instruction::BindBufferDescriptor { .. }
            | Instruction::UnbindBufferDescriptor { .. }
            | Instruction::EnableVertexAttribute { .. }
            | Instruction::DisableVertexAttribute { .. }
            | Instruction::ClearBuffers { .. }
            | Instruction::Enable { .. }
            | Instruction::Disable { .. }
            | Instruction::FaceWinding { .. } => 4,
            Instruction::BindTexture { .. } | Instruction::UnbindTexture { .. } => 5,
            Instruction::BindBuffer { .. } => 8,
            Instruction::DrawArrays { .. } => 12,
            Instruction::ResizeViewport { .. } => 16,
            Instruction::DrawElements { .. } => 20,
            Instruction::LoadShaderUniform { value, .. } => {
                1 + 4 + value.uniform_type().value_len()
            }
            Instruction::LoadBufferData { data, .. } => 4 + 8 + data.len() + 4,
            Instruction::ModifyBufferData { data, .. } => 4 + 8 + 8 + data.len(),
            Instruction::RenderText(text) => TEXT_HEADER_LEN + text.text.len(),
        }
    }

    /// Total record size including the opcode byte.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        1 + self.payload_len()
    }
}
