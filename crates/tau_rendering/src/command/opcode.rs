//! Opcode table.

/// One-byte tag at the head of every instruction record.
///
/// `FinishRender` is `0x00` so a zero-filled buffer reads as an already
/// terminated stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Stream terminator.
    FinishRender = 0x00,
    /// Set a shader uniform.
    LoadShaderUniform = 0x01,
    /// Make a shader program current.
    ActivateShaderProgram = 0x02,
    /// Select the active texture unit.
    ActivateTextureUnit = 0x03,
    /// Bind a registered texture to a unit.
    BindTexture = 0x04,
    /// Unbind a registered texture from a unit.
    UnbindTexture = 0x05,
    /// Bind a registered buffer descriptor (vertex array).
    BindBufferDescriptor = 0x06,
    /// Unbind a registered buffer descriptor.
    UnbindBufferDescriptor = 0x07,
    /// Bind a buffer object to a target.
    BindBuffer = 0x08,
    /// Enable a vertex attribute array.
    EnableVertexAttribute = 0x09,
    /// Disable a vertex attribute array.
    DisableVertexAttribute = 0x0A,
    /// Non-indexed draw.
    DrawArrays = 0x0B,
    /// Indexed draw.
    DrawElements = 0x0C,
    /// Clear framebuffer planes.
    ClearBuffers = 0x0D,
    /// Allocate and fill the bound buffer.
    LoadBufferData = 0x0E,
    /// Overwrite a range of the bound buffer.
    ModifyBufferData = 0x0F,
    /// Enable a capability.
    Enable = 0x10,
    /// Disable a capability.
    Disable = 0x11,
    /// Set front-face winding.
    FaceWinding = 0x12,
    /// Set the viewport rectangle.
    ResizeViewport = 0x13,
    /// Draw a string through a registered text renderer.
    RenderText = 0x14,
}

impl Opcode {
    /// Every opcode, in tag order.
    pub const ALL: [Opcode; 21] = [
        Opcode::FinishRender,
        Opcode::LoadShaderUniform,
        Opcode::ActivateShaderProgram,
        Opcode::ActivateTextureUnit,
        Opcode::BindTexture,
        Opcode::UnbindTexture,
        Opcode::BindBufferDescriptor,
        Opcode::UnbindBufferDescriptor,
        Opcode::BindBuffer,
        Opcode::EnableVertexAttribute,
        Opcode::DisableVertexAttribute,
        Opcode::DrawArrays,
        Opcode::DrawElements,
        Opcode::ClearBuffers,
        Opcode::LoadBufferData,
        Opcode::ModifyBufferData,
        Opcode::Enable,
        Opcode::Disable,
        Opcode::FaceWinding,
        Opcode::ResizeViewport,
        Opcode::RenderText,
    ];

    /// Decodes a tag byte.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Opcode::FinishRender,
            0x01 => Opcode::LoadShaderUniform,
            0x02 => Opcode::ActivateShaderProgram,
            0x03 => Opcode::ActivateTextureUnit,
            0x04 => Opcode::BindTexture,
            0x05 => Opcode::UnbindTexture,
            0x06 => Opcode::BindBufferDescriptor,
            0x07 => Opcode::UnbindBufferDescriptor,
            0x08 => Opcode::BindBuffer,
            0x09 => Opcode::EnableVertexAttribute,
            0x0A => Opcode::DisableVertexAttribute,
            0x0B => Opcode::DrawArrays,
            0x0C => Opcode::DrawElements,
            0x0D => Opcode::ClearBuffers,
            0x0E => Opcode::LoadBufferData,
            0x0F => Opcode::ModifyBufferData,
            0x10 => Opcode::Enable,
            0x11 => Opcode::Disable,
            0x12 => Opcode::FaceWinding,
            0x13 => Opcode::ResizeViewport,
            0x14 => Opcode::RenderText,
            _ => return None,
        })
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::from_u8(byte).ok_or(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for (i, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(*opcode as u8, i as u8);
            assert_eq!(Opcode::try_from(*opcode as u8), Ok(*opcode));
        }
    }

    #[test]
    fn test_unknown_tags() {
        assert_eq!(Opcode::from_u8(0x15), None);
        assert_eq!(Opcode::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_zero_is_terminator() {
        assert_eq!(Opcode::from_u8(0), Some(Opcode::FinishRender));
    }
}
