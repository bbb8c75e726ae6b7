//! OpenGL enum values used by the pipeline and its callers.
//!
//! The pipeline stores these as opaque `u32`s; only a backend interprets
//! them. The subset here covers what the typed push helpers and tests need.

/// Raw OpenGL enum.
pub type GlEnum = u32;

// Primitive modes
/// `GL_POINTS`
pub const POINTS: GlEnum = 0x0000;
/// `GL_LINES`
pub const LINES: GlEnum = 0x0001;
/// `GL_LINE_STRIP`
pub const LINE_STRIP: GlEnum = 0x0003;
/// `GL_TRIANGLES`
pub const TRIANGLES: GlEnum = 0x0004;
/// `GL_TRIANGLE_STRIP`
pub const TRIANGLE_STRIP: GlEnum = 0x0005;
/// `GL_TRIANGLE_FAN`
pub const TRIANGLE_FAN: GlEnum = 0x0006;

// Index types
/// `GL_UNSIGNED_BYTE`
pub const UNSIGNED_BYTE: GlEnum = 0x1401;
/// `GL_UNSIGNED_SHORT`
pub const UNSIGNED_SHORT: GlEnum = 0x1403;
/// `GL_UNSIGNED_INT`
pub const UNSIGNED_INT: GlEnum = 0x1405;

// Buffer targets
/// `GL_ARRAY_BUFFER`
pub const ARRAY_BUFFER: GlEnum = 0x8892;
/// `GL_ELEMENT_ARRAY_BUFFER`
pub const ELEMENT_ARRAY_BUFFER: GlEnum = 0x8893;
/// `GL_UNIFORM_BUFFER`
pub const UNIFORM_BUFFER: GlEnum = 0x8A11;

// Usage hints
/// `GL_STREAM_DRAW`
pub const STREAM_DRAW: GlEnum = 0x88E0;
/// `GL_STATIC_DRAW`
pub const STATIC_DRAW: GlEnum = 0x88E4;
/// `GL_DYNAMIC_DRAW`
pub const DYNAMIC_DRAW: GlEnum = 0x88E8;

// Clear mask bits
/// `GL_DEPTH_BUFFER_BIT`
pub const DEPTH_BUFFER_BIT: u32 = 0x0000_0100;
/// `GL_STENCIL_BUFFER_BIT`
pub const STENCIL_BUFFER_BIT: u32 = 0x0000_0400;
/// `GL_COLOR_BUFFER_BIT`
pub const COLOR_BUFFER_BIT: u32 = 0x0000_4000;

// Capabilities
/// `GL_CULL_FACE`
pub const CULL_FACE: GlEnum = 0x0B44;
/// `GL_DEPTH_TEST`
pub const DEPTH_TEST: GlEnum = 0x0B71;
/// `GL_BLEND`
pub const BLEND: GlEnum = 0x0BE2;
/// `GL_SCISSOR_TEST`
pub const SCISSOR_TEST: GlEnum = 0x0C11;

// Winding
/// `GL_CW`
pub const CW: GlEnum = 0x0900;
/// `GL_CCW`
pub const CCW: GlEnum = 0x0901;
