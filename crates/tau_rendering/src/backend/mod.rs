//! # Graphics Collaborators
//!
//! The pipeline never talks to a graphics API directly. It drives:
//!
//! - a [`Window`], which owns the context and presents frames
//! - a [`RenderBackend`], which executes the context-global calls
//!   (draws, state, buffer uploads) on the thread holding the context
//! - resource objects ([`Texture`], [`BufferDescriptor`], [`TextRenderer`])
//!   reached through [`ResourceRegistry`] handles
//!
//! [`recording`] provides in-memory implementations of all of them.

pub mod gl;
pub mod recording;
mod resources;

pub use gl::GlEnum;
pub use resources::{BufferDescriptor, ResourceHandle, ResourceRegistry, TextRenderer, Texture};

use crate::command::UniformValue;
use crate::error::BackendResult;

/// A window owning one graphics context.
///
/// The context is current on at most one thread at a time. The pipeline
/// shares the window between the producer thread, the render thread and
/// any thread borrowing the context, hence the `Sync` bound.
pub trait Window: Send + Sync + 'static {
    /// Binds the context to the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the platform's failure, e.g. the context is current elsewhere.
    fn make_context_current(&self) -> BackendResult;

    /// Releases the context from the calling thread. A no-op if it is not
    /// current here.
    fn unload_current_context(&self);

    /// Presents the back framebuffer.
    ///
    /// # Errors
    ///
    /// Returns the platform's failure.
    fn swap_buffers(&self) -> BackendResult;
}

/// Context-global graphics calls.
///
/// Created on the render thread once the context is current there, and
/// only ever called from that thread.
#[allow(clippy::missing_errors_doc)]
pub trait RenderBackend {
    /// Loads a uniform into the current program.
    fn load_uniform(&mut self, location: i32, value: &UniformValue) -> BackendResult;
    /// Makes `program` current; `0` deactivates.
    fn use_program(&mut self, program: u32) -> BackendResult;
    /// Selects texture unit `unit`.
    fn active_texture_unit(&mut self, unit: u8) -> BackendResult;
    /// Binds `buffer` to `target`; `0` unbinds.
    fn bind_buffer(&mut self, target: GlEnum, buffer: u32) -> BackendResult;
    /// Enables a vertex attribute array.
    fn enable_vertex_attribute(&mut self, index: u32) -> BackendResult;
    /// Disables a vertex attribute array.
    fn disable_vertex_attribute(&mut self, index: u32) -> BackendResult;
    /// Non-indexed draw.
    fn draw_arrays(&mut self, mode: GlEnum, first: i32, count: i32) -> BackendResult;
    /// Indexed draw from the bound element buffer.
    fn draw_elements(
        &mut self,
        mode: GlEnum,
        count: i32,
        index_type: GlEnum,
        offset: u64,
    ) -> BackendResult;
    /// Clears the planes in `mask`.
    fn clear(&mut self, mask: u32) -> BackendResult;
    /// Allocates and fills the buffer bound to `target`.
    fn buffer_data(&mut self, target: GlEnum, data: &[u8], usage: GlEnum) -> BackendResult;
    /// Overwrites part of the buffer bound to `target`.
    fn buffer_sub_data(&mut self, target: GlEnum, offset: u64, data: &[u8]) -> BackendResult;
    /// Enables a capability.
    fn enable(&mut self, capability: GlEnum) -> BackendResult;
    /// Disables a capability.
    fn disable(&mut self, capability: GlEnum) -> BackendResult;
    /// Sets front-face winding.
    fn front_face(&mut self, mode: GlEnum) -> BackendResult;
    /// Sets the viewport.
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) -> BackendResult;
}
