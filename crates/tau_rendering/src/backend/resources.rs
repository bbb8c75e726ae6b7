//! Graphics resource handles and the registry that resolves them.
//!
//! Instruction records never carry pointers. Textures, buffer descriptors
//! and text renderers are registered once, and records refer to them by a
//! 32-bit [`ResourceHandle`] that the interpreter resolves at replay time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parking_lot::RwLock;

use crate::error::BackendResult;
use crate::command::TextCommand;

/// Stable integer name of a registered resource.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct ResourceHandle(u32);

impl ResourceHandle {
    /// Never issued by a registry.
    pub const NULL: Self = Self(0);

    /// Wraps a raw handle value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for [`ResourceHandle::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A texture object.
pub trait Texture: Send + Sync {
    /// Binds the texture to `unit`.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    fn bind(&self, unit: u8) -> BackendResult;

    /// Unbinds the texture from `unit`.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    fn unbind(&self, unit: u8) -> BackendResult;
}

/// A vertex buffer descriptor (vertex array object).
pub trait BufferDescriptor: Send + Sync {
    /// Binds the descriptor.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    fn bind(&self) -> BackendResult;

    /// Unbinds the descriptor.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    fn unbind(&self) -> BackendResult;
}

/// Overlay text renderer.
pub trait TextRenderer: Send + Sync {
    /// Draws `command.text` at the given position, scale and color.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    fn render_text(&self, command: &TextCommand<'_>) -> BackendResult;
}

/// Handle table shared by the producer and the render thread.
///
/// Registration and release may happen from any thread; lookups happen on
/// the render thread during replay. Handles are never reused.
pub struct ResourceRegistry {
    textures: RwLock<HashMap<ResourceHandle, Arc<dyn Texture>>>,
    descriptors: RwLock<HashMap<ResourceHandle, Arc<dyn BufferDescriptor>>>,
    text_renderers: RwLock<HashMap<ResourceHandle, Arc<dyn TextRenderer>>>,
    next_handle: AtomicU32,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            textures: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
            text_renderers: RwLock::new(HashMap::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    fn allocate(&self) -> ResourceHandle {
        ResourceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a texture.
    pub fn register_texture(&self, texture: Arc<dyn Texture>) -> ResourceHandle {
        let handle = self.allocate();
        self.textures.write().insert(handle, texture);
        handle
    }

    /// Registers a buffer descriptor.
    pub fn register_descriptor(&self, descriptor: Arc<dyn BufferDescriptor>) -> ResourceHandle {
        let handle = self.allocate();
        self.descriptors.write().insert(handle, descriptor);
        handle
    }

    /// Registers a text renderer.
    pub fn register_text_renderer(&self, renderer: Arc<dyn TextRenderer>) -> ResourceHandle {
        let handle = self.allocate();
        self.text_renderers.write().insert(handle, renderer);
        handle
    }

    /// Looks up a texture.
    #[must_use]
    pub fn texture(&self, handle: ResourceHandle) -> Option<Arc<dyn Texture>> {
        self.textures.read().get(&handle).cloned()
    }

    /// Looks up a buffer descriptor.
    #[must_use]
    pub fn descriptor(&self, handle: ResourceHandle) -> Option<Arc<dyn BufferDescriptor>> {
        self.descriptors.read().get(&handle).cloned()
    }

    /// Looks up a text renderer.
    #[must_use]
    pub fn text_renderer(&self, handle: ResourceHandle) -> Option<Arc<dyn TextRenderer>> {
        self.text_renderers.read().get(&handle).cloned()
    }

    /// Drops the registry's reference to whatever `handle` names.
    ///
    /// Records already encoded with this handle fail to resolve at replay.
    /// Returns true if something was removed.
    pub fn release(&self, handle: ResourceHandle) -> bool {
        self.textures.write().remove(&handle).is_some()
            || self.descriptors.write().remove(&handle).is_some()
            || self.text_renderers.write().remove(&handle).is_some()
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.read().len() + self.descriptors.read().len() + self.text_renderers.read().len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("textures", &self.textures.read().len())
            .field("descriptors", &self.descriptors.read().len())
            .field("text_renderers", &self.text_renderers.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{CallLog, RecordingTexture};

    #[test]
    fn test_handles_start_at_one_and_are_unique() {
        let registry = ResourceRegistry::new();
        let log = CallLog::default();
        let a = registry.register_texture(Arc::new(RecordingTexture::new(1, log.clone())));
        let b = registry.register_texture(Arc::new(RecordingTexture::new(2, log)));
        assert_eq!(a.raw(), 1);
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_removes() {
        let registry = ResourceRegistry::new();
        let handle = registry.register_texture(Arc::new(RecordingTexture::new(1, CallLog::default())));
        assert!(registry.texture(handle).is_some());
        assert!(registry.release(handle));
        assert!(registry.texture(handle).is_none());
        assert!(!registry.release(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_kinds_do_not_alias() {
        let registry = ResourceRegistry::new();
        let handle = registry.register_texture(Arc::new(RecordingTexture::new(1, CallLog::default())));
        assert!(registry.descriptor(handle).is_none());
        assert!(registry.text_renderer(handle).is_none());
    }
}
