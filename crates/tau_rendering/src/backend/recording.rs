//! In-memory graphics collaborators.
//!
//! Every call lands in a shared [`CallLog`] instead of a GPU, which makes
//! the replay order observable from another thread. Used by the tests and
//! benches, and handy for headless runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::{BufferDescriptor, GlEnum, RenderBackend, TextRenderer, Texture, Window};
use crate::command::{TextCommand, UniformValue};
use crate::error::{BackendError, BackendResult};

/// One observed graphics call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum RecordedCall {
    LoadUniform { location: i32, value: UniformValue },
    UseProgram(u32),
    ActiveTextureUnit(u8),
    BindTexture { id: u32, unit: u8 },
    UnbindTexture { id: u32, unit: u8 },
    BindDescriptor(u32),
    UnbindDescriptor(u32),
    BindBuffer { target: GlEnum, buffer: u32 },
    EnableVertexAttribute(u32),
    DisableVertexAttribute(u32),
    DrawArrays { mode: GlEnum, first: i32, count: i32 },
    DrawElements { mode: GlEnum, count: i32, index_type: GlEnum, offset: u64 },
    Clear(u32),
    BufferData { target: GlEnum, data: Vec<u8>, usage: GlEnum },
    BufferSubData { target: GlEnum, offset: u64, data: Vec<u8> },
    Enable(GlEnum),
    Disable(GlEnum),
    FrontFace(GlEnum),
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    RenderText { renderer: u32, text: String, x: f32, y: f32, scale: f32 },
    MakeCurrent(ThreadId),
    UnloadContext(ThreadId),
    SwapBuffers,
}

impl RecordedCall {
    /// True for draw calls.
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        matches!(
            self,
            RecordedCall::DrawArrays { .. } | RecordedCall::DrawElements { .. }
        )
    }
}

/// Shared, ordered log of recorded calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn push(&self, call: RecordedCall) {
        self.calls.lock().push(call);
    }

    /// Copies out everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }
}

/// [`RenderBackend`] that records instead of drawing.
///
/// Can be told to fail one named call, for exercising the interpreter's
/// continue-on-failure path.
#[derive(Debug)]
pub struct RecordingBackend {
    log: CallLog,
    fail_on: Option<&'static str>,
}

impl RecordingBackend {
    /// Creates a backend logging into `log`.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self { log, fail_on: None }
    }

    /// Makes every call named `call` fail without being logged.
    #[must_use]
    pub fn failing_on(mut self, call: &'static str) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// The log this backend writes to.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    fn record(&self, name: &'static str, call: RecordedCall) -> BackendResult {
        if self.fail_on == Some(name) {
            return Err(BackendError::new(name, "injected failure"));
        }
        self.log.push(call);
        Ok(())
    }
}

impl RenderBackend for RecordingBackend {
    fn load_uniform(&mut self, location: i32, value: &UniformValue) -> BackendResult {
        self.record(
            "load_uniform",
            RecordedCall::LoadUniform {
                location,
                value: *value,
            },
        )
    }

    fn use_program(&mut self, program: u32) -> BackendResult {
        self.record("use_program", RecordedCall::UseProgram(program))
    }

    fn active_texture_unit(&mut self, unit: u8) -> BackendResult {
        self.record("active_texture_unit", RecordedCall::ActiveTextureUnit(unit))
    }

    fn bind_buffer(&mut self, target: GlEnum, buffer: u32) -> BackendResult {
        self.record("bind_buffer", RecordedCall::BindBuffer { target, buffer })
    }

    fn enable_vertex_attribute(&mut self, index: u32) -> BackendResult {
        self.record(
            "enable_vertex_attribute",
            RecordedCall::EnableVertexAttribute(index),
        )
    }

    fn disable_vertex_attribute(&mut self, index: u32) -> BackendResult {
        self.record(
            "disable_vertex_attribute",
            RecordedCall::DisableVertexAttribute(index),
        )
    }

    fn draw_arrays(&mut self, mode: GlEnum, first: i32, count: i32) -> BackendResult {
        self.record("draw_arrays", RecordedCall::DrawArrays { mode, first, count })
    }

    fn draw_elements(
        &mut self,
        mode: GlEnum,
        count: i32,
        index_type: GlEnum,
        offset: u64,
    ) -> BackendResult {
        self.record(
            "draw_elements",
            RecordedCall::DrawElements {
                mode,
                count,
                index_type,
                offset,
            },
        )
    }

    fn clear(&mut self, mask: u32) -> BackendResult {
        self.record("clear", RecordedCall::Clear(mask))
    }

    fn buffer_data(&mut self, target: GlEnum, data: &[u8], usage: GlEnum) -> BackendResult {
        self.record(
            "buffer_data",
            RecordedCall::BufferData {
                target,
                data: data.to_vec(),
                usage,
            },
        )
    }

    fn buffer_sub_data(&mut self, target: GlEnum, offset: u64, data: &[u8]) -> BackendResult {
        self.record(
            "buffer_sub_data",
            RecordedCall::BufferSubData {
                target,
                offset,
                data: data.to_vec(),
            },
        )
    }

    fn enable(&mut self, capability: GlEnum) -> BackendResult {
        self.record("enable", RecordedCall::Enable(capability))
    }

    fn disable(&mut self, capability: GlEnum) -> BackendResult {
        self.record("disable", RecordedCall::Disable(capability))
    }

    fn front_face(&mut self, mode: GlEnum) -> BackendResult {
        self.record("front_face", RecordedCall::FrontFace(mode))
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) -> BackendResult {
        self.record(
            "viewport",
            RecordedCall::Viewport {
                x,
                y,
                width,
                height,
            },
        )
    }
}

/// Texture that logs binds.
#[derive(Debug)]
pub struct RecordingTexture {
    id: u32,
    log: CallLog,
}

impl RecordingTexture {
    /// Creates a texture with a caller-chosen id.
    #[must_use]
    pub fn new(id: u32, log: CallLog) -> Self {
        Self { id, log }
    }
}

impl Texture for RecordingTexture {
    fn bind(&self, unit: u8) -> BackendResult {
        self.log.push(RecordedCall::BindTexture { id: self.id, unit });
        Ok(())
    }

    fn unbind(&self, unit: u8) -> BackendResult {
        self.log.push(RecordedCall::UnbindTexture { id: self.id, unit });
        Ok(())
    }
}

/// Buffer descriptor that logs binds.
#[derive(Debug)]
pub struct RecordingDescriptor {
    id: u32,
    log: CallLog,
}

impl RecordingDescriptor {
    /// Creates a descriptor with a caller-chosen id.
    #[must_use]
    pub fn new(id: u32, log: CallLog) -> Self {
        Self { id, log }
    }
}

impl BufferDescriptor for RecordingDescriptor {
    fn bind(&self) -> BackendResult {
        self.log.push(RecordedCall::BindDescriptor(self.id));
        Ok(())
    }

    fn unbind(&self) -> BackendResult {
        self.log.push(RecordedCall::UnbindDescriptor(self.id));
        Ok(())
    }
}

/// Text renderer that logs strings.
#[derive(Debug)]
pub struct RecordingTextRenderer {
    id: u32,
    log: CallLog,
}

impl RecordingTextRenderer {
    /// Creates a text renderer with a caller-chosen id.
    #[must_use]
    pub fn new(id: u32, log: CallLog) -> Self {
        Self { id, log }
    }
}

impl TextRenderer for RecordingTextRenderer {
    fn render_text(&self, command: &TextCommand<'_>) -> BackendResult {
        self.log.push(RecordedCall::RenderText {
            renderer: self.id,
            text: command.text.to_owned(),
            x: command.x,
            y: command.y,
            scale: command.scale,
        });
        Ok(())
    }
}

/// Window whose context enforces single-thread ownership.
///
/// `make_context_current` fails while another thread holds the context,
/// and `swap_buffers` fails on a thread that does not hold it.
#[derive(Debug, Default)]
pub struct RecordingWindow {
    log: CallLog,
    owner: Mutex<Option<ThreadId>>,
    presents: AtomicU64,
    refuse_context: AtomicBool,
}

impl RecordingWindow {
    /// Creates a window whose context is current on the calling thread,
    /// like a freshly created platform window.
    #[must_use]
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            owner: Mutex::new(Some(thread::current().id())),
            presents: AtomicU64::new(0),
            refuse_context: AtomicBool::new(false),
        }
    }

    /// Makes every later `make_context_current` fail.
    pub fn refuse_context(&self) {
        self.refuse_context.store(true, Ordering::Release);
    }

    /// Thread currently holding the context.
    #[must_use]
    pub fn owner(&self) -> Option<ThreadId> {
        *self.owner.lock()
    }

    /// Frames presented so far.
    #[must_use]
    pub fn present_count(&self) -> u64 {
        self.presents.load(Ordering::Acquire)
    }

    /// The log this window writes to.
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl Window for RecordingWindow {
    fn make_context_current(&self) -> BackendResult {
        if self.refuse_context.load(Ordering::Acquire) {
            return Err(BackendError::new("make_context_current", "context refused"));
        }
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        match *owner {
            Some(other) if other != me => Err(BackendError::new(
                "make_context_current",
                format!("context is current on {other:?}"),
            )),
            _ => {
                *owner = Some(me);
                self.log.push(RecordedCall::MakeCurrent(me));
                Ok(())
            }
        }
    }

    fn unload_current_context(&self) {
        let me = thread::current().id();
        let mut owner = self.owner.lock();
        if *owner == Some(me) {
            *owner = None;
            self.log.push(RecordedCall::UnloadContext(me));
        }
    }

    fn swap_buffers(&self) -> BackendResult {
        if *self.owner.lock() != Some(thread::current().id()) {
            return Err(BackendError::new(
                "swap_buffers",
                "context is not current on this thread",
            ));
        }
        self.presents.fetch_add(1, Ordering::AcqRel);
        self.log.push(RecordedCall::SwapBuffers);
        Ok(())
    }
}
