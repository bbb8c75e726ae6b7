//! # Rendering Pipeline
//!
//! Producer-side API and render thread ownership.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        FRAME HANDSHAKE                            │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  Producer                              Render thread              │
//! │    push_*() into insert buffer                                    │
//! │    finish_render() ──insert-ready──▶   swap                       │
//! │                                        replay + zero              │
//! │                                        present                    │
//! │    next push_*()   ◀──render-ready──   post retired buffer        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The buffers themselves travel through the handshakes. Whichever side
//! holds a buffer is the only side that can reach it.

mod driver;
mod possession;
mod shared;
mod stats;
mod swap;

pub use possession::{ContextGuard, PossessionHandle, PossessionState};
pub use shared::RenderThreadState;
pub use stats::RenderStats;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tau_core::{rendezvous, Rendezvous, RendezvousError, Submitter};
use tracing::{debug, info, warn};

use self::driver::{DriverParts, RenderDriver};
use self::shared::PipelineShared;
use crate::backend::{GlEnum, RenderBackend, ResourceHandle, ResourceRegistry, Window};
use crate::command::{Instruction, InstructionBuffer, TextCommand, UniformValue};
use crate::config::PipelineConfig;
use crate::error::{BackendError, EncodeError, PipelineError, PipelineResult};

/// Deferred rendering pipeline.
///
/// Owns two instruction buffers and the render thread. The thread that
/// constructs it is the producer: it records with the `push_*` methods and
/// closes each frame with [`finish_render`](Self::finish_render).
///
/// Pushing never blocks unless the producer has no buffer to write into,
/// which is the case between `finish_render` and the render thread handing
/// the previous buffer back.
///
/// ## Usage
///
/// ```rust
/// use std::sync::Arc;
/// use tau_rendering::backend::gl;
/// use tau_rendering::backend::recording::{CallLog, RecordingBackend, RecordingWindow};
/// use tau_rendering::RenderingPipeline;
///
/// let log = CallLog::new();
/// let window = Arc::new(RecordingWindow::new(log.clone()));
/// let backend_log = log.clone();
/// let mut pipeline = RenderingPipeline::new(window, move |_| {
///     Ok(RecordingBackend::new(backend_log))
/// })?;
///
/// pipeline.push_activate_shader_program(7)?;
/// pipeline.push_draw_arrays(gl::TRIANGLES, 0, 3)?;
/// pipeline.finish_render()?;
/// pipeline.wait_render_ready()?;
///
/// assert_eq!(pipeline.stats().draw_calls, 1);
/// pipeline.shutdown()?;
/// # Ok::<(), tau_rendering::PipelineError>(())
/// ```
pub struct RenderingPipeline<W: Window> {
    shared: Arc<PipelineShared>,
    window: Arc<W>,
    registry: Arc<ResourceRegistry>,
    config: PipelineConfig,
    insert: Option<InstructionBuffer>,
    insert_ready: Option<Submitter<InstructionBuffer>>,
    render_ready: Rendezvous<InstructionBuffer>,
    render_thread: Option<JoinHandle<()>>,
    frames_submitted: u64,
}

impl<W: Window> RenderingPipeline<W> {
    /// Creates a pipeline with the default configuration.
    ///
    /// # Errors
    ///
    /// As [`with_config`](Self::with_config).
    pub fn new<B, F>(window: Arc<W>, backend_factory: F) -> PipelineResult<Self>
    where
        B: RenderBackend + 'static,
        F: FnOnce(&W) -> Result<B, BackendError> + Send + 'static,
    {
        Self::with_config(window, PipelineConfig::default(), backend_factory)
    }

    /// Creates a pipeline and starts its render thread.
    ///
    /// The context is unloaded from the calling thread, then the render
    /// thread makes it current and runs `backend_factory` before it accepts
    /// frames. If either step fails the thread stops, and the producer sees
    /// [`PipelineError::RenderThreadGone`] on its next wait.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Config`] if `config` is out of range
    /// - [`PipelineError::Spawn`] if the thread cannot be created
    pub fn with_config<B, F>(
        window: Arc<W>,
        config: PipelineConfig,
        backend_factory: F,
    ) -> PipelineResult<Self>
    where
        B: RenderBackend + 'static,
        F: FnOnce(&W) -> Result<B, BackendError> + Send + 'static,
    {
        config.validate()?;

        let shared = Arc::new(PipelineShared::new(
            config.possession_return_timeout(),
            config.insert_wait_timeout(),
        ));
        let registry = Arc::new(ResourceRegistry::new());
        let (insert_tx, insert_rx) = rendezvous();
        let (render_tx, render_rx) = rendezvous();

        window.unload_current_context();

        let parts = DriverParts {
            shared: Arc::clone(&shared),
            window: Arc::clone(&window),
            registry: Arc::clone(&registry),
            front: InstructionBuffer::new(config.buffer_capacity),
            insert_ready: insert_rx,
            render_ready: render_tx,
            insert_wait: config.insert_wait_timeout(),
        };
        let render_thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                if let Ok(driver) = RenderDriver::initialize(parts, backend_factory) {
                    driver.run();
                }
            })?;

        info!(
            capacity = config.buffer_capacity,
            thread = %config.thread_name,
            "rendering pipeline started"
        );

        Ok(Self {
            shared,
            window,
            registry,
            insert: Some(InstructionBuffer::new(config.buffer_capacity)),
            config,
            insert_ready: Some(insert_tx),
            render_ready: render_rx,
            render_thread: Some(render_thread),
            frames_submitted: 0,
        })
    }

    // =========================================================================
    // Frame handshake
    // =========================================================================

    /// Encodes one record into the insert buffer.
    ///
    /// Waits for render-ready first if the producer holds no buffer.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Encode`] if the record does not fit; the buffer is
    ///   unchanged and the frame can still be finished
    /// - [`PipelineError::RenderThreadGone`] if no buffer will come back
    pub fn push(&mut self, instruction: &Instruction<'_>) -> PipelineResult<()> {
        if matches!(instruction, Instruction::FinishRender) {
            return self.finish_render();
        }
        let buffer = self.insert_buffer()?;
        match buffer.encoder().encode(instruction) {
            Ok(_) => Ok(()),
            Err(err) => {
                if let EncodeError::BufferOverflow {
                    required,
                    remaining,
                    ..
                } = err
                {
                    warn!(
                        opcode = ?instruction.opcode(),
                        required,
                        remaining,
                        "instruction buffer overflow"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Terminates the frame and hands the buffer to the render thread.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RenderThreadGone`] if the render thread has
    /// stopped.
    pub fn finish_render(&mut self) -> PipelineResult<()> {
        self.insert_buffer()?.encoder().finish()?;
        let Some(buffer) = self.insert.take() else {
            return Err(self.gone());
        };
        let records = buffer.records();
        let Some(submitter) = self.insert_ready.as_ref() else {
            return Err(self.gone());
        };
        submitter.submit(buffer).map_err(|_| self.gone())?;
        self.frames_submitted += 1;
        debug!(frame = self.frames_submitted, records, "frame submitted");
        Ok(())
    }

    /// Blocks until the render thread hands a buffer back.
    ///
    /// Returns at once if the producer already holds one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RenderThreadGone`] if the render thread has
    /// stopped.
    pub fn wait_render_ready(&mut self) -> PipelineResult<()> {
        self.insert_buffer().map(|_| ())
    }

    /// As [`wait_render_ready`](Self::wait_render_ready), giving up after
    /// `timeout`. Returns whether the producer now holds a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RenderThreadGone`] if the render thread has
    /// stopped.
    pub fn wait_render_ready_timeout(&mut self, timeout: Duration) -> PipelineResult<bool> {
        if self.insert.is_some() {
            return Ok(true);
        }
        match self.render_ready.take_timeout(timeout) {
            Ok(buffer) => {
                self.insert = Some(buffer);
                Ok(true)
            }
            Err(RendezvousError::Timeout) => Ok(false),
            Err(_) => Err(self.gone()),
        }
    }

    /// True if a push would not block.
    #[must_use]
    pub fn is_render_ready(&self) -> bool {
        self.insert.is_some() || self.render_ready.is_pending()
    }

    fn insert_buffer(&mut self) -> PipelineResult<&mut InstructionBuffer> {
        let buffer = match self.insert.take() {
            Some(buffer) => buffer,
            None => self.render_ready.take().map_err(|_| self.gone())?,
        };
        Ok(self.insert.insert(buffer))
    }

    fn gone(&self) -> PipelineError {
        PipelineError::RenderThreadGone {
            reason: self
                .shared
                .failure()
                .unwrap_or_else(|| "render thread has terminated".to_owned()),
        }
    }

    // =========================================================================
    // Typed pushes
    // =========================================================================

    /// Loads a uniform into the current program.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_load_uniform(
        &mut self,
        location: i32,
        value: impl Into<UniformValue>,
    ) -> PipelineResult<()> {
        self.push(&Instruction::LoadShaderUniform {
            location,
            value: value.into(),
        })
    }

    /// Makes `program` current.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_activate_shader_program(&mut self, program: u32) -> PipelineResult<()> {
        self.push(&Instruction::ActivateShaderProgram { program })
    }

    /// Deactivates the current program.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_deactivate_shader_program(&mut self) -> PipelineResult<()> {
        self.push_activate_shader_program(0)
    }

    /// Selects texture unit `unit`.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_activate_texture_unit(&mut self, unit: u8) -> PipelineResult<()> {
        self.push(&Instruction::ActivateTextureUnit { unit })
    }

    /// Binds a registered texture to `unit`.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_bind_texture(&mut self, texture: ResourceHandle, unit: u8) -> PipelineResult<()> {
        self.push(&Instruction::BindTexture { texture, unit })
    }

    /// Unbinds a registered texture from `unit`.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_unbind_texture(
        &mut self,
        texture: ResourceHandle,
        unit: u8,
    ) -> PipelineResult<()> {
        self.push(&Instruction::UnbindTexture { texture, unit })
    }

    /// Binds a registered buffer descriptor.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_bind_buffer_descriptor(&mut self, descriptor: ResourceHandle) -> PipelineResult<()> {
        self.push(&Instruction::BindBufferDescriptor { descriptor })
    }

    /// Unbinds a registered buffer descriptor.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_unbind_buffer_descriptor(
        &mut self,
        descriptor: ResourceHandle,
    ) -> PipelineResult<()> {
        self.push(&Instruction::UnbindBufferDescriptor { descriptor })
    }

    /// Binds `buffer` to `target`; `0` unbinds.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_bind_buffer(&mut self, target: GlEnum, buffer: u32) -> PipelineResult<()> {
        self.push(&Instruction::BindBuffer { target, buffer })
    }

    /// Enables a vertex attribute array.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_enable_vertex_attribute(&mut self, index: u32) -> PipelineResult<()> {
        self.push(&Instruction::EnableVertexAttribute { index })
    }

    /// Disables a vertex attribute array.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_disable_vertex_attribute(&mut self, index: u32) -> PipelineResult<()> {
        self.push(&Instruction::DisableVertexAttribute { index })
    }

    /// Non-indexed draw.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_draw_arrays(&mut self, mode: GlEnum, first: i32, count: i32) -> PipelineResult<()> {
        self.push(&Instruction::DrawArrays { mode, first, count })
    }

    /// Indexed draw from the bound element buffer.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_draw_elements(
        &mut self,
        mode: GlEnum,
        count: i32,
        index_type: GlEnum,
        offset: u64,
    ) -> PipelineResult<()> {
        self.push(&Instruction::DrawElements {
            mode,
            count,
            index_type,
            offset,
        })
    }

    /// Clears the planes in `mask`.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_clear_buffers(&mut self, mask: u32) -> PipelineResult<()> {
        self.push(&Instruction::ClearBuffers { mask })
    }

    /// Copies `data` into the stream; at replay it fills the buffer bound to
    /// `target`.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_load_buffer_data(
        &mut self,
        target: GlEnum,
        data: &[u8],
        usage: GlEnum,
    ) -> PipelineResult<()> {
        self.push(&Instruction::LoadBufferData {
            target,
            data,
            usage,
        })
    }

    /// Copies `data` into the stream; at replay it overwrites the buffer
    /// bound to `target` from `offset`.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_modify_buffer_data(
        &mut self,
        target: GlEnum,
        offset: u64,
        data: &[u8],
    ) -> PipelineResult<()> {
        self.push(&Instruction::ModifyBufferData {
            target,
            offset,
            data,
        })
    }

    /// Enables a capability.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_enable(&mut self, capability: GlEnum) -> PipelineResult<()> {
        self.push(&Instruction::Enable { capability })
    }

    /// Disables a capability.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_disable(&mut self, capability: GlEnum) -> PipelineResult<()> {
        self.push(&Instruction::Disable { capability })
    }

    /// Sets front-face winding.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_face_winding(&mut self, mode: GlEnum) -> PipelineResult<()> {
        self.push(&Instruction::FaceWinding { mode })
    }

    /// Sets the viewport.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_resize_viewport(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> PipelineResult<()> {
        self.push(&Instruction::ResizeViewport {
            x,
            y,
            width,
            height,
        })
    }

    /// Draws text through a registered text renderer.
    ///
    /// # Errors
    ///
    /// As [`push`](Self::push).
    pub fn push_render_text(&mut self, text: &TextCommand<'_>) -> PipelineResult<()> {
        self.push(&Instruction::RenderText(*text))
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// A handle other threads can use to borrow the context.
    #[must_use]
    pub fn possession_handle(&self) -> PossessionHandle<W> {
        PossessionHandle::new(Arc::clone(&self.shared), Arc::clone(&self.window))
    }

    /// The handle table instruction records resolve against.
    #[must_use]
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// The window the pipeline renders to.
    #[must_use]
    pub fn window(&self) -> &Arc<W> {
        &self.window
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render thread totals.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        self.shared.stats.snapshot()
    }

    /// Frames handed to the render thread so far.
    #[must_use]
    pub const fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Where the render thread is in its lifecycle.
    #[must_use]
    pub fn driver_state(&self) -> RenderThreadState {
        self.shared.driver_state()
    }

    /// Who holds the context.
    #[must_use]
    pub fn possession_state(&self) -> PossessionState {
        self.shared.possession.state()
    }

    /// Bytes left in the insert buffer, or `None` while the render thread
    /// holds both buffers.
    #[must_use]
    pub fn insert_remaining(&self) -> Option<usize> {
        self.insert.as_ref().map(InstructionBuffer::remaining)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops the render thread and waits for it.
    ///
    /// A frame being replayed is finished first. A submitted frame the
    /// render thread has not started is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RenderThreadGone`] if the thread panicked or
    /// had already failed.
    pub fn shutdown(mut self) -> PipelineResult<()> {
        self.stop()
    }

    fn stop(&mut self) -> PipelineResult<()> {
        let Some(handle) = self.render_thread.take() else {
            return Ok(());
        };
        self.shared.exit.signal();
        self.insert_ready = None;
        if handle.join().is_err() {
            return Err(PipelineError::RenderThreadGone {
                reason: "render thread panicked".to_owned(),
            });
        }
        info!(frames = self.frames_submitted, "rendering pipeline stopped");
        match self.shared.failure() {
            Some(reason) => Err(PipelineError::RenderThreadGone { reason }),
            None => Ok(()),
        }
    }
}

impl<W: Window> Drop for RenderingPipeline<W> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "render thread did not stop cleanly");
        }
    }
}

impl<W: Window> std::fmt::Debug for RenderingPipeline<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingPipeline")
            .field("shared", &self.shared)
            .field("holds_insert_buffer", &self.insert.is_some())
            .field("frames_submitted", &self.frames_submitted)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
