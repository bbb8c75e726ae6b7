//! # Render Thread Driver
//!
//! The loop that owns the context:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ exit set? ──yes──▶ Terminating                             │
//! │    │ no                                                    │
//! │ possession requested? ──yes──▶ lend, wait for return       │
//! │    │ no                                                    │
//! │ wait insert-ready (bounded) ──timeout──▶ next iteration    │
//! │    │ frame                                                 │
//! │ swap ─▶ replay ─▶ present ─▶ post render-ready             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exit is only observed between frames, so a frame that started replaying
//! always finishes.

use std::sync::Arc;
use std::time::Duration;

use tau_core::{Rendezvous, RendezvousError, Submitter};
use tracing::{debug, info, warn};

use super::possession::LendOutcome;
use super::shared::{PipelineShared, RenderThreadState};
use super::swap::FrameSwap;
use crate::backend::{RenderBackend, ResourceRegistry, Window};
use crate::command::InstructionBuffer;
use crate::error::BackendError;
use crate::interpreter::{FrameReport, Interpreter};

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DriverStep {
    /// Stop the loop.
    Exit,
    /// The context was lent out and came back.
    Yielded,
    /// No frame arrived within the wait.
    Idle,
    /// A frame was replayed and presented.
    Rendered(FrameReport),
    /// The thread cannot continue.
    Failed,
}

/// Everything the render thread is handed at spawn time.
pub(crate) struct DriverParts<W: Window> {
    pub(crate) shared: Arc<PipelineShared>,
    pub(crate) window: Arc<W>,
    pub(crate) registry: Arc<ResourceRegistry>,
    pub(crate) front: InstructionBuffer,
    pub(crate) insert_ready: Rendezvous<InstructionBuffer>,
    pub(crate) render_ready: Submitter<InstructionBuffer>,
    pub(crate) insert_wait: Duration,
}

pub(crate) struct RenderDriver<W: Window, B: RenderBackend> {
    shared: Arc<PipelineShared>,
    window: Arc<W>,
    registry: Arc<ResourceRegistry>,
    backend: B,
    interpreter: Interpreter,
    frames: FrameSwap,
    insert_ready: Rendezvous<InstructionBuffer>,
    render_ready: Submitter<InstructionBuffer>,
    insert_wait: Duration,
    owns_context: bool,
}

impl<W: Window, B: RenderBackend> RenderDriver<W, B> {
    /// Binds the context to the calling thread and builds the backend.
    ///
    /// A failure is recorded in the shared state before the handshake
    /// endpoints are dropped, so the producer can report why.
    pub(crate) fn initialize<F>(parts: DriverParts<W>, factory: F) -> Result<Self, BackendError>
    where
        F: FnOnce(&W) -> Result<B, BackendError>,
    {
        parts.shared.set_driver_state(RenderThreadState::Initializing);
        if let Err(err) = parts.window.make_context_current() {
            parts
                .shared
                .fail(format!("could not bind graphics context: {err}"));
            parts.shared.set_driver_state(RenderThreadState::Terminating);
            return Err(err);
        }
        let backend = match factory(&*parts.window) {
            Ok(backend) => backend,
            Err(err) => {
                parts.window.unload_current_context();
                parts
                    .shared
                    .fail(format!("could not create render backend: {err}"));
                parts.shared.set_driver_state(RenderThreadState::Terminating);
                return Err(err);
            }
        };
        parts
            .shared
            .set_driver_state(RenderThreadState::WaitingForFirstFrame);

        Ok(Self {
            shared: parts.shared,
            window: parts.window,
            registry: parts.registry,
            backend,
            interpreter: Interpreter::new(),
            frames: FrameSwap::new(parts.front),
            insert_ready: parts.insert_ready,
            render_ready: parts.render_ready,
            insert_wait: parts.insert_wait,
            owns_context: true,
        })
    }

    /// Runs until exit, producer disconnect or failure.
    pub(crate) fn run(mut self) {
        info!("render thread started");
        loop {
            match self.step() {
                DriverStep::Exit | DriverStep::Failed => break,
                DriverStep::Rendered(report) if report.backend_failures > 0 => {
                    warn!(
                        failures = report.backend_failures,
                        "frame presented with failed graphics calls"
                    );
                }
                DriverStep::Yielded | DriverStep::Idle | DriverStep::Rendered(_) => {}
            }
        }
        self.shared.set_driver_state(RenderThreadState::Terminating);
        if self.owns_context {
            self.window.unload_current_context();
        }
        info!(
            frames = self.shared.stats.frames_rendered(),
            swaps = self.frames.swaps(),
            "render thread stopped"
        );
    }

    /// One loop iteration.
    pub(crate) fn step(&mut self) -> DriverStep {
        if self.shared.exit.is_signaled() {
            return DriverStep::Exit;
        }
        if self.shared.possession.take_request() {
            return self.yield_context();
        }
        match self.insert_ready.take_timeout(self.insert_wait) {
            Ok(buffer) => self.render_frame(buffer),
            Err(RendezvousError::Timeout) => {
                self.shared.stats.record_idle();
                DriverStep::Idle
            }
            Err(RendezvousError::Disconnected | RendezvousError::Occupied) => {
                debug!("producer disconnected");
                DriverStep::Exit
            }
        }
    }

    fn yield_context(&mut self) -> DriverStep {
        let resume_state = self.shared.driver_state();
        self.shared
            .set_driver_state(RenderThreadState::PossessionYielded);
        self.shared.stats.record_grant();
        self.owns_context = false;

        match self
            .shared
            .possession
            .lend(&*self.window, &self.shared.exit)
        {
            LendOutcome::Returned => {
                self.owns_context = true;
                self.shared.set_driver_state(resume_state);
                DriverStep::Yielded
            }
            LendOutcome::AbandonedOnExit => DriverStep::Exit,
            LendOutcome::Failed(err) => {
                self.shared
                    .fail(format!("could not reacquire graphics context: {err}"));
                DriverStep::Failed
            }
        }
    }

    fn render_frame(&mut self, recorded: InstructionBuffer) -> DriverStep {
        self.shared.set_driver_state(RenderThreadState::Rendering);
        let retired = self.frames.swap(recorded);

        let report = match self.interpreter.execute(
            self.frames.front_mut(),
            &mut self.backend,
            &self.registry,
        ) {
            Ok(report) => report,
            Err(err) => {
                self.shared
                    .fail(format!("instruction stream desynchronized: {err}"));
                return DriverStep::Failed;
            }
        };

        if let Err(err) = self.window.swap_buffers() {
            warn!(error = %err, "present failed");
            self.shared.stats.record_backend_failure();
        }
        self.shared.stats.record_frame(&report);
        debug!(
            frame = self.interpreter.passes(),
            instructions = report.instructions,
            bytes = report.bytes_consumed,
            "frame presented"
        );

        if self.render_ready.submit(retired).is_err() {
            debug!("producer disconnected");
            return DriverStep::Exit;
        }
        DriverStep::Rendered(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::gl;
    use crate::backend::recording::{CallLog, RecordedCall, RecordingBackend, RecordingWindow};
    use crate::command::{Instruction, Opcode};
    use crate::pipeline::PossessionState;
    use tau_core::rendezvous;

    struct Harness {
        driver: RenderDriver<RecordingWindow, RecordingBackend>,
        window: Arc<RecordingWindow>,
        log: CallLog,
        insert: Submitter<InstructionBuffer>,
        returned: Rendezvous<InstructionBuffer>,
    }

    fn harness() -> Harness {
        let log = CallLog::new();
        let window = Arc::new(RecordingWindow::new(log.clone()));
        let (insert, insert_ready) = rendezvous();
        let (render_ready, returned) = rendezvous();
        let parts = DriverParts {
            shared: Arc::new(PipelineShared::new(
                Duration::from_millis(50),
                Duration::from_millis(5),
            )),
            window: Arc::clone(&window),
            registry: Arc::new(ResourceRegistry::new()),
            front: InstructionBuffer::new(128),
            insert_ready,
            render_ready,
            insert_wait: Duration::from_millis(5),
        };
        let backend_log = log.clone();
        let driver =
            RenderDriver::initialize(parts, move |_| Ok(RecordingBackend::new(backend_log)))
                .unwrap();
        log.drain();
        Harness {
            driver,
            window,
            log,
            insert,
            returned,
        }
    }

    #[test]
    fn test_initialize_sets_waiting_state() {
        let h = harness();
        assert_eq!(
            h.driver.shared.driver_state(),
            RenderThreadState::WaitingForFirstFrame
        );
    }

    #[test]
    fn test_idle_without_frame() {
        let mut h = harness();
        assert_eq!(h.driver.step(), DriverStep::Idle);
        assert!(h.log.is_empty());
        assert_eq!(h.driver.shared.stats.snapshot().idle_waits, 1);
    }

    #[test]
    fn test_frame_is_replayed_presented_and_returned() {
        let mut h = harness();
        let mut buffer = InstructionBuffer::new(128);
        {
            let mut encoder = buffer.encoder();
            encoder
                .encode(&Instruction::Enable {
                    capability: gl::BLEND,
                })
                .unwrap();
            encoder.finish().unwrap();
        }
        h.insert.submit(buffer).unwrap();

        let step = h.driver.step();
        assert!(matches!(step, DriverStep::Rendered(report) if report.instructions == 1));
        assert_eq!(
            h.log.snapshot(),
            vec![RecordedCall::Enable(gl::BLEND), RecordedCall::SwapBuffers]
        );
        let back = h.returned.try_take().unwrap().unwrap();
        assert!(back.is_zeroed());
        assert_eq!(h.driver.shared.driver_state(), RenderThreadState::Rendering);
    }

    #[test]
    fn test_exit_wins_over_pending_frame() {
        let mut h = harness();
        let mut buffer = InstructionBuffer::new(128);
        buffer.encoder().finish().unwrap();
        h.insert.submit(buffer).unwrap();
        h.driver.shared.exit.signal();
        assert_eq!(h.driver.step(), DriverStep::Exit);
        assert_eq!(h.window.present_count(), 0);
    }

    #[test]
    fn test_producer_drop_exits() {
        let mut h = harness();
        drop(h.insert);
        assert_eq!(h.driver.step(), DriverStep::Exit);
    }

    #[test]
    fn test_desync_fails_the_thread() {
        let mut h = harness();
        let mut buffer = InstructionBuffer::new(128);
        buffer.arena.write_u8(0xEE).unwrap();
        buffer.arena.write_u8(Opcode::FinishRender as u8).unwrap();
        h.insert.submit(buffer).unwrap();

        assert_eq!(h.driver.step(), DriverStep::Failed);
        assert!(h
            .driver
            .shared
            .failure()
            .unwrap()
            .contains("unknown opcode"));
        assert_eq!(h.window.present_count(), 0);
    }

    #[test]
    fn test_run_unloads_context_on_exit() {
        let h = harness();
        let render_thread = std::thread::current().id();
        assert_eq!(h.window.owner(), Some(render_thread));
        h.driver.shared.exit.signal();
        let shared = Arc::clone(&h.driver.shared);
        h.driver.run();
        assert_eq!(h.window.owner(), None);
        assert_eq!(shared.driver_state(), RenderThreadState::Terminating);
        assert_eq!(shared.possession.state(), PossessionState::OwnedByRenderThread);
    }

    #[test]
    fn test_factory_failure_releases_context() {
        let window = Arc::new(RecordingWindow::new(CallLog::new()));
        let shared = Arc::new(PipelineShared::new(
            Duration::from_millis(50),
            Duration::from_millis(5),
        ));
        let (_insert, insert_ready) = rendezvous();
        let (render_ready, _returned) = rendezvous();
        let parts = DriverParts {
            shared: Arc::clone(&shared),
            window: Arc::clone(&window),
            registry: Arc::new(ResourceRegistry::new()),
            front: InstructionBuffer::new(64),
            insert_ready,
            render_ready,
            insert_wait: Duration::from_millis(5),
        };
        let result = RenderDriver::<_, RecordingBackend>::initialize(parts, |_| {
            Err(BackendError::new("create_backend", "no device"))
        });
        assert!(result.is_err());
        assert_eq!(window.owner(), None);
        assert!(shared.failure().unwrap().contains("no device"));
        assert_eq!(shared.driver_state(), RenderThreadState::Terminating);
    }
}
