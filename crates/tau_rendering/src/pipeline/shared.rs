//! State shared between the producer side and the render thread.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tau_core::Signal;
use tracing::error;

use super::possession::PossessionProtocol;
use super::stats::StatsCounters;

/// Lifecycle of the render thread.
///
/// ```text
/// Initializing ─▶ WaitingForFirstFrame ─▶ Rendering ⇄ PossessionYielded
///       │                   │                 │                │
///       └───────────────────┴─────────────────┴────────────────┴──▶ Terminating
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderThreadState {
    /// Binding the context and building the backend.
    Initializing = 0,
    /// Ready, no frame replayed yet.
    WaitingForFirstFrame = 1,
    /// Replaying frames, or waiting for the next one.
    Rendering = 2,
    /// The context is lent to another thread.
    PossessionYielded = 3,
    /// The loop has ended or is about to.
    Terminating = 4,
}

impl RenderThreadState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RenderThreadState::Initializing,
            1 => RenderThreadState::WaitingForFirstFrame,
            2 => RenderThreadState::Rendering,
            3 => RenderThreadState::PossessionYielded,
            _ => RenderThreadState::Terminating,
        }
    }
}

pub(crate) struct PipelineShared {
    pub(crate) exit: Signal,
    pub(crate) possession: PossessionProtocol,
    pub(crate) stats: StatsCounters,
    state: AtomicU8,
    failure: Mutex<Option<String>>,
}

impl PipelineShared {
    pub(crate) fn new(possession_return_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            exit: Signal::new(),
            possession: PossessionProtocol::new(possession_return_timeout, poll_interval),
            stats: StatsCounters::default(),
            state: AtomicU8::new(RenderThreadState::Initializing as u8),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn driver_state(&self) -> RenderThreadState {
        RenderThreadState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_driver_state(&self, state: RenderThreadState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Records why the render thread is stopping. The first reason wins.
    pub(crate) fn fail(&self, reason: String) {
        error!(%reason, "render thread failed");
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(reason);
        }
    }

    pub(crate) fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }
}

impl std::fmt::Debug for PipelineShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineShared")
            .field("state", &self.driver_state())
            .field("exit", &self.exit.is_signaled())
            .field("possession", &self.possession.state())
            .finish_non_exhaustive()
    }
}
