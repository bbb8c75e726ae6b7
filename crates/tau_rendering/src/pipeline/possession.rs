//! # Context Possession
//!
//! Lets a third thread borrow the graphics context between frames.
//!
//! ```text
//! Borrower                          Render thread (between frames)
//!   request ──────possession-request──▶ unload context
//!           ◀─────possession-granted─── wait for return (bounded, repeated)
//!   make current, issue calls
//!   unload  ──────possession-return───▶ make current, resume loop
//! ```
//!
//! The render thread never waits forever: each wait for the return is
//! bounded, a warning is logged every `possession_return_timeout`, and an
//! exit request ends the wait.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tau_core::Signal;
use tracing::{debug, info, warn};

use super::shared::{PipelineShared, RenderThreadState};
use crate::backend::Window;
use crate::error::{BackendError, PipelineError, PipelineResult};

/// Who holds the context, as seen by the handoff protocol.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PossessionState {
    /// The render thread holds the context.
    OwnedByRenderThread = 0,
    /// A borrower has asked; the render thread has not yet answered.
    ReleaseRequested = 1,
    /// The context is lent out.
    Released = 2,
    /// The borrower has handed it back; the render thread is rebinding.
    ReacquireRequested = 3,
    /// The render thread has rebound it. Reads as owned from the next
    /// loop iteration on.
    Reacquired = 4,
}

impl PossessionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PossessionState::OwnedByRenderThread,
            1 => PossessionState::ReleaseRequested,
            2 => PossessionState::Released,
            3 => PossessionState::ReacquireRequested,
            _ => PossessionState::Reacquired,
        }
    }
}

/// How a loan ended, from the render thread's side.
#[derive(Debug)]
pub(crate) enum LendOutcome {
    /// The context came back and is current again.
    Returned,
    /// Exit was requested before the context came back.
    AbandonedOnExit,
    /// The context came back but could not be rebound.
    Failed(BackendError),
}

/// The three signals of the handoff plus its observable state.
pub(crate) struct PossessionProtocol {
    request: Signal,
    granted: Signal,
    returned: Signal,
    state: AtomicU8,
    return_timeout: Duration,
    poll_interval: Duration,
    lease: Mutex<()>,
}

impl PossessionProtocol {
    pub(crate) fn new(return_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            request: Signal::new(),
            granted: Signal::new(),
            returned: Signal::new(),
            state: AtomicU8::new(PossessionState::OwnedByRenderThread as u8),
            return_timeout,
            poll_interval: poll_interval.min(return_timeout),
            lease: Mutex::new(()),
        }
    }

    pub(crate) fn state(&self) -> PossessionState {
        PossessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PossessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Render side: consumes a pending request, if any.
    pub(crate) fn take_request(&self) -> bool {
        let _ = self.state.compare_exchange(
            PossessionState::Reacquired as u8,
            PossessionState::OwnedByRenderThread as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.request.check_if_signaled()
    }

    /// Render side: releases the context, grants it and waits for it back.
    ///
    /// Must only follow a successful [`take_request`](Self::take_request).
    pub(crate) fn lend<W: Window + ?Sized>(&self, window: &W, exit: &Signal) -> LendOutcome {
        // A return left over from an abandoned request must not end this loan.
        self.returned.reset();
        window.unload_current_context();
        self.set_state(PossessionState::Released);
        info!("graphics context lent out");
        self.granted.signal();

        let started = Instant::now();
        let mut next_warning = self.return_timeout;
        loop {
            if self.returned.wait_until_signaled_timeout(self.poll_interval) {
                break;
            }
            if exit.is_signaled() {
                warn!("exit requested while the graphics context is lent out");
                return LendOutcome::AbandonedOnExit;
            }
            let waited = started.elapsed();
            if waited >= next_warning {
                warn!(
                    waited_ms = waited.as_millis() as u64,
                    "graphics context has not been returned"
                );
                next_warning += self.return_timeout;
            }
        }

        match window.make_context_current() {
            Ok(()) => {
                self.set_state(PossessionState::Reacquired);
                info!(
                    lent_ms = started.elapsed().as_millis() as u64,
                    "graphics context returned"
                );
                LendOutcome::Returned
            }
            Err(err) => LendOutcome::Failed(err),
        }
    }

    /// Borrower side: asks for the context and waits up to `timeout` for
    /// the grant. Returns whether it was granted.
    fn request(&self, timeout: Duration) -> bool {
        self.granted.reset();
        self.set_state(PossessionState::ReleaseRequested);
        self.request.signal();
        if self.granted.wait_until_signaled_timeout(timeout) {
            return true;
        }
        // Withdraw. If the request is already gone the render thread took
        // it and the grant is on its way.
        if self.request.check_if_signaled() {
            self.set_state(PossessionState::OwnedByRenderThread);
            return false;
        }
        if self.granted.wait_until_signaled_timeout(self.return_timeout) {
            return true;
        }
        // The grant never came; hand back whatever may still be lent.
        warn!("possession request taken but never granted");
        self.give_back();
        false
    }

    /// Borrower side: hands the context back.
    fn give_back(&self) {
        self.set_state(PossessionState::ReacquireRequested);
        self.returned.signal();
    }
}

/// Cloneable capability to borrow the context from the render thread.
///
/// Obtained from [`RenderingPipeline::possession_handle`]. Borrowers are
/// served one at a time.
///
/// [`RenderingPipeline::possession_handle`]: crate::RenderingPipeline::possession_handle
pub struct PossessionHandle<W: Window> {
    shared: Arc<PipelineShared>,
    window: Arc<W>,
}

impl<W: Window> PossessionHandle<W> {
    pub(crate) fn new(shared: Arc<PipelineShared>, window: Arc<W>) -> Self {
        Self { shared, window }
    }

    /// Borrows the context, making it current on the calling thread until
    /// the returned guard is dropped.
    ///
    /// `timeout` bounds the whole call: the wait for another borrower to
    /// finish and the wait for the render thread to reach a safe point share
    /// it.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RenderThreadGone`] if the render thread has stopped
    /// - [`PipelineError::PossessionTimeout`] if the grant did not arrive
    /// - [`PipelineError::Backend`] if the context could not be made current
    ///   here (it is handed straight back)
    pub fn acquire(&self, timeout: Duration) -> PipelineResult<ContextGuard<'_, W>> {
        let protocol = &self.shared.possession;
        let deadline = Instant::now() + timeout;
        let timed_out = || PipelineError::PossessionTimeout {
            waited_ms: timeout.as_millis() as u64,
        };
        let lease = protocol.lease.try_lock_until(deadline).ok_or_else(timed_out)?;
        if self.shared.driver_state() == RenderThreadState::Terminating {
            return Err(PipelineError::RenderThreadGone {
                reason: self
                    .shared
                    .failure()
                    .unwrap_or_else(|| "render thread has terminated".to_owned()),
            });
        }

        if !protocol.request(deadline.saturating_duration_since(Instant::now())) {
            return Err(timed_out());
        }
        if let Err(err) = self.window.make_context_current() {
            protocol.give_back();
            return Err(err.into());
        }
        debug!("graphics context acquired by borrower");
        Ok(ContextGuard {
            handle: self,
            _lease: lease,
        })
    }

    /// Runs `f` with the context current on the calling thread.
    ///
    /// # Errors
    ///
    /// As [`acquire`](Self::acquire).
    pub fn with_context<R>(&self, timeout: Duration, f: impl FnOnce(&W) -> R) -> PipelineResult<R> {
        let guard = self.acquire(timeout)?;
        Ok(f(guard.window()))
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> PossessionState {
        self.shared.possession.state()
    }
}

impl<W: Window> Clone for PossessionHandle<W> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            window: Arc::clone(&self.window),
        }
    }
}

impl<W: Window> std::fmt::Debug for PossessionHandle<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PossessionHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Proof that the calling thread holds the context.
///
/// Dropping it unloads the context here and returns it to the render
/// thread.
#[must_use = "the context is returned as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard<'h, W: Window> {
    handle: &'h PossessionHandle<W>,
    _lease: MutexGuard<'h, ()>,
}

impl<W: Window> ContextGuard<'_, W> {
    /// The window whose context is current.
    #[must_use]
    pub fn window(&self) -> &W {
        &self.handle.window
    }
}

impl<W: Window> Drop for ContextGuard<'_, W> {
    fn drop(&mut self) {
        self.handle.window.unload_current_context();
        self.handle.shared.possession.give_back();
        debug!("graphics context released by borrower");
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::backend::recording::{CallLog, RecordingWindow};

    fn protocol() -> Arc<PossessionProtocol> {
        Arc::new(PossessionProtocol::new(
            Duration::from_millis(50),
            Duration::from_millis(5),
        ))
    }

    #[test]
    fn test_no_request_means_no_lend() {
        let protocol = protocol();
        assert!(!protocol.take_request());
        assert_eq!(protocol.state(), PossessionState::OwnedByRenderThread);
    }

    #[test]
    fn test_full_handoff_cycle() {
        let protocol = protocol();
        let window = Arc::new(RecordingWindow::new(CallLog::new()));
        let exit = Arc::new(Signal::new());

        // The render thread owns the context.
        window.unload_current_context();
        let render = {
            let (protocol, window, exit) =
                (Arc::clone(&protocol), Arc::clone(&window), Arc::clone(&exit));
            thread::spawn(move || {
                window.make_context_current().unwrap();
                while !protocol.take_request() {
                    thread::sleep(Duration::from_millis(1));
                }
                let outcome = protocol.lend(&*window, &exit);
                let owner = window.owner();
                window.unload_current_context();
                (outcome, owner == Some(thread::current().id()))
            })
        };

        assert!(protocol.request(Duration::from_secs(5)));
        assert_eq!(protocol.state(), PossessionState::Released);
        window.make_context_current().unwrap();
        window.unload_current_context();
        protocol.give_back();

        let (outcome, rebound) = render.join().unwrap();
        assert!(matches!(outcome, LendOutcome::Returned));
        assert!(rebound);
        assert_eq!(protocol.state(), PossessionState::Reacquired);
        assert!(!protocol.take_request());
        assert_eq!(protocol.state(), PossessionState::OwnedByRenderThread);
    }

    #[test]
    fn test_unanswered_request_is_withdrawn() {
        let protocol = protocol();
        assert!(!protocol.request(Duration::from_millis(10)));
        assert_eq!(protocol.state(), PossessionState::OwnedByRenderThread);
        // Nothing left behind for the render thread to act on.
        assert!(!protocol.take_request());
    }

    #[test]
    fn test_exit_abandons_loan() {
        let protocol = protocol();
        let window = RecordingWindow::new(CallLog::new());
        let exit = Signal::new();
        exit.signal();
        let outcome = protocol.lend(&window, &exit);
        assert!(matches!(outcome, LendOutcome::AbandonedOnExit));
        assert_eq!(window.owner(), None);
    }

    #[test]
    fn test_acquire_spends_timeout_once() {
        let shared = Arc::new(PipelineShared::new(
            Duration::from_millis(50),
            Duration::from_millis(5),
        ));
        let window = Arc::new(RecordingWindow::new(CallLog::new()));
        let handle = PossessionHandle::new(Arc::clone(&shared), window);
        let locked = Arc::new(Signal::new());

        // Another borrower holds the lease for most of the timeout.
        let holder = {
            let (shared, locked) = (Arc::clone(&shared), Arc::clone(&locked));
            thread::spawn(move || {
                let _lease = shared.possession.lease.lock();
                locked.signal();
                thread::sleep(Duration::from_millis(150));
            })
        };
        locked.wait_until_signaled();

        let started = Instant::now();
        let err = handle.acquire(Duration::from_millis(200)).unwrap_err();
        let waited = started.elapsed();
        holder.join().unwrap();

        assert!(matches!(err, PipelineError::PossessionTimeout { waited_ms: 200 }));
        assert!(waited >= Duration::from_millis(200));
        assert!(waited < Duration::from_millis(340), "waited {waited:?}");
        assert_eq!(handle.state(), PossessionState::OwnedByRenderThread);
    }

    #[test]
    fn test_taken_but_unanswered_request_gives_up() {
        let protocol = protocol();
        let taker = {
            let protocol = Arc::clone(&protocol);
            thread::spawn(move || {
                while !protocol.take_request() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };

        let started = Instant::now();
        assert!(!protocol.request(Duration::from_millis(20)));
        assert!(started.elapsed() < Duration::from_secs(1));
        taker.join().unwrap();
        assert_eq!(protocol.state(), PossessionState::ReacquireRequested);

        // The leftover return does not end the next loan early.
        let window = RecordingWindow::new(CallLog::new());
        let exit = Signal::new();
        exit.signal();
        assert!(matches!(
            protocol.lend(&window, &exit),
            LendOutcome::AbandonedOnExit
        ));
    }
}
