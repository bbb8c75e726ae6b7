//! # Signal
//!
//! A binary, reusable latch built on a single-slot channel.
//!
//! Signaling an already-signaled latch is a no-op (binary semaphore, not a
//! counter). Every successful wait consumes the signal, so the same latch
//! can drive one handshake per frame for the lifetime of its owner.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Binary synchronization latch.
///
/// Both ends of the channel live inside the signal, so it never
/// disconnects; share it across threads behind an `Arc`.
///
/// ## Usage
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tau_core::Signal;
///
/// let ready = Arc::new(Signal::new());
/// let remote = Arc::clone(&ready);
/// let worker = std::thread::spawn(move || remote.signal());
///
/// assert!(ready.wait_until_signaled_timeout(Duration::from_secs(5)));
/// worker.join().unwrap();
/// ```
#[derive(Debug)]
pub struct Signal {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl Signal {
    /// Creates an unsignaled latch.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self { sender, receiver }
    }

    /// Sets the latch, waking one waiter.
    #[inline]
    pub fn signal(&self) {
        // Full means the latch is already set.
        let _ = self.sender.try_send(());
    }

    /// Blocks until the latch is set, then consumes it.
    pub fn wait_until_signaled(&self) {
        // Cannot disconnect: this struct owns the sender.
        let _ = self.receiver.recv();
    }

    /// Blocks for at most `timeout`.
    ///
    /// Returns `true` (and consumes the signal) if the latch fired.
    #[must_use]
    pub fn wait_until_signaled_timeout(&self, timeout: Duration) -> bool {
        self.receiver.recv_timeout(timeout).is_ok()
    }

    /// Non-blocking poll. Consumes the signal if it was set.
    #[inline]
    #[must_use]
    pub fn check_if_signaled(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    /// Non-blocking peek. Leaves the latch untouched.
    ///
    /// Used for sticky conditions such as exit, which every loop iteration
    /// must keep observing.
    #[inline]
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Clears the latch without waiting.
    #[inline]
    pub fn reset(&self) {
        let _ = self.receiver.try_recv();
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_signal_starts_clear() {
        let signal = Signal::new();
        assert!(!signal.is_signaled());
        assert!(!signal.check_if_signaled());
    }

    #[test]
    fn test_check_consumes() {
        let signal = Signal::new();
        signal.signal();

        assert!(signal.is_signaled());
        assert!(signal.check_if_signaled());
        assert!(!signal.check_if_signaled());
    }

    #[test]
    fn test_signal_is_binary() {
        let signal = Signal::new();
        signal.signal();
        signal.signal();
        signal.signal();

        assert!(signal.check_if_signaled());
        // Three signals collapse into one.
        assert!(!signal.check_if_signaled());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let signal = Signal::new();
        signal.signal();

        assert!(signal.is_signaled());
        assert!(signal.is_signaled());
        assert!(signal.check_if_signaled());
    }

    #[test]
    fn test_wait_timeout_expires() {
        let signal = Signal::new();
        let start = Instant::now();

        assert!(!signal.wait_until_signaled_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_reset() {
        let signal = Signal::new();
        signal.signal();
        signal.reset();
        assert!(!signal.is_signaled());
    }

    #[test]
    fn test_cross_thread_wake() {
        let signal = Arc::new(Signal::new());
        let remote = Arc::clone(&signal);

        let waiter = thread::spawn(move || {
            remote.wait_until_signaled();
            true
        });

        thread::sleep(Duration::from_millis(10));
        signal.signal();

        assert!(waiter.join().unwrap());
        assert!(!signal.is_signaled());
    }

    #[test]
    fn test_ping_pong_reuse() {
        let ping = Arc::new(Signal::new());
        let pong = Arc::new(Signal::new());
        let (remote_ping, remote_pong) = (Arc::clone(&ping), Arc::clone(&pong));

        let partner = thread::spawn(move || {
            for _ in 0..100 {
                remote_ping.wait_until_signaled();
                remote_pong.signal();
            }
        });

        for _ in 0..100 {
            ping.signal();
            assert!(pong.wait_until_signaled_timeout(Duration::from_secs(5)));
        }

        partner.join().unwrap();
    }
}
