//! # Rendezvous
//!
//! A single-item, back-pressured handoff between exactly two threads.
//!
//! Where a [`Signal`](super::Signal) only says "ready", a rendezvous moves
//! the value the readiness is about. The frame handshake uses two of them:
//! one carries a recorded buffer to the render thread (insert-ready), the
//! other carries a drained buffer back (render-ready).
//!
//! Unlike a signal the two ends are split, so a peer thread exiting is
//! observable as [`RendezvousError::Disconnected`] instead of a hang.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use thiserror::Error;

/// Errors reported by rendezvous endpoints.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousError {
    /// The slot already holds a value the peer has not taken.
    #[error("rendezvous slot is occupied")]
    Occupied,

    /// No value arrived within the timeout.
    #[error("rendezvous timed out")]
    Timeout,

    /// The opposite endpoint was dropped.
    #[error("rendezvous peer disconnected")]
    Disconnected,
}

/// Creates a connected pair of endpoints with a single slot.
#[must_use]
pub fn rendezvous<T>() -> (Submitter<T>, Rendezvous<T>) {
    let (sender, receiver) = bounded(1);
    (Submitter { sender }, Rendezvous { receiver })
}

/// Sending half of a rendezvous.
#[derive(Debug)]
pub struct Submitter<T> {
    sender: Sender<T>,
}

impl<T> Submitter<T> {
    /// Places `value` in the slot, blocking while the slot is occupied.
    ///
    /// # Errors
    ///
    /// Returns [`RendezvousError::Disconnected`] if the receiving end is gone.
    pub fn submit(&self, value: T) -> Result<(), RendezvousError> {
        self.sender
            .send(value)
            .map_err(|_| RendezvousError::Disconnected)
    }

    /// Places `value` in the slot without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`RendezvousError::Occupied`] if the peer has not taken the
    /// previous value, or [`RendezvousError::Disconnected`] if it is gone.
    pub fn try_submit(&self, value: T) -> Result<(), RendezvousError> {
        self.sender.try_send(value).map_err(|err| match err {
            TrySendError::Full(_) => RendezvousError::Occupied,
            TrySendError::Disconnected(_) => RendezvousError::Disconnected,
        })
    }
}

/// Receiving half of a rendezvous.
#[derive(Debug)]
pub struct Rendezvous<T> {
    receiver: Receiver<T>,
}

impl<T> Rendezvous<T> {
    /// Blocks until a value arrives.
    ///
    /// # Errors
    ///
    /// Returns [`RendezvousError::Disconnected`] if the sender is gone and
    /// the slot is empty.
    pub fn take(&self) -> Result<T, RendezvousError> {
        self.receiver
            .recv()
            .map_err(|_| RendezvousError::Disconnected)
    }

    /// Blocks for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RendezvousError::Timeout`] or
    /// [`RendezvousError::Disconnected`].
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, RendezvousError> {
        self.receiver.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => RendezvousError::Timeout,
            RecvTimeoutError::Disconnected => RendezvousError::Disconnected,
        })
    }

    /// Takes the value if one is waiting.
    ///
    /// # Errors
    ///
    /// Returns [`RendezvousError::Disconnected`] if the sender is gone and
    /// the slot is empty.
    pub fn try_take(&self) -> Result<Option<T>, RendezvousError> {
        match self.receiver.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RendezvousError::Disconnected),
        }
    }

    /// Returns true if a value is waiting in the slot.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_value_moves_across() {
        let (tx, rx) = rendezvous::<Vec<u8>>();
        tx.submit(vec![1, 2, 3]).unwrap();

        assert!(rx.is_pending());
        assert_eq!(rx.take().unwrap(), vec![1, 2, 3]);
        assert!(!rx.is_pending());
    }

    #[test]
    fn test_single_slot_backpressure() {
        let (tx, rx) = rendezvous::<u32>();
        tx.try_submit(1).unwrap();

        assert_eq!(tx.try_submit(2), Err(RendezvousError::Occupied));
        assert_eq!(rx.try_take(), Ok(Some(1)));
        assert_eq!(rx.try_take(), Ok(None));
        tx.try_submit(3).unwrap();
    }

    #[test]
    fn test_timeout() {
        let (_tx, rx) = rendezvous::<u32>();
        assert_eq!(
            rx.take_timeout(Duration::from_millis(5)),
            Err(RendezvousError::Timeout)
        );
    }

    #[test]
    fn test_disconnect_is_observable() {
        let (tx, rx) = rendezvous::<u32>();
        drop(rx);
        assert_eq!(tx.submit(1), Err(RendezvousError::Disconnected));

        let (tx, rx) = rendezvous::<u32>();
        tx.submit(9).unwrap();
        drop(tx);
        // A value already in the slot is still delivered.
        assert_eq!(rx.take(), Ok(9));
        assert_eq!(rx.take(), Err(RendezvousError::Disconnected));
        assert_eq!(
            rx.take_timeout(Duration::from_millis(1)),
            Err(RendezvousError::Disconnected)
        );
    }

    #[test]
    fn test_submit_blocks_until_taken() {
        let (tx, rx) = rendezvous::<u32>();
        tx.submit(1).unwrap();

        let producer = thread::spawn(move || {
            // Blocks until the consumer drains the first value.
            tx.submit(2).unwrap();
        });

        thread::sleep(Duration::from_millis(10));
        assert_eq!(rx.take().unwrap(), 1);
        assert_eq!(rx.take_timeout(Duration::from_secs(5)).unwrap(), 2);
        producer.join().unwrap();
    }
}
