//! # Synchronization Primitives for the Render Thread Handoff
//!
//! RULE: The producer and the render thread never touch the same bytes at
//! the same time. There is no buffer lock; ordering comes from handshakes.
//!
//! ## The Problem
//!
//! ```text
//! Thread 1 (Producer):  RECORD instructions
//! Thread 2 (Render):    REPLAY instructions, owns the graphics context
//!
//! Without a handshake: READ-BEFORE-READY -> CORRUPT FRAME
//! With a shared lock:  CONTENTION on every push
//! ```
//!
//! ## The Solution: Signals and Rendezvous
//!
//! ```text
//! Producer                         Render
//!   record into buffer A
//!   submit(A)  ───insert-ready───▶  take(A), swap, replay, present
//!   take(B)    ◀──render-ready────  post(B)
//!   record into buffer B
//! ```
//!
//! A [`Signal`] is a binary latch (the handshake carries no data). A
//! [`Rendezvous`] pair carries the buffer itself, so ownership moves with
//! the handshake and the type system forbids concurrent access.

mod rendezvous;
mod signal;

pub use rendezvous::{rendezvous, Rendezvous, RendezvousError, Submitter};
pub use signal::Signal;
