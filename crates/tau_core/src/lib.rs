//! # TAU Core
//!
//! Threading and memory primitives shared by the deferred renderer:
//! - Binary [`Signal`]s for cross-thread handshakes
//! - Single-slot [`Rendezvous`] endpoints that move ownership between threads
//! - A fixed-capacity [`ByteArena`] for instruction streams
//!
//! ## Architecture Rules
//!
//! 1. **No allocations after construction** - arenas are sized once
//! 2. **Ownership, not aliasing** - buffers cross threads by move
//! 3. **Bounded waits** - every blocking call has a timeout variant
//!
//! ## Example
//!
//! ```rust
//! use tau_core::{ByteArena, Signal};
//!
//! let ready = Signal::new();
//! let mut arena = ByteArena::new(64);
//! arena.write_pod(&7u32).unwrap();
//! ready.signal();
//! assert!(ready.check_if_signaled());
//! assert_eq!(arena.used(), 4);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;

pub use memory::{ArenaFull, ByteArena, ByteReader};
pub use sync::{rendezvous, Rendezvous, RendezvousError, Signal, Submitter};
