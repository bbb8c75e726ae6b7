//! # Memory Management
//!
//! Fixed-capacity byte storage for instruction streams.
//!
//! ## Design Philosophy
//!
//! All memory is allocated once when a pipeline is built. During a frame:
//! - No heap allocations
//! - No partial writes (space is checked before a record is written)
//! - Consumed bytes are zeroed so stale data can never be replayed

mod arena;
mod reader;

pub use arena::{ArenaFull, ByteArena};
pub use reader::ByteReader;
