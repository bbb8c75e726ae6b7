//! # TAU Rendering Pipeline
//!
//! Deferred command-buffer renderer:
//! - A producer thread records graphics calls into a compact byte stream
//! - A dedicated render thread owns the graphics context and replays them
//! - Any third thread may borrow the context between frames
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DEFERRED PIPELINE                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  push_*() → Encoder → Insert Buffer ──insert-ready──┐       │
//! │                                                     ↓       │
//! │  Registry ← handles ← Interpreter ← Front Buffer ← Swap     │
//! │                           ↓                                 │
//! │                     RenderBackend → present                 │
//! │                           ↓                                 │
//! │  next push_*() ◀──────render-ready (retired buffer)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Only the thread holding the context issues graphics calls
//! - A buffer belongs to exactly one thread at a time; it moves with the
//!   handshake, nothing locks it
//! - Every record the encoder writes, the interpreter reads to the byte
//! - Unknown opcodes stop the frame; they are never skipped

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod pipeline;

pub use backend::{
    BufferDescriptor, GlEnum, RenderBackend, ResourceHandle, ResourceRegistry, TextRenderer,
    Texture, Window,
};
pub use command::{
    Instruction, InstructionBuffer, InstructionDecoder, InstructionEncoder, Opcode, TextCommand,
    UniformType, UniformValue,
};
pub use config::PipelineConfig;
pub use error::{
    BackendError, BackendResult, ConfigError, DecodeError, EncodeError, PipelineError,
    PipelineResult,
};
pub use interpreter::{FrameReport, Interpreter};
pub use pipeline::{
    ContextGuard, PossessionHandle, PossessionState, RenderStats, RenderThreadState,
    RenderingPipeline,
};
