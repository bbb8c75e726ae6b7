//! # Pipeline Error Types
//!
//! All errors that can occur while recording, replaying or handing off
//! the graphics context.
//!
//! Encode and decode errors are protocol-integrity failures: they mean the
//! producer and the interpreter disagree about the byte layout, and the
//! current buffer cannot be trusted past the failing record. Backend errors
//! are per-call rendering glitches and never stop a frame.

use thiserror::Error;

use crate::command::Opcode;

/// Errors raised while encoding an instruction into the insert buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The record does not fit; nothing was written.
    #[error("instruction buffer overflow encoding {opcode:?}: need {required} bytes, {remaining} remaining")]
    BufferOverflow {
        /// The instruction being encoded.
        opcode: Opcode,
        /// Encoded size of the record.
        required: usize,
        /// Space left before the reserved terminator byte.
        remaining: usize,
    },

    /// A variable-length payload exceeds its length prefix.
    #[error("{opcode:?} payload of {len} bytes does not fit its length prefix")]
    PayloadTooLarge {
        /// The instruction being encoded.
        opcode: Opcode,
        /// Payload length in bytes.
        len: usize,
    },

    /// The stream already holds its terminator.
    #[error("instruction stream already finished")]
    AlreadyFinished,
}

/// Errors raised while decoding the instruction buffer.
///
/// Every variant carries the byte offset of the offending record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The opcode byte names no known instruction.
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode {
        /// The raw byte read.
        opcode: u8,
        /// Offset of the opcode byte.
        offset: usize,
    },

    /// A uniform record carries an unknown type tag.
    #[error("unknown uniform type {tag} at offset {offset}")]
    UnknownUniformType {
        /// The raw tag read.
        tag: u8,
        /// Offset of the uniform record.
        offset: usize,
    },

    /// The payload runs past the end of the buffer.
    #[error("truncated {opcode:?} record at offset {offset}")]
    Truncated {
        /// The instruction being decoded.
        opcode: Opcode,
        /// Offset of the record.
        offset: usize,
    },

    /// A text payload is not valid UTF-8.
    #[error("invalid text payload at offset {offset}")]
    InvalidText {
        /// Offset of the record.
        offset: usize,
    },

    /// The buffer ended without a terminator.
    #[error("instruction stream has no terminator (ran out at offset {offset})")]
    MissingTerminator {
        /// Offset where the buffer ran out.
        offset: usize,
    },
}

/// A failure reported by a graphics collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{call} failed: {message}")]
pub struct BackendError {
    /// The graphics call that failed.
    pub call: &'static str,
    /// Backend-specific description.
    pub message: String,
}

impl BackendError {
    /// Creates a backend error for `call`.
    #[must_use]
    pub fn new(call: &'static str, message: impl Into<String>) -> Self {
        Self {
            call,
            message: message.into(),
        }
    }
}

/// Result of a single graphics call.
pub type BackendResult = Result<(), BackendError>;

/// Errors loading or validating a [`PipelineConfig`](crate::PipelineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`RenderingPipeline`](crate::RenderingPipeline).
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Recording failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Replay failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A window or backend call needed by the pipeline itself failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The render thread could not be spawned.
    #[error("failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The render thread has terminated.
    #[error("render thread is gone: {reason}")]
    RenderThreadGone {
        /// Why the thread stopped.
        reason: String,
    },

    /// The render thread did not grant the context in time.
    #[error("graphics context not granted within {waited_ms} ms")]
    PossessionTimeout {
        /// How long the caller waited.
        waited_ms: u64,
    },
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
