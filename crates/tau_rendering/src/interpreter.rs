//! # Instruction Interpreter
//!
//! Replays one finished buffer against a [`RenderBackend`], strictly in
//! encoded order, on the thread that holds the context.
//!
//! ## Failure policy
//!
//! - A backend call that fails is logged and counted; replay moves on to
//!   the next record.
//! - A decode error stops the pass at the offending record. Nothing after
//!   it is executed, the whole buffer is zeroed and the error is returned.
//!
//! Either way the buffer comes back zero-filled, so replaying it a second
//! time executes nothing.

use tracing::{error, trace, warn};

use crate::backend::{RenderBackend, ResourceRegistry};
use crate::command::{Instruction, InstructionBuffer};
use crate::error::{BackendError, BackendResult, DecodeError};

/// Outcome of one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Records executed, terminator excluded.
    pub instructions: usize,
    /// Draw records executed.
    pub draw_calls: usize,
    /// Bytes read, terminator included.
    pub bytes_consumed: usize,
    /// Backend calls that reported failure.
    pub backend_failures: usize,
}

/// Stateless decoder-dispatcher with running totals.
#[derive(Debug, Default)]
pub struct Interpreter {
    passes: u64,
}

impl Interpreter {
    /// Creates an interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes run, failed ones included.
    #[must_use]
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    /// Replays `buffer` and zeroes it.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`]; records before it have already
    /// executed.
    pub fn execute<B: RenderBackend + ?Sized>(
        &mut self,
        buffer: &mut InstructionBuffer,
        backend: &mut B,
        registry: &ResourceRegistry,
    ) -> Result<FrameReport, DecodeError> {
        self.passes += 1;
        let mut report = FrameReport::default();

        let outcome = {
            let mut decoder = buffer.decoder();
            let mut outcome = Ok(());
            for item in decoder.by_ref() {
                match item {
                    Ok((_, Instruction::FinishRender)) => break,
                    Ok((offset, instruction)) => {
                        report.instructions += 1;
                        if matches!(
                            instruction,
                            Instruction::DrawArrays { .. } | Instruction::DrawElements { .. }
                        ) {
                            report.draw_calls += 1;
                        }
                        if let Err(err) = dispatch(&instruction, backend, registry) {
                            report.backend_failures += 1;
                            warn!(
                                offset,
                                opcode = ?instruction.opcode(),
                                error = %err,
                                "graphics call failed"
                            );
                        }
                    }
                    Err(err) => {
                        outcome = Err(err);
                        break;
                    }
                }
            }
            report.bytes_consumed = decoder.consumed();
            outcome
        };

        match outcome {
            Ok(()) => {
                buffer.clear_consumed(report.bytes_consumed);
                trace!(
                    instructions = report.instructions,
                    bytes = report.bytes_consumed,
                    "replayed instruction buffer"
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    error = %err,
                    executed = report.instructions,
                    "instruction stream desynchronized, discarding rest of buffer"
                );
                buffer.clear();
                Err(err)
            }
        }
    }
}

fn dispatch<B: RenderBackend + ?Sized>(
    instruction: &Instruction<'_>,
    backend: &mut B,
    registry: &ResourceRegistry,
) -> BackendResult {
    match *instruction {
        Instruction::FinishRender => Ok(()),
        Instruction::LoadShaderUniform { location, ref value } => {
            backend.load_uniform(location, value)
        }
        Instruction::ActivateShaderProgram { program } => backend.use_program(program),
        Instruction::ActivateTextureUnit { unit } => backend.active_texture_unit(unit),
        Instruction::BindTexture { texture, unit } => registry
            .texture(texture)
            .ok_or_else(|| unresolved("bind_texture", texture.raw()))?
            .bind(unit),
        Instruction::UnbindTexture { texture, unit } => registry
            .texture(texture)
            .ok_or_else(|| unresolved("unbind_texture", texture.raw()))?
            .unbind(unit),
        Instruction::BindBufferDescriptor { descriptor } => registry
            .descriptor(descriptor)
            .ok_or_else(|| unresolved("bind_buffer_descriptor", descriptor.raw()))?
            .bind(),
        Instruction::UnbindBufferDescriptor { descriptor } => registry
            .descriptor(descriptor)
            .ok_or_else(|| unresolved("unbind_buffer_descriptor", descriptor.raw()))?
            .unbind(),
        Instruction::BindBuffer { target, buffer } => backend.bind_buffer(target, buffer),
        Instruction::EnableVertexAttribute { index } => backend.enable_vertex_attribute(index),
        Instruction::DisableVertexAttribute { index } => backend.disable_vertex_attribute(index),
        Instruction::DrawArrays { mode, first, count } => backend.draw_arrays(mode, first, count),
        Instruction::DrawElements {
            mode,
            count,
            index_type,
            offset,
        } => backend.draw_elements(mode, count, index_type, offset),
        Instruction::ClearBuffers { mask } => backend.clear(mask),
        Instruction::LoadBufferData {
            target,
            data,
            usage,
        } => backend.buffer_data(target, data, usage),
        Instruction::ModifyBufferData {
            target,
            offset,
            data,
        } => backend.buffer_sub_data(target, offset, data),
        Instruction::Enable { capability } => backend.enable(capability),
        Instruction::Disable { capability } => backend.disable(capability),
        Instruction::FaceWinding { mode } => backend.front_face(mode),
        Instruction::ResizeViewport {
            x,
            y,
            width,
            height,
        } => backend.viewport(x, y, width, height),
        Instruction::RenderText(ref text) => registry
            .text_renderer(text.renderer)
            .ok_or_else(|| unresolved("render_text", text.renderer.raw()))?
            .render_text(text),
    }
}

fn unresolved(call: &'static str, handle: u32) -> BackendError {
    BackendError::new(call, format!("no resource registered under handle {handle}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::gl;
    use crate::backend::recording::{
        CallLog, RecordedCall, RecordingBackend, RecordingTextRenderer, RecordingTexture,
    };
    use crate::command::{Opcode, TextCommand};

    fn encode(buffer: &mut InstructionBuffer, instructions: &[Instruction<'_>]) {
        let mut encoder = buffer.encoder();
        for instruction in instructions {
            encoder.encode(instruction).unwrap();
        }
        encoder.finish().unwrap();
    }

    #[test]
    fn test_program_then_draw() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let registry = ResourceRegistry::new();
        let mut buffer = InstructionBuffer::new(128);
        encode(
            &mut buffer,
            &[
                Instruction::ActivateShaderProgram { program: 7 },
                Instruction::DrawArrays {
                    mode: gl::TRIANGLES,
                    first: 0,
                    count: 3,
                },
            ],
        );

        let report = Interpreter::new()
            .execute(&mut buffer, &mut backend, &registry)
            .unwrap();

        assert_eq!(
            log.snapshot(),
            vec![
                RecordedCall::UseProgram(7),
                RecordedCall::DrawArrays {
                    mode: gl::TRIANGLES,
                    first: 0,
                    count: 3
                },
            ]
        );
        assert_eq!(report.instructions, 2);
        assert_eq!(report.draw_calls, 1);
        assert_eq!(report.bytes_consumed, 5 + 13 + 1);
        assert!(buffer.is_zeroed());
    }

    #[test]
    fn test_load_buffer_data_reads_exact_bytes() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let registry = ResourceRegistry::new();
        let mut buffer = InstructionBuffer::new(128);
        // Payload bytes that look like opcodes must not confuse the decoder.
        let data = [0x00, 0x0B, 0xFF, 0x14, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        encode(
            &mut buffer,
            &[
                Instruction::LoadBufferData {
                    target: gl::ARRAY_BUFFER,
                    data: &data,
                    usage: gl::STATIC_DRAW,
                },
                Instruction::ClearBuffers { mask: 1 },
            ],
        );

        Interpreter::new()
            .execute(&mut buffer, &mut backend, &registry)
            .unwrap();

        assert_eq!(
            log.snapshot(),
            vec![
                RecordedCall::BufferData {
                    target: gl::ARRAY_BUFFER,
                    data: data.to_vec(),
                    usage: gl::STATIC_DRAW
                },
                RecordedCall::Clear(1),
            ]
        );
    }

    #[test]
    fn test_zeroed_buffer_executes_nothing() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let mut buffer = InstructionBuffer::new(64);
        let report = Interpreter::new()
            .execute(&mut buffer, &mut backend, &ResourceRegistry::new())
            .unwrap();
        assert_eq!(report.instructions, 0);
        assert_eq!(report.bytes_consumed, 1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_replaying_twice_is_noop() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let registry = ResourceRegistry::new();
        let mut interpreter = Interpreter::new();
        let mut buffer = InstructionBuffer::new(64);
        encode(&mut buffer, &[Instruction::Enable { capability: gl::DEPTH_TEST }]);

        interpreter.execute(&mut buffer, &mut backend, &registry).unwrap();
        interpreter.execute(&mut buffer, &mut backend, &registry).unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(interpreter.passes(), 2);
    }

    #[test]
    fn test_backend_failure_does_not_stop_frame() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone()).failing_on("draw_arrays");
        let mut buffer = InstructionBuffer::new(128);
        encode(
            &mut buffer,
            &[
                Instruction::DrawArrays {
                    mode: gl::TRIANGLES,
                    first: 0,
                    count: 3,
                },
                Instruction::FaceWinding { mode: gl::CCW },
            ],
        );

        let report = Interpreter::new()
            .execute(&mut buffer, &mut backend, &ResourceRegistry::new())
            .unwrap();

        assert_eq!(report.backend_failures, 1);
        assert_eq!(log.snapshot(), vec![RecordedCall::FrontFace(gl::CCW)]);
    }

    #[test]
    fn test_unknown_opcode_stops_and_zeroes() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let mut buffer = InstructionBuffer::new(64);
        {
            let mut encoder = buffer.encoder();
            encoder.encode(&Instruction::ClearBuffers { mask: 1 }).unwrap();
        }
        // Corrupt the byte after the first record.
        let mut bytes = buffer.bytes().to_vec();
        bytes[5] = 0x7F;
        let mut corrupt = InstructionBuffer::new(64);
        corrupt.arena.write_bytes(&bytes[..6]).unwrap();
        corrupt
            .arena
            .write_pod(&[Opcode::Enable as u8, 1, 0, 0, 0])
            .unwrap();

        let err = Interpreter::new()
            .execute(&mut corrupt, &mut backend, &ResourceRegistry::new())
            .unwrap_err();

        assert_eq!(
            err,
            DecodeError::UnknownOpcode {
                opcode: 0x7F,
                offset: 5
            }
        );
        assert_eq!(log.snapshot(), vec![RecordedCall::Clear(1)]);
        assert!(corrupt.is_zeroed());
    }

    #[test]
    fn test_resources_resolve_through_registry() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let registry = ResourceRegistry::new();
        let texture = registry.register_texture(Arc::new(RecordingTexture::new(40, log.clone())));
        let font = registry.register_text_renderer(Arc::new(RecordingTextRenderer::new(
            41,
            log.clone(),
        )));
        let mut buffer = InstructionBuffer::new(512);
        encode(
            &mut buffer,
            &[
                Instruction::BindTexture { texture, unit: 2 },
                Instruction::RenderText(TextCommand {
                    renderer: font,
                    x: 4.0,
                    y: 8.0,
                    scale: 1.0,
                    color: [1.0; 3],
                    transform: [0.0; 16],
                    text: "hp 100",
                }),
                Instruction::UnbindTexture { texture, unit: 2 },
            ],
        );

        Interpreter::new()
            .execute(&mut buffer, &mut backend, &registry)
            .unwrap();

        assert_eq!(
            log.snapshot(),
            vec![
                RecordedCall::BindTexture { id: 40, unit: 2 },
                RecordedCall::RenderText {
                    renderer: 41,
                    text: "hp 100".to_owned(),
                    x: 4.0,
                    y: 8.0,
                    scale: 1.0
                },
                RecordedCall::UnbindTexture { id: 40, unit: 2 },
            ]
        );
    }

    #[test]
    fn test_unregistered_handle_is_backend_failure() {
        let log = CallLog::new();
        let mut backend = RecordingBackend::new(log.clone());
        let mut buffer = InstructionBuffer::new(64);
        encode(
            &mut buffer,
            &[
                Instruction::BindBufferDescriptor {
                    descriptor: crate::backend::ResourceHandle::from_raw(99),
                },
                Instruction::DrawArrays {
                    mode: gl::TRIANGLES,
                    first: 0,
                    count: 6,
                },
            ],
        );

        let report = Interpreter::new()
            .execute(&mut buffer, &mut backend, &ResourceRegistry::new())
            .unwrap();

        assert_eq!(report.backend_failures, 1);
        assert_eq!(log.count(RecordedCall::is_draw), 1);
    }
}
