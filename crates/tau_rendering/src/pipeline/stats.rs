//! Rendering statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::interpreter::FrameReport;

/// Totals since the pipeline started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames replayed and presented.
    pub frames_rendered: u64,
    /// Records executed, terminators excluded.
    pub instructions_executed: u64,
    /// Draw records executed.
    pub draw_calls: u64,
    /// Instruction bytes consumed.
    pub bytes_consumed: u64,
    /// Graphics calls (including presents) that reported failure.
    pub backend_failures: u64,
    /// Times the context was lent out.
    pub possession_grants: u64,
    /// Insert-ready waits that timed out.
    pub idle_waits: u64,
}

impl RenderStats {
    /// Mean records per frame.
    #[must_use]
    pub fn instructions_per_frame(&self) -> f64 {
        if self.frames_rendered == 0 {
            0.0
        } else {
            self.instructions_executed as f64 / self.frames_rendered as f64
        }
    }

    /// Mean bytes per frame.
    #[must_use]
    pub fn bytes_per_frame(&self) -> f64 {
        if self.frames_rendered == 0 {
            0.0
        } else {
            self.bytes_consumed as f64 / self.frames_rendered as f64
        }
    }
}

/// Lock-free counters written by the render thread.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    frames_rendered: AtomicU64,
    instructions_executed: AtomicU64,
    draw_calls: AtomicU64,
    bytes_consumed: AtomicU64,
    backend_failures: AtomicU64,
    possession_grants: AtomicU64,
    idle_waits: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_frame(&self, report: &FrameReport) {
        self.frames_rendered.fetch_add(1, Ordering::Relaxed);
        self.instructions_executed
            .fetch_add(report.instructions as u64, Ordering::Relaxed);
        self.draw_calls
            .fetch_add(report.draw_calls as u64, Ordering::Relaxed);
        self.bytes_consumed
            .fetch_add(report.bytes_consumed as u64, Ordering::Relaxed);
        self.backend_failures
            .fetch_add(report.backend_failures as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_grant(&self) {
        self.possession_grants.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_idle(&self) {
        self.idle_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self) -> RenderStats {
        RenderStats {
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            instructions_executed: self.instructions_executed.load(Ordering::Relaxed),
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            bytes_consumed: self.bytes_consumed.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            possession_grants: self.possession_grants.load(Ordering::Relaxed),
            idle_waits: self.idle_waits.load(Ordering::Relaxed),
        }
    }
}
