//! Replays a present stream through capture and compositing.
//!
//! For every present, in trace order:
//!
//! 1. fire every compositor tick whose time the present has passed,
//!    outputting the most recent capture
//! 2. let the capture sampler decide on the present
//! 3. hand a captured present to the compositor
//!
//! Step 1 loops, so a long gap between presents fires as many ticks as the
//! compositor timer would have in that time.

use capsim_core::{CompositedEntry, Frame, PresentEvent, SimConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::capture::{CaptureSampler, CaptureStats};
use crate::compositor::{Compositor, CompositorStats};

/// Everything a run produced, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub tick_interval_ms:    f64,
    pub capture_interval_ms: f64,
    /// Every present, in trace order, with its final disposition.
    pub frames:   Vec<Frame>,
    /// Present sequence numbers of captured frames, in capture order.
    pub captured: Vec<u64>,
    /// Compositor output, duplicates included.
    pub output:   Vec<CompositedEntry>,
    pub capture_stats:    CaptureStats,
    pub compositor_stats: CompositorStats,
}

impl SimulationResult {
    pub fn duplicate_count(&self) -> usize {
        self.output.iter().filter(|e| e.duplicate).count()
    }

    /// Captures that never reached the output.
    pub fn unused_captures(&self) -> usize {
        self.captured
            .iter()
            .filter(|&&seq| !self.frames[seq as usize].disposition().is_composited())
            .count()
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

pub struct Driver {
    sampler:    CaptureSampler,
    compositor: Compositor,
    frames:     Vec<Frame>,
    captured:   Vec<u64>,
}

impl Driver {
    pub fn new(config: &SimConfig) -> Self {
        Self::with_parts(
            CaptureSampler::new(config.capture_interval_ms()),
            Compositor::with_interval(config.tick_interval_ms()),
        )
    }

    pub fn with_parts(sampler: CaptureSampler, compositor: Compositor) -> Self {
        Self { sampler, compositor, frames: Vec::new(), captured: Vec::new() }
    }

    /// Run to the end of `events`. The first error aborts the run.
    pub fn run<I, E>(mut self, events: I) -> Result<SimulationResult, E>
    where
        I: IntoIterator<Item = Result<PresentEvent, E>>,
    {
        info!(
            "Simulating: composite every {:.3}ms, capture interval {:.3}ms",
            self.compositor.tick_interval_ms(),
            self.sampler.interval_ms()
        );
        for event in events {
            self.step(event?);
        }
        Ok(self.finish())
    }

    /// Process one present.
    pub fn step(&mut self, event: PresentEvent) {
        debug_assert_eq!(
            event.sequence_number as usize,
            self.frames.len(),
            "presents must arrive in sequence"
        );

        while event.present_time_ms > self.compositor.next_tick_time() {
            if !self.tick() {
                break;
            }
        }

        let mut frame = Frame::new(event);
        if self.sampler.try_capture(&mut frame) {
            self.compositor.offer(&frame);
            self.captured.push(frame.sequence_number());
        }
        self.frames.push(frame);
    }

    /// Fire one tick. `false` if the compositor rejected it and its clock
    /// did not move.
    fn tick(&mut self) -> bool {
        let pending = self
            .compositor
            .pending()
            .and_then(|seq| self.frames.get_mut(seq as usize));
        // The compositor logs and counts the rejection; the run goes on.
        self.compositor.emit(pending).is_ok()
    }

    pub fn finish(self) -> SimulationResult {
        let capture_stats = self.sampler.stats();
        let tick_interval_ms = self.compositor.tick_interval_ms();
        let output = self.compositor.finish();
        debug!(
            "Done: {} presents, {} captured, {} output ({} dup, {} empty ticks)",
            self.frames.len(),
            self.captured.len(),
            output.entries.len(),
            output.stats.duplicates,
            output.stats.empty_ticks
        );
        SimulationResult {
            tick_interval_ms,
            capture_interval_ms: self.sampler.interval_ms(),
            frames: self.frames,
            captured: self.captured,
            output: output.entries,
            capture_stats,
            compositor_stats: output.stats,
        }
    }
}

/// Convenience for in-memory present times (tests, synthetic traces).
pub fn simulate_times(config: &SimConfig, present_times_ms: &[f64]) -> SimulationResult {
    let events = present_times_ms
        .iter()
        .enumerate()
        .map(|(i, &t)| Ok::<_, std::convert::Infallible>(PresentEvent::new(i as u64, t)));
    match Driver::new(config).run(events) {
        Ok(result) => result,
        Err(never) => match never {},
    }
}
