//! Fixed-rate compositor.
//!
//! The compositor runs on its own clock, independent of capture. Every tick
//! it outputs whatever was captured most recently:
//!
//! ```text
//! time (ms):  0    5    10   15   20   25   30   35   40
//! capture:      C0             C1 C2                C3
//! tick:                   T0        T1        T2        T3
//! output:                 C0        C2        C2 DUP    C3
//!                                   (C1 never output)
//! ```
//!
//! - A tick that finds the same frame as the previous tick re-emits it and
//!   flags the output as a duplicate.
//! - A newer capture replaces an older one that no tick has consumed yet; the
//!   older one is never output.
//! - Ticks before the first capture still advance the clock and the output
//!   sequence number, but produce no entry.

use capsim_core::{CompositeError, CompositedEntry, Frame};
use serde::Serialize;
use tracing::{trace, warn};

// ── Stats / output ────────────────────────────────────────────────────────────

/// Counters kept by [`Compositor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompositorStats {
    /// Every tick fired, including empty ones.
    pub ticks:          u64,
    /// Ticks that fired before anything had been captured.
    pub empty_ticks:    u64,
    /// Output entries that repeat the previous tick's frame.
    pub duplicates:     u64,
    /// Captures replaced by a newer capture before any tick output them.
    pub superseded:     u64,
    /// Ticks skipped because the pending frame was not in a capturable state.
    pub rejected:       u64,
}

/// Everything the compositor produced over a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositorOutput {
    pub entries: Vec<CompositedEntry>,
    pub stats:   CompositorStats,
}

// ── Compositor ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Compositor {
    tick_interval_ms:  f64,
    last_tick_time_ms: f64,
    /// `None` until the first tick; the next output number is `last + 1`.
    last_output_sequence: Option<u64>,
    /// Present sequence number of the most recent capture.
    pending:          Option<u64>,
    /// Present sequence number of the frame the last successful tick output.
    last_consumed:    Option<u64>,
    pending_consumed: bool,
    entries:          Vec<CompositedEntry>,
    stats:            CompositorStats,
}

impl Compositor {
    pub fn new(output_fps: f64) -> Self {
        Self::with_interval(1000.0 / output_fps)
    }

    pub fn with_interval(tick_interval_ms: f64) -> Self {
        Self {
            tick_interval_ms,
            last_tick_time_ms: 0.0,
            last_output_sequence: None,
            pending: None,
            last_consumed: None,
            pending_consumed: false,
            entries: Vec::new(),
            stats: CompositorStats::default(),
        }
    }

    pub fn tick_interval_ms(&self) -> f64 {
        self.tick_interval_ms
    }

    pub fn last_tick_time_ms(&self) -> f64 {
        self.last_tick_time_ms
    }

    /// When the compositor timer fires next.
    pub fn next_tick_time(&self) -> f64 {
        self.last_tick_time_ms + self.tick_interval_ms
    }

    fn next_output_sequence(&self) -> u64 {
        self.last_output_sequence.map_or(0, |n| n + 1)
    }

    /// Present sequence number of the frame the next tick will output.
    pub fn pending(&self) -> Option<u64> {
        self.pending
    }

    pub fn entries(&self) -> &[CompositedEntry] {
        &self.entries
    }

    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    /// Hand over a freshly captured frame. Always replaces the pending one.
    pub fn offer(&mut self, frame: &Frame) {
        if let Some(prev) = self.pending {
            if !self.pending_consumed && prev != frame.sequence_number() {
                trace!("pframe {} superseded by pframe {} before compositing", prev, frame.sequence_number());
                self.stats.superseded += 1;
            }
        }
        self.pending = Some(frame.sequence_number());
        self.pending_consumed = false;
    }

    /// Fire one tick.
    ///
    /// `frame` must be the frame named by [`pending`](Self::pending), or
    /// `None` if nothing has been captured yet. Returns the new output entry,
    /// or `Ok(None)` for an empty tick.
    pub fn emit(&mut self, frame: Option<&mut Frame>) -> Result<Option<&CompositedEntry>, CompositeError> {
        let sequence = self.next_output_sequence();
        let tick_time = self.next_tick_time();

        let Some(frame) = frame else {
            warn!(
                "oframe {} @ {:.3}ms: duplicate of nothing, no frame captured yet",
                sequence, tick_time
            );
            self.stats.empty_ticks += 1;
            self.advance(sequence, tick_time);
            return Ok(None);
        };

        if !frame.disposition().is_capturable() {
            let err = CompositeError::UnreadyFrame {
                present_sequence_number: frame.sequence_number(),
                disposition: frame.disposition(),
            };
            warn!("{} @ {:.3}ms", err, frame.present_time_ms());
            self.stats.rejected += 1;
            return Err(err);
        }

        let duplicate = self.last_consumed == Some(frame.sequence_number());
        let entry = CompositedEntry::snapshot(frame, sequence, tick_time, duplicate);
        frame.mark_composited(tick_time, sequence, duplicate);
        if duplicate {
            self.stats.duplicates += 1;
        }
        trace!(
            "oframe {} @ {:.3}ms ← pframe {}{}",
            sequence, tick_time, frame.sequence_number(), if duplicate { " DUP" } else { "" }
        );

        self.last_consumed = Some(frame.sequence_number());
        if self.pending == Some(frame.sequence_number()) {
            self.pending_consumed = true;
        }
        self.entries.push(entry);
        self.advance(sequence, tick_time);
        Ok(self.entries.last())
    }

    fn advance(&mut self, sequence: u64, tick_time: f64) {
        self.last_output_sequence = Some(sequence);
        self.last_tick_time_ms = tick_time;
        self.stats.ticks += 1;
    }

    pub fn finish(self) -> CompositorOutput {
        CompositorOutput { entries: self.entries, stats: self.stats }
    }
}
