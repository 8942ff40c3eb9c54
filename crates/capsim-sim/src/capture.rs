//! Capture-side frame sampling.
//!
//! Mirrors a game-capture hook that is called on every present and decides
//! whether enough time has passed to grab this one:
//!
//! ```text
//! elapsed < interval          → skip
//! elapsed > 2 × interval      → grab, restart the grid at this present
//! otherwise                   → grab, advance the grid by one interval
//! ```
//!
//! Advancing by exactly one interval keeps captures on an even cadence even
//! though presents land at arbitrary times. Only a long stall moves the grid.

use capsim_core::Frame;
use serde::Serialize;
use tracing::{debug, trace};

/// Counters kept by [`CaptureSampler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub captured: u64,
    pub ignored:  u64,
    /// Captures that restarted the grid after a stall.
    pub resyncs:  u64,
}

#[derive(Debug, Clone)]
pub struct CaptureSampler {
    interval_ms:         f64,
    last_sample_time_ms: f64,
    stats:               CaptureStats,
}

impl CaptureSampler {
    /// `interval_ms` of 0 captures every present.
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms, last_sample_time_ms: 0.0, stats: CaptureStats::default() }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Start of the current sampling slot.
    pub fn last_sample_time_ms(&self) -> f64 {
        self.last_sample_time_ms
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Decide whether `frame` is captured, marking it either way.
    pub fn try_capture(&mut self, frame: &mut Frame) -> bool {
        let now = frame.present_time_ms();
        let elapsed = now - self.last_sample_time_ms;

        if self.interval_ms > 0.0 && elapsed < self.interval_ms {
            frame.mark_ignored();
            self.stats.ignored += 1;
            return false;
        }

        frame.mark_captured(now);
        self.stats.captured += 1;

        if elapsed > self.interval_ms * 2.0 {
            if self.interval_ms > 0.0 {
                debug!(
                    "pframe {} @ {:.3}ms: {:.3}ms since last slot, resyncing capture grid",
                    frame.sequence_number(), now, elapsed
                );
                self.stats.resyncs += 1;
            }
            self.last_sample_time_ms = now;
        } else {
            self.last_sample_time_ms += self.interval_ms;
        }
        trace!("pframe {} captured, next slot from {:.3}ms", frame.sequence_number(), self.last_sample_time_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use capsim_core::{Disposition, PresentEvent};

    use super::*;

    fn frame(seq: u64, t: f64) -> Frame {
        Frame::new(PresentEvent::new(seq, t))
    }

    #[test]
    fn zero_interval_captures_everything() {
        let mut sampler = CaptureSampler::new(0.0);
        for (i, t) in [0.0, 0.1, 0.2, 5.0, 5.0].into_iter().enumerate() {
            let mut f = frame(i as u64, t);
            assert!(sampler.try_capture(&mut f));
            assert_eq!(f.disposition(), Disposition::Captured);
        }
        assert_eq!(sampler.stats().ignored, 0);
        assert_eq!(sampler.stats().captured, 5);
    }

    #[test]
    fn too_early_is_ignored_without_moving_grid() {
        let mut sampler = CaptureSampler::new(10.0);
        let mut f = frame(0, 9.0);
        assert!(!sampler.try_capture(&mut f));
        assert_eq!(f.disposition(), Disposition::Ignored);
        assert_eq!(f.capture_time_ms(), None);
        assert_eq!(sampler.last_sample_time_ms(), 0.0);
    }

    #[test]
    fn grid_advances_by_one_interval() {
        let mut sampler = CaptureSampler::new(10.0);

        // 12ms after the slot start: captured, slot moves to 10 (not 12).
        let mut f = frame(0, 12.0);
        assert!(sampler.try_capture(&mut f));
        assert_eq!(f.capture_time_ms(), Some(12.0));
        assert_eq!(sampler.last_sample_time_ms(), 10.0);

        // 19ms: only 9ms into the slot.
        assert!(!sampler.try_capture(&mut frame(1, 19.0)));

        // 21ms: captured, slot moves to 20.
        assert!(sampler.try_capture(&mut frame(2, 21.0)));
        assert_eq!(sampler.last_sample_time_ms(), 20.0);
    }

    #[test]
    fn exactly_twice_the_interval_keeps_phase() {
        let mut sampler = CaptureSampler::new(10.0);
        assert!(sampler.try_capture(&mut frame(0, 20.0)));
        assert_eq!(sampler.last_sample_time_ms(), 10.0);
        assert_eq!(sampler.stats().resyncs, 0);
    }

    #[test]
    fn stall_resyncs_to_present_time() {
        let mut sampler = CaptureSampler::new(10.0);
        assert!(sampler.try_capture(&mut frame(0, 10.0)));
        assert_eq!(sampler.last_sample_time_ms(), 10.0);

        // 45ms gap > 2 × interval.
        assert!(sampler.try_capture(&mut frame(1, 55.0)));
        assert_eq!(sampler.last_sample_time_ms(), 55.0);
        assert_eq!(sampler.stats().resyncs, 1);

        // The next slot opens at 65, not at the old grid's 60.
        assert!(!sampler.try_capture(&mut frame(2, 62.0)));
        assert!(sampler.try_capture(&mut frame(3, 65.0)));
        assert_eq!(sampler.last_sample_time_ms(), 65.0);
    }
}
