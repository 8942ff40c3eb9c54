use capsim_core::CompositedEntry;
use serde::Serialize;

/// Count / median / min / max / sample standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count:  usize,
    pub median: f64,
    pub min:    f64,
    pub max:    f64,
    /// `None` for fewer than two values.
    pub stddev: Option<f64>,
}

impl Summary {
    /// `None` for an empty series.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        let stddev = (n > 1).then(|| {
            let mean = sorted.iter().sum::<f64>() / n as f64;
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        Some(Self { count: n, median, min: sorted[0], max: sorted[n - 1], stddev })
    }
}

// ── GapSeries ─────────────────────────────────────────────────────────────────

/// Distance between the source presents of consecutive output frames.
///
/// A duplicate contributes a gap of 0 frames / 0 ms; a large gap means the
/// output skipped many game frames. The first entry is measured from
/// present 0 at 0 ms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapSeries {
    pub frames: Vec<i64>,
    pub times:  Vec<f64>,
}

impl GapSeries {
    pub fn from_output(entries: &[CompositedEntry]) -> Self {
        let mut prev_frame = 0i64;
        let mut prev_time = 0.0f64;
        let mut gaps = Self {
            frames: Vec::with_capacity(entries.len()),
            times:  Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            let frame = entry.present_sequence_number as i64;
            gaps.frames.push(frame - prev_frame);
            gaps.times.push(entry.present_time_ms - prev_time);
            prev_frame = frame;
            prev_time = entry.present_time_ms;
        }
        gaps
    }

    pub fn frame_summary(&self) -> Option<Summary> {
        let as_f64: Vec<f64> = self.frames.iter().map(|&g| g as f64).collect();
        Summary::of(&as_f64)
    }

    pub fn time_summary(&self) -> Option<Summary> {
        Summary::of(&self.times)
    }
}
