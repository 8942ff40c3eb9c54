//! Console report and JSON export.
//!
//! The text layout has three sections:
//!
//! ```text
//! ===== PRESENTED FRAMES =====            one line per present + disposition
//! ===== OUTPUT/COMPOSITED FRAMES =====    one line per compositor tick
//! ===== STATS =====                       counts + gap summaries
//! ```

use std::io::{self, Write};

use capsim_core::{CompositedEntry, Disposition, Frame};
use capsim_sim::SimulationResult;
use serde::Serialize;

use crate::stats::{GapSeries, Summary};

/// A finished simulation plus the derived gap statistics.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub source:     &'a str,
    pub output_fps: f64,
    pub frame_gaps: Option<Summary>,
    pub time_gaps:  Option<Summary>,
    pub result:     &'a SimulationResult,
    #[serde(skip)]
    gaps: GapSeries,
}

impl<'a> Report<'a> {
    pub fn new(source: &'a str, output_fps: f64, result: &'a SimulationResult) -> Self {
        let gaps = GapSeries::from_output(&result.output);
        Self {
            source,
            output_fps,
            frame_gaps: gaps.frame_summary(),
            time_gaps: gaps.time_summary(),
            result,
            gaps,
        }
    }

    /// Full report. With `summary_only`, the per-frame sections are skipped.
    pub fn write_text<W: Write>(&self, w: &mut W, summary_only: bool) -> io::Result<()> {
        writeln!(w, "Data from: '{}'", self.source)?;
        writeln!(w, "Composite rate {}fps", self.output_fps)?;
        writeln!(w)?;

        if !summary_only {
            self.write_presented(w)?;
            writeln!(w, "\n")?;
            self.write_output(w)?;
            writeln!(w, "\n")?;
        }
        self.write_stats(w)
    }

    fn write_presented<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "===== PRESENTED FRAMES =====")?;
        for frame in &self.result.frames {
            writeln!(
                w,
                "pframe {} @ {:.3}ms, {}",
                frame.sequence_number(),
                frame.present_time_ms(),
                disposition_label(frame)
            )?;
        }
        Ok(())
    }

    fn write_output<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "===== OUTPUT/COMPOSITED FRAMES =====")?;
        for ((entry, frame_gap), time_gap) in self
            .result
            .output
            .iter()
            .zip(&self.gaps.frames)
            .zip(&self.gaps.times)
        {
            writeln!(w, "{}", output_line(entry, *frame_gap, *time_gap))?;
        }
        Ok(())
    }

    fn write_stats<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let r = self.result;
        let stats = &r.compositor_stats;
        writeln!(w, "===== STATS =====")?;
        writeln!(w, "Presented frames: {}", r.frames.len())?;
        writeln!(w, "Captured frames: {} ({} unused)", r.captured.len(), r.unused_captures())?;
        writeln!(
            w,
            "Composited/output frames: {} ({} duplicates, {} empty ticks)",
            r.output.len(),
            stats.duplicates,
            stats.empty_ticks
        )?;
        writeln!(w, "Superseded captures: {}", stats.superseded)?;
        writeln!(w)?;
        writeln!(w, "Frame number gaps: {}", summary_line(self.frame_gaps, 2, 0))?;
        writeln!(w, "Frame time gaps: {}", summary_line(self.time_gaps, 3, 3))
    }

    /// Pretty-printed JSON of the summary and the full result.
    pub fn write_json<W: Write>(&self, w: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(w, self)
    }
}

fn disposition_label(frame: &Frame) -> String {
    let otime = frame.composite_time_ms().unwrap_or_default();
    match frame.disposition() {
        Disposition::Composited => format!("CAPTURED + COMPOSITED @ otime {otime:.3}ms"),
        Disposition::CompositedDuplicate => format!("CAPTURED + COMPOSITED (DUPS) @ otime {otime:.3}ms"),
        other => other.name().to_owned(),
    }
}

fn output_line(entry: &CompositedEntry, frame_gap: i64, time_gap: f64) -> String {
    format!(
        "oframe {} @ {:.3}ms, pframe {} @ {:.3}ms, gap {} frames, {:.3}ms{}",
        entry.composite_sequence_number,
        entry.composite_time_ms,
        entry.present_sequence_number,
        entry.present_time_ms,
        frame_gap,
        time_gap,
        if entry.duplicate { " DUP" } else { "" }
    )
}

/// Frame-number gaps are whole frames, so their min and max print with
/// `extremes = 0`.
fn summary_line(summary: Option<Summary>, precision: usize, extremes: usize) -> String {
    let Some(s) = summary else {
        return "n/a".to_owned();
    };
    let stddev = s
        .stddev
        .map_or_else(|| "n/a".to_owned(), |v| format!("{v:.precision$}"));
    format!(
        "{:.p$} avg, {:.e$} min, {:.e$} max, {} stddev",
        s.median,
        s.min,
        s.max,
        stddev,
        p = precision,
        e = extremes
    )
}

#[cfg(test)]
mod tests {
    use capsim_core::SimConfig;
    use capsim_sim::simulate_times;

    use super::*;

    fn render(result: &SimulationResult, summary_only: bool) -> String {
        let mut out = Vec::new();
        Report::new("trace.csv", 100.0, result)
            .write_text(&mut out, summary_only)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample() -> SimulationResult {
        let cfg = SimConfig { output_fps: 100.0, capture_ratio: Some(0.0), ..Default::default() };
        simulate_times(&cfg, &[5.0, 27.0, 31.0])
    }

    #[test]
    fn text_report_lists_frames_and_ticks() {
        let text = render(&sample(), false);

        assert!(text.starts_with("Data from: 'trace.csv'\nComposite rate 100fps\n"));
        assert!(text.contains("pframe 0 @ 5.000ms, CAPTURED + COMPOSITED (DUPS) @ otime 20.000ms"));
        assert!(text.contains("pframe 1 @ 27.000ms, CAPTURED + COMPOSITED @ otime 30.000ms\n"));
        assert!(text.contains("pframe 2 @ 31.000ms, CAPTURED\n"));
        assert!(text.contains("oframe 0 @ 10.000ms, pframe 0 @ 5.000ms, gap 0 frames, 5.000ms\n"));
        assert!(text.contains("oframe 1 @ 20.000ms, pframe 0 @ 5.000ms, gap 0 frames, 0.000ms DUP\n"));
        assert!(text.contains("oframe 2 @ 30.000ms, pframe 1 @ 27.000ms, gap 1 frames, 22.000ms\n"));
        assert!(text.contains("Captured frames: 3 (1 unused)"));
        assert!(text.contains("Composited/output frames: 3 (1 duplicates, 0 empty ticks)"));
    }

    #[test]
    fn summary_only_skips_frame_lists() {
        let text = render(&sample(), true);
        assert!(!text.contains("PRESENTED FRAMES"));
        assert!(text.contains("===== STATS ====="));
        assert!(text.contains("Frame number gaps: 0.00 avg, 0 min, 1 max, 0.58 stddev"));
    }

    #[test]
    fn empty_result_prints_na() {
        let result = simulate_times(&SimConfig::default(), &[]);
        let text = render(&result, true);
        assert!(text.contains("Frame time gaps: n/a"));
    }

    #[test]
    fn json_export_carries_summary_and_frames() {
        let result = sample();
        let mut out = Vec::new();
        Report::new("trace.csv", 100.0, &result).write_json(&mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["source"], "trace.csv");
        assert_eq!(value["frame_gaps"]["count"], 3);
        assert_eq!(value["result"]["output"][1]["duplicate"], true);
        assert_eq!(value["result"]["frames"][0]["disposition"], "COMPOSITED_DUPLICATE");
    }
}
