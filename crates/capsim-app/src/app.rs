use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{bail, Context, Result};
use capsim_report::Report;
use capsim_sim::Driver;
use capsim_trace::FrameSource;
use tracing::info;

use crate::cli::Args;

/// Load the trace, run the simulation, print the report.
///
/// # Flow
/// 1. Resolve `SimConfig` (config file, then flags)
/// 2. Open the PresentMon trace (gzip sniffed)
/// 3. Replay presents through capture + compositor
/// 4. Text report to stdout, optional JSON to `--json`
pub fn run(args: &Args) -> Result<()> {
    let Some(path) = &args.presentmon_file else {
        bail!("no PresentMon file specified (use --presentmon-file)");
    };

    let config = args.sim_config().context("Invalid simulation config")?;
    info!(
        "Composite rate {}fps ({:.3}ms), capture interval {:.3}ms",
        config.output_fps,
        config.tick_interval_ms(),
        config.capture_interval_ms()
    );

    let mut source = FrameSource::open(path, config.delta_column.as_str())
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let events = source.events()?;
    let result = Driver::new(&config)
        .run(events)
        .with_context(|| format!("Failed to replay {}", path.display()))?;

    info!(
        "Presented {} → captured {} → output {} ({} dup)",
        result.frames.len(),
        result.captured.len(),
        result.output.len(),
        result.duplicate_count()
    );

    let report = Report::new(source.label(), config.output_fps, &result);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    report.write_text(&mut out, args.quiet).context("Failed to write report")?;
    out.flush().context("Failed to write report")?;

    if let Some(json_path) = &args.json {
        let file = File::create(json_path)
            .with_context(|| format!("Failed to create {}", json_path.display()))?;
        let mut writer = BufWriter::new(file);
        report
            .write_json(&mut writer)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        writer.flush()?;
        info!("Wrote JSON result to {}", json_path.display());
    }

    Ok(())
}
