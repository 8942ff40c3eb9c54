use std::path::PathBuf;

use capsim_core::{ConfigError, SimConfig};
use clap::Parser;

/// Replay a PresentMon capture through a simulated game-capture hook and a
/// fixed-rate compositor, then report which game frames made it to the output.
#[derive(Parser, Debug)]
#[command(name = "capsim")]
#[command(version)]
pub struct Args {
    /// PresentMon capture file to use as the present source (plain or gzip CSV)
    #[arg(long = "presentmon-file", visible_alias = "pmf", value_name = "PATH")]
    pub presentmon_file: Option<PathBuf>,

    /// Capture no more than RATIO × output FPS times per second (0 = no limit)
    #[arg(long = "capture-ratio", visible_alias = "cr", value_name = "RATIO")]
    pub capture_ratio: Option<f64>,

    /// Compositor output rate [default: 60]
    #[arg(long)]
    pub fps: Option<f64>,

    /// Trace column holding the milliseconds between presents [default: msBetweenPresents]
    #[arg(long, value_name = "NAME")]
    pub column: Option<String>,

    /// JSON simulation config; flags given on the command line take precedence
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write the full result as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Print only the stats section
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn sim_config(&self) -> Result<SimConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };
        if let Some(fps) = self.fps {
            cfg.output_fps = fps;
        }
        if self.capture_ratio.is_some() {
            cfg.capture_ratio = self.capture_ratio;
        }
        if let Some(column) = &self.column {
            cfg.delta_column = column.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("capsim").chain(argv.iter().copied())).expect("valid args")
    }

    #[test]
    fn short_aliases_are_accepted() {
        let args = parse(&["--pmf", "run.csv.gz", "--cr", "0"]);
        assert_eq!(args.presentmon_file, Some(PathBuf::from("run.csv.gz")));
        assert_eq!(args.capture_ratio, Some(0.0));
    }

    #[test]
    fn defaults_without_flags() {
        let cfg = parse(&[]).sim_config().unwrap();
        assert_eq!(cfg, SimConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = parse(&["--fps", "30", "--capture-ratio", "2", "--column", "MsBetweenPresents"])
            .sim_config()
            .unwrap();
        assert_eq!(cfg.output_fps, 30.0);
        assert_eq!(cfg.capture_ratio, Some(2.0));
        assert_eq!(cfg.delta_column, "MsBetweenPresents");
    }

    #[test]
    fn invalid_fps_is_rejected() {
        assert!(parse(&["--fps", "0"]).sim_config().is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = parse(&["--config", "/nonexistent/capsim.json"]).sim_config().unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)), "{err}");
    }
}
