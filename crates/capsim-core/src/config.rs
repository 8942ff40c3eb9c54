use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Compositor rate used when nothing else is configured.
pub const DEFAULT_OUTPUT_FPS: f64 = 60.0;

/// PresentMon column holding the milliseconds between consecutive presents.
pub const DEFAULT_DELTA_COLUMN: &str = "msBetweenPresents";

/// Simulation parameters.
///
/// `capture_ratio` controls how often the capture side may sample relative
/// to the compositor rate:
/// - `None` → at most twice per compositor tick
/// - `Some(0.0)` → no throttling, every present is captured
/// - `Some(r)` → at most `r` times per compositor tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    #[serde(alias = "outputFps", alias = "fps")]
    pub output_fps: f64,
    #[serde(alias = "captureRatio")]
    pub capture_ratio: Option<f64>,
    #[serde(alias = "deltaColumn")]
    pub delta_column: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            output_fps: DEFAULT_OUTPUT_FPS,
            capture_ratio: None,
            delta_column: DEFAULT_DELTA_COLUMN.to_owned(),
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.output_fps.is_finite() || self.output_fps <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!("output fps must be positive, got {}", self.output_fps),
            });
        }
        if let Some(ratio) = self.capture_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("capture ratio must be zero or positive, got {ratio}"),
                });
            }
        }
        if self.delta_column.trim().is_empty() {
            return Err(ConfigError::Invalid { reason: "delta column name is empty".into() });
        }
        Ok(())
    }

    /// Time between compositor ticks.
    pub fn tick_interval_ms(&self) -> f64 {
        1000.0 / self.output_fps
    }

    /// Minimum spacing between captures; 0 disables throttling.
    pub fn capture_interval_ms(&self) -> f64 {
        match self.capture_ratio {
            None => self.tick_interval_ms() / 2.0,
            Some(ratio) if ratio == 0.0 => 0.0,
            Some(ratio) => self.tick_interval_ms() / ratio,
        }
    }
}
