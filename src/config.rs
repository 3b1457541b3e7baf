// THEORY:
// `ScanConfig` is the single, flat bag of tunables shared by every stage of the
// engine. It is deliberately plain: scalars only, no nesting, every field with a
// default, so a deployment can override just the handful of numbers its camera
// needs from a short TOML file. Components receive it at construction and never
// mutate it.
//
// Timing fields are stored in milliseconds (friendly in TOML) and exposed as
// `Duration`s for the async orchestrator.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Every tunable of the detection pipeline, scan orchestrator and playback loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    // --- Capture & timing ---
    /// Number of camera frames averaged into one reference or probe capture.
    pub frames_to_average: usize,
    /// Wait after forcing every screen off, before the reference capture.
    pub reference_settle_ms: u64,
    /// Wait after lighting a screen, before its probe capture.
    pub flash_settle_ms: u64,
    /// Spacing between the individual frames of one averaged capture.
    pub capture_spacing_ms: u64,
    /// Wait after switching a screen back off, before the next screen.
    pub cooldown_ms: u64,

    // --- Thresholding ---
    /// Floor for the adaptive detection threshold.
    pub min_threshold: f32,
    /// How many standard deviations above the mean the adaptive threshold sits.
    pub threshold_std_devs: f32,
    /// Differences at or below this value are ignored by the threshold statistics.
    pub noise_floor: f32,
    /// Upper cap for the adaptive threshold as a fraction of the peak difference.
    /// Zero disables the cap.
    pub threshold_peak_ratio: f32,

    // --- Spatial filtering ---
    /// Smallest blob, in camera pixels, accepted as a screen.
    pub min_blob_size: usize,
    /// Radius of the separable Gaussian blur kernel.
    pub blur_radius: usize,
    /// Side of the square morphology window. Must be odd.
    pub morph_kernel_size: usize,
    /// Pixels added around the blob box when searching for true edges.
    pub edge_padding: u32,
    /// Raw difference above which a pixel counts as part of a screen edge.
    pub edge_threshold: f32,

    // --- Normalized area guard ---
    pub min_area: f32,
    pub max_area: f32,

    // --- Playback ---
    pub target_fps: f64,
    /// Manhattan RGB distance below which a new color is not re-sent.
    pub color_change_threshold: u32,
    /// Side of the square virtual animation canvas, in pixels.
    pub canvas_size: u32,
    /// Global multiplicative brightness applied to sampled colors.
    pub brightness: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            frames_to_average: 3,
            reference_settle_ms: 500,
            flash_settle_ms: 300,
            capture_spacing_ms: 40,
            cooldown_ms: 200,
            min_threshold: 30.0,
            threshold_std_devs: 1.5,
            noise_floor: 5.0,
            threshold_peak_ratio: 0.5,
            min_blob_size: 50,
            blur_radius: 2,
            morph_kernel_size: 5,
            edge_padding: 10,
            edge_threshold: 20.0,
            min_area: 0.02,
            max_area: 0.65,
            target_fps: 30.0,
            color_change_threshold: 3,
            canvas_size: 64,
            brightness: 1.0,
        }
    }
}

impl ScanConfig {
    /// Reads and validates a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_to_average == 0 {
            return Err(invalid("frames_to_average", "must be at least 1"));
        }
        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 {
            return Err(invalid(
                "morph_kernel_size",
                format!("must be odd, got {}", self.morph_kernel_size),
            ));
        }
        if !(self.min_area > 0.0 && self.min_area <= 1.0) {
            return Err(invalid("min_area", "must lie in (0, 1]"));
        }
        if !(self.max_area > 0.0 && self.max_area <= 1.0) {
            return Err(invalid("max_area", "must lie in (0, 1]"));
        }
        if self.min_area > self.max_area {
            return Err(invalid(
                "min_area",
                format!("{} exceeds max_area {}", self.min_area, self.max_area),
            ));
        }
        if !(self.target_fps > 0.0 && self.target_fps <= 1000.0) {
            return Err(invalid("target_fps", "must lie in (0, 1000]"));
        }
        if self.canvas_size == 0 {
            return Err(invalid("canvas_size", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(invalid("brightness", "must lie in [0, 1]"));
        }
        if self.min_threshold < 0.0 || self.edge_threshold < 0.0 || self.noise_floor < 0.0 {
            return Err(invalid("min_threshold", "thresholds must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.threshold_peak_ratio) {
            return Err(invalid("threshold_peak_ratio", "must lie in [0, 1]"));
        }
        Ok(())
    }

    pub fn reference_settle(&self) -> Duration {
        Duration::from_millis(self.reference_settle_ms)
    }

    pub fn flash_settle(&self) -> Duration {
        Duration::from_millis(self.flash_settle_ms)
    }

    pub fn capture_spacing(&self) -> Duration {
        Duration::from_millis(self.capture_spacing_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Time budget of one playback frame.
    pub fn frame_interval(&self) -> Duration {
        // An unvalidated rate of zero or below falls back to the default rate.
        Duration::try_from_secs_f64(1.0 / self.target_fps)
            .unwrap_or_else(|_| Duration::from_secs_f64(1.0 / ScanConfig::default().target_fps))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
