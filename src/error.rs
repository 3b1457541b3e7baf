// THEORY:
// Errors in this crate are reserved for broken contracts: frames that cannot be
// compared, a scan with nobody to scan, a camera or relay that refused a
// request, or a configuration file that cannot be trusted. A screen that simply
// was not seen by the camera is NOT an error; that outcome travels as a normal
// `DetectionReport::NotDetected` value so a scan can keep going.

use thiserror::Error;

/// Failures that halt the operation that raised them.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Two frames that must share a geometry do not.
    #[error("frame dimensions differ: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
    /// A pixel buffer does not hold exactly `width * height * 4` bytes.
    #[error("frame buffer holds {len} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        len: usize,
        expected: usize,
    },
    /// Averaging was asked to combine zero frames.
    #[error("no frames to average")]
    EmptyFrameSet,
    /// A scan was started without any screens.
    #[error("no screens to scan")]
    NoScreens,
    /// The capture surface is unavailable or failed to deliver a frame.
    #[error("capture failed: {0}")]
    Capture(String),
    /// The illumination channel rejected a command.
    #[error("illumination command failed: {0}")]
    Illumination(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Problems loading or validating a `ScanConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
