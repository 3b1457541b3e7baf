// THEORY:
// The engine never talks to a camera, a websocket, or a renderer directly. It
// talks to these four seams, each a plain request/response contract whose
// future resolves when the request is done (a frame is ready, a command has been
// handed to the relay). No callbacks, no hidden event ordering: the scan
// orchestrator issues one command, awaits it, and only then moves on.
//
// All returned futures are `Send` so a scan or playback loop can be spawned on a
// multi-threaded runtime.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::Rgb;
use crate::error::ScanError;
use crate::pipeline::DetectionReport;
use crate::registry::ScreenId;
use image::RgbaImage;
use std::future::Future;

/// The camera. Every call yields a fresh, independent frame of fixed geometry.
pub trait CaptureSource {
    fn capture(&mut self) -> impl Future<Output = Result<Frame, ScanError>> + Send;
}

/// The channel that tells screens what to display.
pub trait Illumination {
    fn set_color(
        &self,
        screen: &ScreenId,
        color: Rgb,
    ) -> impl Future<Output = Result<(), ScanError>> + Send;

    /// Switches every screen off.
    fn all_off(&self) -> impl Future<Output = Result<(), ScanError>> + Send;

    /// Shows the same color on every screen.
    fn all_color(&self, color: Rgb) -> impl Future<Output = Result<(), ScanError>> + Send;
}

/// Where scan outcomes go. Delivery is fire-and-forget.
pub trait ScanSink {
    fn report(
        &mut self,
        screen: &ScreenId,
        report: &DetectionReport,
    ) -> impl Future<Output = ()> + Send;

    fn clear_positions(&mut self) -> impl Future<Output = ()> + Send;
}

/// Renders the square animation canvas for a point in playback time (seconds).
pub trait AnimationSource {
    /// `size` is the requested edge length; time never decreases within one playback.
    fn render(&mut self, seconds: f64, size: u32) -> RgbaImage;
}
