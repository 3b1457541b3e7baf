// THEORY:
// This file is the entry point of the `lumen_sync` library crate: the engine that
// finds where each screen of a multi-screen light show sits in a camera's view,
// and then keeps every screen showing its patch of a shared animation.
//
// Two halves, connected only by plain values:
//
// 1.  **Scan**: `scan::ScanOrchestrator` lights one screen at a time and hands
//     reference/probe frames to `pipeline::ScreenDetector`, which returns a
//     normalized position (or a "not detected" outcome) per screen.
// 2.  **Playback**: `playback::PlaybackLoop` samples each located screen's patch
//     of the animation canvas and streams only the colors that changed.
//
// Cameras, the relay to the screens, and the animation renderer are reached only
// through the traits in `interfaces`. The pixel-level stages live under
// `core_modules` and are usable on their own.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod interfaces;
pub mod pipeline;
pub mod playback;
pub mod registry;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ScanConfig;
pub use error::{ConfigError, ScanError};
pub use pipeline::{DetectionReport, MissReason, ScreenDetection, ScreenDetector};
pub use registry::{ScreenId, ScreenRecord, ScreenRegistry};
pub use scan::{ScanOrchestrator, ScanPhase, ScanSummary};
