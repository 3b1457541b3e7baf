// THEORY:
// The `pipeline` module is the top-level API of the detection engine. It strings
// the per-probe stages together into one call: given the all-off reference and
// a single-screen-lit probe, where is that screen?
//
//     difference -> blur -> adaptive threshold -> closing -> largest blob
//                -> edge refinement + weighted centroid -> unit square + clamp
//
// The answer is a `DetectionReport`. "Not detected" is an ordinary outcome, not
// an error; only broken input contracts (mismatched frames) return `Err`.

use crate::config::ScanConfig;
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::difference::{Difference, DifferenceMap};
use crate::core_modules::frame::Frame;
use crate::core_modules::geometry::{
    AreaBounds, NormalizedPoint, NormalizedRect, clamp_point, clamp_rect, point_to_unit_square,
    rect_to_unit_square,
};
use crate::core_modules::morphology::morphology;
use crate::core_modules::refiner::{EdgeSearch, measure_blob};
use crate::core_modules::smart_blob::BlobMeasurement;
use crate::core_modules::threshold::{BinaryMask, ThresholdParams, adaptive_threshold};
use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where one screen sits in the camera's unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenDetection {
    pub center: NormalizedPoint,
    pub area: NormalizedRect,
    pub pixel_count: usize,
}

/// Why a probe produced no detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissReason {
    /// Nothing in the probe rose above the threshold.
    NoLitPixels,
    /// The largest lit region was smaller than `min_blob_size`.
    BlobTooSmall { pixel_count: usize },
    /// The scan stopped before this screen was probed.
    Cancelled,
}

/// The outcome of probing one screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DetectionReport {
    Detected(ScreenDetection),
    NotDetected(MissReason),
}

impl DetectionReport {
    pub fn detection(&self) -> Option<&ScreenDetection> {
        match self {
            DetectionReport::Detected(d) => Some(d),
            DetectionReport::NotDetected(_) => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, DetectionReport::Detected(_))
    }
}

/// Intermediate products of one detection, for diagnostics.
#[derive(Debug, Clone)]
pub struct DetectionTrace {
    pub report: DetectionReport,
    pub threshold: Difference,
    pub raw: DifferenceMap,
    pub blurred: DifferenceMap,
    pub mask: BinaryMask,
    /// Pixel-space measurement of the winning blob, when one passed the size gate.
    pub measurement: Option<BlobMeasurement>,
}

/// Stateless screen locator built from an immutable configuration.
#[derive(Debug, Clone)]
pub struct ScreenDetector {
    config: ScanConfig,
}

impl ScreenDetector {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Locates the single lit screen in `probe` relative to `reference`.
    pub fn detect(&self, reference: &Frame, probe: &Frame) -> Result<DetectionReport, ScanError> {
        self.detect_traced(reference, probe).map(|trace| trace.report)
    }

    /// Like `detect`, but also returns every intermediate map.
    pub fn detect_traced(
        &self,
        reference: &Frame,
        probe: &Frame,
    ) -> Result<DetectionTrace, ScanError> {
        let config = &self.config;

        // --- 1. Difference & Blur ---
        let raw = DifferenceMap::compute(reference, probe)?;
        let blurred = raw.blurred(config.blur_radius);

        // --- 2. Adaptive Threshold & Closing ---
        let threshold = adaptive_threshold(&blurred, ThresholdParams::from(config));
        let mask = morphology::close(
            &BinaryMask::from_threshold(&blurred, threshold),
            config.morph_kernel_size,
        );
        debug!(threshold, lit = mask.lit_count(), "thresholded probe");

        // --- 3. Largest Component ---
        let Some(blob) = blob_detector::largest_blob(&mask) else {
            return Ok(DetectionTrace {
                report: DetectionReport::NotDetected(MissReason::NoLitPixels),
                threshold,
                raw,
                blurred,
                mask,
                measurement: None,
            });
        };
        if blob.size() < config.min_blob_size {
            debug!(size = blob.size(), min = config.min_blob_size, "largest blob too small");
            return Ok(DetectionTrace {
                report: DetectionReport::NotDetected(MissReason::BlobTooSmall {
                    pixel_count: blob.size(),
                }),
                threshold,
                raw,
                blurred,
                mask,
                measurement: None,
            });
        }

        // --- 4. Refinement & Normalization ---
        let search = EdgeSearch {
            padding: config.edge_padding,
            threshold: config.edge_threshold,
        };
        let measurement = measure_blob(&blob, &raw, &blurred, search);
        let detection = self.normalize(&measurement, probe.width(), probe.height());
        debug!(
            pixels = measurement.pixel_count,
            cx = detection.center.x,
            cy = detection.center.y,
            "screen located"
        );

        Ok(DetectionTrace {
            report: DetectionReport::Detected(detection),
            threshold,
            raw,
            blurred,
            mask,
            measurement: Some(measurement),
        })
    }

    /// Converts a pixel-space measurement into a clamped unit-square detection.
    pub fn normalize(
        &self,
        measurement: &BlobMeasurement,
        width: u32,
        height: u32,
    ) -> ScreenDetection {
        let bounds = AreaBounds {
            min: self.config.min_area,
            max: self.config.max_area,
        };
        let area = clamp_rect(
            rect_to_unit_square(measurement.bounding_box.to_pixel_rect(), width, height),
            bounds,
        );
        let center = clamp_point(point_to_unit_square(measurement.centroid, width, height));
        ScreenDetection {
            center,
            area,
            pixel_count: measurement.pixel_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::{point_from_unit_square, rect_from_unit_square};
    use crate::test_support::{PixelBox, black_frame, frame_with_boxes};

    const W: u32 = 320;
    const H: u32 = 240;

    fn detector() -> ScreenDetector {
        ScreenDetector::new(ScanConfig::default())
    }

    fn overlap_fraction(found: crate::core_modules::geometry::PixelRect, truth: PixelBox) -> f32 {
        let x0 = found.x.max(truth.x as f32);
        let y0 = found.y.max(truth.y as f32);
        let x1 = (found.x + found.width).min((truth.x + truth.width) as f32);
        let y1 = (found.y + found.height).min((truth.y + truth.height) as f32);
        let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
        inter / (truth.width * truth.height) as f32
    }

    #[test]
    fn locates_a_single_bright_rectangle() {
        let truth = PixelBox::new(60, 50, 40, 30);
        let reference = black_frame(W, H);
        let probe = frame_with_boxes(W, H, &[truth], 255);

        let report = detector().detect(&reference, &probe).unwrap();
        let detection = report.detection().expect("rectangle should be detected");

        let center = point_from_unit_square(detection.center, W, H);
        assert!((center.x - 80.0).abs() < 1.5, "{center:?}");
        assert!((center.y - 65.0).abs() < 1.5, "{center:?}");

        let area = rect_from_unit_square(detection.area, W, H);
        assert!(overlap_fraction(area, truth) >= 0.9, "{area:?}");
        assert!(detection.pixel_count >= 1000);
    }

    #[test]
    fn dim_rectangle_in_portrait_frame() {
        let truth = PixelBox::new(30, 200, 25, 45);
        let reference = black_frame(H, W);
        let probe = frame_with_boxes(H, W, &[truth], 90);

        let detection = *detector().detect(&reference, &probe).unwrap().detection().unwrap();
        let center = point_from_unit_square(detection.center, H, W);
        assert!((center.x - 42.5).abs() < 1.5, "{center:?}");
        assert!((center.y - 222.5).abs() < 1.5, "{center:?}");
        let area = rect_from_unit_square(detection.area, H, W);
        assert!(overlap_fraction(area, truth) >= 0.9, "{area:?}");
    }

    #[test]
    fn unchanged_probe_is_not_detected() {
        let reference = frame_with_boxes(W, H, &[PixelBox::new(10, 10, 50, 50)], 180);
        let report = detector().detect(&reference, &reference.clone()).unwrap();
        assert_eq!(report, DetectionReport::NotDetected(MissReason::NoLitPixels));
    }

    #[test]
    fn larger_of_two_rectangles_wins() {
        let small = PixelBox::new(20, 20, 20, 20);
        let large = PixelBox::new(200, 120, 50, 40);
        let probe = frame_with_boxes(W, H, &[small, large], 255);

        let detection = *detector()
            .detect(&black_frame(W, H), &probe)
            .unwrap()
            .detection()
            .unwrap();
        let center = point_from_unit_square(detection.center, W, H);
        assert!((center.x - 225.0).abs() < 1.5, "{center:?}");
        assert!((center.y - 140.0).abs() < 1.5, "{center:?}");
    }

    #[test]
    fn tiny_blob_is_reported_as_too_small() {
        let probe = frame_with_boxes(W, H, &[PixelBox::new(100, 100, 5, 5)], 255);
        let report = detector().detect(&black_frame(W, H), &probe).unwrap();
        assert!(matches!(
            report,
            DetectionReport::NotDetected(MissReason::BlobTooSmall { .. })
        ));
    }

    #[test]
    fn oversized_area_is_clamped() {
        let probe = frame_with_boxes(W, H, &[PixelBox::new(0, 0, W, H)], 255);
        let detection = *detector()
            .detect(&black_frame(W, H), &probe)
            .unwrap()
            .detection()
            .unwrap();
        assert!((detection.area.width - 0.65).abs() < 1e-6);
        assert!((detection.area.height - 0.65).abs() < 1e-6);
    }

    #[test]
    fn mismatched_frames_are_a_contract_violation() {
        let err = detector().detect(&black_frame(W, H), &black_frame(H, W)).unwrap_err();
        assert!(matches!(err, ScanError::DimensionMismatch { .. }));
    }

    #[test]
    fn trace_exposes_threshold_and_mask() {
        let probe = frame_with_boxes(W, H, &[PixelBox::new(60, 50, 40, 30)], 255);
        let trace = detector().detect_traced(&black_frame(W, H), &probe).unwrap();
        assert!(trace.threshold >= ScanConfig::default().min_threshold);
        assert!(trace.mask.lit_count() > 0);
        assert!(trace.measurement.is_some());
    }
}
