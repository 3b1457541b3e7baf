// THEORY:
// A scan finds every screen by lighting them one at a time in front of the
// camera. The orchestrator owns the sequencing and nothing else; all pixel work
// is delegated to `ScreenDetector`.
//
//     Idle -> ReferenceCapture -> per screen:
//         Flash -> Settle -> Capture -> Detect -> Report -> Off -> Cooldown
//     -> Idle
//
// Rules the sequence keeps:
// - The reference is captured once per scan, after every screen was forced off
//   and the room had `reference_settle` to stabilize.
// - At most one screen is lit during the per-screen loop. A screen is switched
//   back to black before the next one is flashed.
// - Every delay is a fixed configured wait, never adaptive.
// - A screen that is not found is reported and the scan moves on. Only broken
//   collaborators (camera, relay) or broken frames abort a scan.
// - However a scan ends (done, stopped, or failed) the phase returns to `Idle`.
//
// Stopping is cooperative: the stop flag is looked at between screens, never in
// the middle of a probe.

use crate::config::ScanConfig;
use crate::core_modules::frame::{Frame, average_frames};
use crate::core_modules::pixel::pixel::Rgb;
use crate::error::ScanError;
use crate::interfaces::{CaptureSource, Illumination, ScanSink};
use crate::pipeline::{DetectionReport, MissReason, ScreenDetector};
use crate::registry::ScreenId;
use std::fmt;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Where a scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    /// All screens off, capturing the baseline.
    ReferenceCapture,
    /// Lighting the screen under test.
    Flash,
    /// Waiting for the lit screen and camera exposure to settle.
    Settle,
    Capture,
    Detect,
    Report,
    /// Switching the screen under test back to black.
    Off,
    Cooldown,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::ReferenceCapture => "reference capture",
            ScanPhase::Flash => "flash",
            ScanPhase::Settle => "settle",
            ScanPhase::Capture => "capture",
            ScanPhase::Detect => "detect",
            ScanPhase::Report => "report",
            ScanPhase::Off => "off",
            ScanPhase::Cooldown => "cooldown",
        };
        f.write_str(name)
    }
}

/// Every screen's outcome, in the order the screens were probed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub outcomes: Vec<(ScreenId, DetectionReport)>,
    /// The stop flag ended the scan early.
    pub cancelled: bool,
}

impl ScanSummary {
    pub fn detected_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_detected()).count()
    }

    pub fn report_for(&self, screen: &ScreenId) -> Option<&DetectionReport> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == screen)
            .map(|(_, report)| report)
    }
}

/// Drives one camera, one illumination channel and one result sink through a scan.
pub struct ScanOrchestrator<C, I, S> {
    detector: ScreenDetector,
    capture: C,
    illumination: I,
    sink: S,
    phase: ScanPhase,
}

impl<C, I, S> ScanOrchestrator<C, I, S>
where
    C: CaptureSource,
    I: Illumination,
    S: ScanSink,
{
    pub fn new(config: ScanConfig, capture: C, illumination: I, sink: S) -> Self {
        Self {
            detector: ScreenDetector::new(config),
            capture,
            illumination,
            sink,
            phase: ScanPhase::Idle,
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn config(&self) -> &ScanConfig {
        self.detector.config()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (C, I, S) {
        (self.capture, self.illumination, self.sink)
    }

    /// Scans `screens` in order. Previously known positions are cleared first.
    pub async fn run(
        &mut self,
        screens: &[ScreenId],
        stop: &watch::Receiver<bool>,
    ) -> Result<ScanSummary, ScanError> {
        if screens.is_empty() {
            return Err(ScanError::NoScreens);
        }
        info!(screens = screens.len(), "starting scan");

        let result = self.scan(screens, stop).await;
        if let Err(err) = &result {
            warn!(error = %err, phase = %self.phase, "scan aborted");
            if let Err(off_err) = self.illumination.all_off().await {
                warn!(error = %off_err, "could not switch screens off after failed scan");
            }
        }
        self.enter(ScanPhase::Idle);

        if let Ok(summary) = &result {
            info!(
                detected = summary.detected_count(),
                total = summary.outcomes.len(),
                cancelled = summary.cancelled,
                "scan finished"
            );
        }
        result
    }

    async fn scan(
        &mut self,
        screens: &[ScreenId],
        stop: &watch::Receiver<bool>,
    ) -> Result<ScanSummary, ScanError> {
        self.sink.clear_positions().await;

        // --- 1. Reference ---
        self.enter(ScanPhase::ReferenceCapture);
        self.illumination.all_off().await?;
        sleep(self.config().reference_settle()).await;
        let reference = self.capture_averaged().await?;

        // --- 2. One Screen At A Time ---
        let mut outcomes = Vec::with_capacity(screens.len());
        for (index, screen) in screens.iter().enumerate() {
            if *stop.borrow() {
                info!(remaining = screens.len() - index, "scan stopped");
                self.illumination.all_off().await?;
                let cancelled = DetectionReport::NotDetected(MissReason::Cancelled);
                for rest in &screens[index..] {
                    self.sink.report(rest, &cancelled).await;
                    outcomes.push((rest.clone(), cancelled));
                }
                return Ok(ScanSummary {
                    outcomes,
                    cancelled: true,
                });
            }

            let report = self.probe(screen, &reference).await?;
            outcomes.push((screen.clone(), report));
        }

        Ok(ScanSummary {
            outcomes,
            cancelled: false,
        })
    }

    async fn probe(
        &mut self,
        screen: &ScreenId,
        reference: &Frame,
    ) -> Result<DetectionReport, ScanError> {
        self.enter(ScanPhase::Flash);
        self.illumination.set_color(screen, Rgb::WHITE).await?;

        self.enter(ScanPhase::Settle);
        sleep(self.config().flash_settle()).await;

        self.enter(ScanPhase::Capture);
        let probe = self.capture_averaged().await?;

        self.enter(ScanPhase::Detect);
        let report = self.detector.detect(reference, &probe)?;
        match &report {
            DetectionReport::Detected(d) => {
                info!(
                    %screen,
                    x = d.center.x,
                    y = d.center.y,
                    pixels = d.pixel_count,
                    "screen detected"
                )
            }
            DetectionReport::NotDetected(reason) => warn!(%screen, ?reason, "screen not detected"),
        }

        self.enter(ScanPhase::Report);
        self.sink.report(screen, &report).await;

        self.enter(ScanPhase::Off);
        self.illumination.set_color(screen, Rgb::BLACK).await?;

        self.enter(ScanPhase::Cooldown);
        sleep(self.config().cooldown()).await;

        Ok(report)
    }

    /// Captures `frames_to_average` frames, `capture_spacing` apart, and averages them.
    async fn capture_averaged(&mut self) -> Result<Frame, ScanError> {
        let count = self.config().frames_to_average.max(1);
        let spacing = self.config().capture_spacing();
        let mut frames = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                sleep(spacing).await;
            }
            frames.push(self.capture.capture().await?);
        }
        average_frames(&frames)
    }

    fn enter(&mut self, phase: ScanPhase) {
        debug!(from = %self.phase, to = %phase, "scan phase");
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::geometry::point_from_unit_square;
    use crate::registry::ScreenRegistry;
    use crate::test_support::{Command, FakeStage, PixelBox, RecordingSink, black_frame};
    use std::time::Duration;
    use tokio::time::Instant;

    const W: u32 = 320;
    const H: u32 = 240;

    fn three_screens() -> FakeStage {
        FakeStage::new(
            W,
            H,
            &[
                ("a", PixelBox::new(20, 30, 40, 30)),
                ("b", PixelBox::new(140, 100, 40, 30)),
                ("c", PixelBox::new(250, 180, 40, 30)),
            ],
        )
    }

    fn idle_stop() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test(start_paused = true)]
    async fn finds_every_screen_in_order() {
        let stage = three_screens();
        let ids = stage.ids();
        let mut scan = ScanOrchestrator::new(
            ScanConfig::default(),
            stage.clone(),
            stage.clone(),
            RecordingSink::default(),
        );

        let start = Instant::now();
        let summary = scan.run(&ids, &idle_stop()).await.unwrap();

        assert!(!summary.cancelled);
        assert_eq!(summary.detected_count(), 3);
        assert_eq!(scan.phase(), ScanPhase::Idle);

        let expected = [("a", 40.0, 45.0), ("b", 160.0, 115.0), ("c", 270.0, 195.0)];
        for ((id, report), (name, x, y)) in summary.outcomes.iter().zip(expected) {
            assert_eq!(id.as_str(), name);
            let center = point_from_unit_square(report.detection().unwrap().center, W, H);
            assert!((center.x - x).abs() < 1.5 && (center.y - y).abs() < 1.5, "{name}: {center:?}");
        }

        let sink = scan.sink();
        assert_eq!(sink.clears, 1);
        assert_eq!(sink.reports.len(), 3);
        assert_eq!(stage.most_lit_at_capture(), 1);
        assert_eq!(stage.lit(), 0);
        // 3 reference frames plus 3 per screen.
        assert_eq!(stage.captures(), 12);

        // 500 + 2*40 for the reference, then (300 + 2*40 + 200) per screen.
        assert!(Instant::now() - start >= Duration::from_millis(580 + 3 * 580));
    }

    #[tokio::test(start_paused = true)]
    async fn commands_follow_flash_then_off() {
        let stage = three_screens();
        let ids = stage.ids();
        let mut scan = ScanOrchestrator::new(
            ScanConfig::default(),
            stage.clone(),
            stage.clone(),
            RecordingSink::default(),
        );
        scan.run(&ids, &idle_stop()).await.unwrap();

        let mut expected = vec![Command::AllOff];
        for id in &ids {
            expected.push(Command::Set(id.clone(), Rgb::WHITE));
            expected.push(Command::Set(id.clone(), Rgb::BLACK));
        }
        assert_eq!(stage.commands(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn screen_out_of_view_does_not_abort() {
        let stage = FakeStage::new(
            W,
            H,
            &[
                ("near", PixelBox::new(50, 50, 40, 30)),
                ("far", PixelBox::new(150, 150, 3, 3)),
            ],
        );
        let ids = vec![ScreenId::new("far"), ScreenId::new("near"), ScreenId::new("ghost")];
        let mut scan = ScanOrchestrator::new(
            ScanConfig::default(),
            stage.clone(),
            stage.clone(),
            RecordingSink::default(),
        );
        let summary = scan.run(&ids, &idle_stop()).await.unwrap();

        assert!(matches!(
            summary.report_for(&ScreenId::new("far")),
            Some(DetectionReport::NotDetected(MissReason::BlobTooSmall { .. }))
        ));
        assert!(summary.report_for(&ScreenId::new("near")).unwrap().is_detected());
        assert_eq!(
            summary.report_for(&ScreenId::new("ghost")),
            Some(&DetectionReport::NotDetected(MissReason::NoLitPixels))
        );
        assert_eq!(scan.phase(), ScanPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_between_screens_cancels_the_rest() {
        let stage = three_screens();
        let ids = stage.ids();
        let (tx, rx) = watch::channel(false);
        let sink = RecordingSink {
            stop_after: Some((1, tx)),
            ..RecordingSink::default()
        };
        let mut scan =
            ScanOrchestrator::new(ScanConfig::default(), stage.clone(), stage.clone(), sink);

        let summary = scan.run(&ids, &rx).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.outcomes.len(), 3);
        assert!(summary.outcomes[0].1.is_detected());
        for (_, report) in &summary.outcomes[1..] {
            assert_eq!(*report, DetectionReport::NotDetected(MissReason::Cancelled));
        }
        assert_eq!(scan.sink().reports.len(), 3);
        assert_eq!(stage.commands().last(), Some(&Command::AllOff));
        assert_eq!(stage.lit(), 0);
        assert_eq!(scan.phase(), ScanPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_screen_list_is_rejected() {
        let stage = three_screens();
        let mut scan = ScanOrchestrator::new(
            ScanConfig::default(),
            stage.clone(),
            stage.clone(),
            RecordingSink::default(),
        );
        let err = scan.run(&[], &idle_stop()).await.unwrap_err();
        assert!(matches!(err, ScanError::NoScreens));
        assert!(stage.commands().is_empty());
    }

    /// Serves reference-sized frames, then switches resolution mid-scan.
    struct ResizingCamera {
        served: usize,
    }

    impl CaptureSource for ResizingCamera {
        async fn capture(&mut self) -> Result<Frame, ScanError> {
            self.served += 1;
            Ok(if self.served <= 3 { black_frame(W, H) } else { black_frame(H, W) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_change_aborts_with_screens_off() {
        let stage = three_screens();
        let ids = stage.ids();
        let mut scan = ScanOrchestrator::new(
            ScanConfig::default(),
            ResizingCamera { served: 0 },
            stage.clone(),
            RecordingSink::default(),
        );
        let err = scan.run(&ids, &idle_stop()).await.unwrap_err();
        assert!(matches!(err, ScanError::DimensionMismatch { .. }));
        assert_eq!(stage.commands().last(), Some(&Command::AllOff));
        assert_eq!(stage.lit(), 0);
        assert_eq!(scan.phase(), ScanPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn registry_receives_positions() {
        let stage = three_screens();
        let mut registry = ScreenRegistry::new();
        for id in stage.ids() {
            registry.register(id);
        }
        let ids = registry.ids();
        let mut scan = ScanOrchestrator::new(ScanConfig::default(), stage.clone(), stage, registry);
        scan.run(&ids, &idle_stop()).await.unwrap();

        let (_, _, registry) = scan.into_parts();
        assert_eq!(registry.placements().len(), 3);
    }
}
