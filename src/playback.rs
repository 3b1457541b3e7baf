// THEORY:
// Playback turns an animation into per-screen colors, live:
//
// 1.  **Frame Pacing**: `FrameClock` admits at most one frame per
//     `1 / target_fps`. A frame that arrives early is dropped, never queued, so
//     a slow relay can't build up a backlog of stale colors.
// 2.  **Sampling**: each admitted frame renders the square canvas for the
//     elapsed playback time and samples every located screen's patch.
// 3.  **Change Suppression**: `ColorChangeFilter` remembers the last color sent
//     to each screen and only lets a new one through when it moved by at least
//     `color_change_threshold` (Manhattan RGB distance). A screen with no
//     history always gets its first color.
// 4.  **Dispatch**: the surviving colors for one frame are sent concurrently and
//     the loop waits for all of them before pacing the next frame.

use crate::config::ScanConfig;
use crate::core_modules::pixel::pixel::{Rgb, color_diff};
use crate::core_modules::sampler::{ScreenPlacement, sample_color};
use crate::interfaces::{AnimationSource, Illumination};
use crate::registry::ScreenId;
use futures::future::join_all;
use image::RgbaImage;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Fixed-rate frame gate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// `true` when a frame at `now` is due; the frame is then counted as taken.
    pub fn accept(&mut self, now: Instant) -> bool {
        let Some(last) = self.last else {
            self.last = Some(now);
            return true;
        };
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.interval {
            return false;
        }
        if self.interval.is_zero() {
            self.last = Some(now);
            return true;
        }
        // Stay on the frame grid, but never owe more than one frame.
        let behind = elapsed.as_nanos() % self.interval.as_nanos();
        self.last = Some(now - Duration::from_nanos(behind as u64));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Per-screen memory of the last color that went out.
#[derive(Debug, Clone, Default)]
pub struct ColorChangeFilter {
    threshold: u32,
    sent: HashMap<ScreenId, Rgb>,
}

impl ColorChangeFilter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            sent: HashMap::new(),
        }
    }

    /// Decides whether `color` is worth sending and, if so, remembers it.
    pub fn should_send(&mut self, screen: &ScreenId, color: Rgb) -> bool {
        match self.sent.get(screen) {
            Some(&previous) if color_diff(previous, color) < self.threshold => false,
            _ => {
                self.sent.insert(screen.clone(), color);
                true
            }
        }
    }

    pub fn last_sent(&self, screen: &ScreenId) -> Option<Rgb> {
        self.sent.get(screen).copied()
    }

    /// Drops the history of one screen so its next color always goes out.
    pub fn forget(&mut self, screen: &ScreenId) {
        self.sent.remove(screen);
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

/// Counters for one playback run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub frames: u64,
    pub dropped: u64,
    pub sent: u64,
    pub suppressed: u64,
    pub failed: u64,
}

/// Animation-to-screens color loop.
#[derive(Debug, Clone)]
pub struct PlaybackLoop {
    clock: FrameClock,
    filter: ColorChangeFilter,
    brightness: f32,
    canvas_size: u32,
    stats: PlaybackStats,
}

impl PlaybackLoop {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            clock: FrameClock::new(config.frame_interval()),
            filter: ColorChangeFilter::new(config.color_change_threshold),
            brightness: config.brightness,
            canvas_size: config.canvas_size,
            stats: PlaybackStats::default(),
        }
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness.clamp(0.0, 1.0);
    }

    /// Samples one canvas and returns only the colors that changed enough to send.
    pub fn frame_updates(
        &mut self,
        canvas: &RgbaImage,
        placements: &[(ScreenId, ScreenPlacement)],
    ) -> Vec<(ScreenId, Rgb)> {
        let mut updates = Vec::new();
        for (screen, placement) in placements {
            let color = sample_color(canvas, placement, self.brightness);
            if self.filter.should_send(screen, color) {
                updates.push((screen.clone(), color));
            } else {
                self.stats.suppressed += 1;
            }
        }
        updates
    }

    /// Paces, renders and samples one frame. `None` when the clock drops it.
    pub fn on_frame<A: AnimationSource>(
        &mut self,
        now: Instant,
        seconds: f64,
        animation: &mut A,
        placements: &[(ScreenId, ScreenPlacement)],
    ) -> Option<Vec<(ScreenId, Rgb)>> {
        if !self.clock.accept(now) {
            self.stats.dropped += 1;
            return None;
        }
        self.stats.frames += 1;
        let canvas = animation.render(seconds, self.canvas_size);
        Some(self.frame_updates(&canvas, placements))
    }

    /// Plays until `stop` turns `true` or its sender goes away.
    ///
    /// A failed send is logged and that screen's history is dropped so the
    /// next frame retries it; playback itself keeps going.
    pub async fn run<A, I>(
        &mut self,
        animation: &mut A,
        illumination: &I,
        placements: &[(ScreenId, ScreenPlacement)],
        mut stop: watch::Receiver<bool>,
    ) -> PlaybackStats
    where
        A: AnimationSource,
        I: Illumination,
    {
        if placements.is_empty() {
            warn!("no located screens, nothing to play");
        }
        info!(
            screens = placements.len(),
            fps = 1.0 / self.clock.interval.as_secs_f64(),
            "playback started"
        );

        self.clock.reset();
        let mut ticker = interval(self.clock.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let started = Instant::now();

        while !*stop.borrow() {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let now = Instant::now();
            let seconds = now.duration_since(started).as_secs_f64();
            let Some(updates) = self.on_frame(now, seconds, animation, placements) else {
                continue;
            };
            if updates.is_empty() {
                continue;
            }

            let results = join_all(
                updates
                    .iter()
                    .map(|(screen, color)| illumination.set_color(screen, *color)),
            )
            .await;
            for ((screen, _), result) in updates.iter().zip(results) {
                match result {
                    Ok(()) => self.stats.sent += 1,
                    Err(err) => {
                        warn!(%screen, error = %err, "color update failed");
                        self.filter.forget(screen);
                        self.stats.failed += 1;
                    }
                }
            }
            debug!(seconds, sent = updates.len(), "frame dispatched");
        }

        info!(
            frames = self.stats.frames,
            sent = self.stats.sent,
            suppressed = self.stats.suppressed,
            "playback stopped"
        );
        self.stats
    }
}
