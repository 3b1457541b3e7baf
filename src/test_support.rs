// Synthetic frames and fake collaborators shared by the unit tests.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::{CHANNELS, Rgb};
use crate::core_modules::threshold::{BinaryMask, LIT};
use crate::error::ScanError;
use crate::interfaces::{AnimationSource, CaptureSource, Illumination, ScanSink};
use crate::pipeline::DetectionReport;
use crate::registry::ScreenId;
use image::{Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

pub fn black_frame(width: u32, height: u32) -> Frame {
    frame_with_boxes(width, height, &[], 0)
}

/// Opaque black frame with each box painted gray `value`.
pub fn frame_with_boxes(width: u32, height: u32, boxes: &[PixelBox], value: u8) -> Frame {
    let mut data = vec![0u8; width as usize * height as usize * CHANNELS];
    for px in data.chunks_exact_mut(CHANNELS) {
        px[3] = 255;
    }
    for b in boxes {
        for y in b.y..(b.y + b.height).min(height) {
            for x in b.x..(b.x + b.width).min(width) {
                let i = (y as usize * width as usize + x as usize) * CHANNELS;
                data[i..i + 3].fill(value);
            }
        }
    }
    Frame::new(width, height, data).unwrap()
}

/// Mask drawn as ASCII rows: `#` is lit, anything else is not.
pub fn mask_from(rows: &[&str]) -> BinaryMask {
    let mut mask = BinaryMask::new(rows[0].len() as u32, rows.len() as u32);
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            if c == '#' {
                mask.set(x as u32, y as u32, LIT);
            }
        }
    }
    mask
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(ScreenId, Rgb),
    AllOff,
    All(Rgb),
}

#[derive(Debug, Default)]
struct StageState {
    lit: HashSet<ScreenId>,
    commands: Vec<Command>,
    captures: usize,
    most_lit_at_capture: usize,
}

/// A room of screens in front of a camera. Lit screens appear as bright boxes.
#[derive(Debug, Clone)]
pub struct FakeStage {
    width: u32,
    height: u32,
    screens: Arc<HashMap<ScreenId, PixelBox>>,
    state: Arc<Mutex<StageState>>,
}

impl FakeStage {
    pub fn new(width: u32, height: u32, screens: &[(&str, PixelBox)]) -> Self {
        Self {
            width,
            height,
            screens: Arc::new(screens.iter().map(|(id, b)| (ScreenId::new(*id), *b)).collect()),
            state: Arc::default(),
        }
    }

    pub fn ids(&self) -> Vec<ScreenId> {
        let mut ids: Vec<ScreenId> = self.screens.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn lit(&self) -> usize {
        self.state.lock().unwrap().lit.len()
    }

    pub fn captures(&self) -> usize {
        self.state.lock().unwrap().captures
    }

    pub fn most_lit_at_capture(&self) -> usize {
        self.state.lock().unwrap().most_lit_at_capture
    }

    fn snapshot(&self) -> Frame {
        let mut state = self.state.lock().unwrap();
        state.captures += 1;
        state.most_lit_at_capture = state.most_lit_at_capture.max(state.lit.len());
        let boxes: Vec<PixelBox> = state
            .lit
            .iter()
            .filter_map(|id| self.screens.get(id).copied())
            .collect();
        frame_with_boxes(self.width, self.height, &boxes, 255)
    }

    fn record(&self, command: Command) {
        let mut state = self.state.lock().unwrap();
        match &command {
            Command::Set(id, color) if *color == Rgb::BLACK => {
                state.lit.remove(id);
            }
            Command::Set(id, _) => {
                state.lit.insert(id.clone());
            }
            Command::AllOff | Command::All(Rgb::BLACK) => state.lit.clear(),
            Command::All(_) => {
                let all: Vec<ScreenId> = self.screens.keys().cloned().collect();
                state.lit.extend(all);
            }
        }
        state.commands.push(command);
    }
}

impl CaptureSource for FakeStage {
    async fn capture(&mut self) -> Result<Frame, ScanError> {
        Ok(self.snapshot())
    }
}

impl Illumination for FakeStage {
    async fn set_color(&self, screen: &ScreenId, color: Rgb) -> Result<(), ScanError> {
        self.record(Command::Set(screen.clone(), color));
        Ok(())
    }

    async fn all_off(&self) -> Result<(), ScanError> {
        self.record(Command::AllOff);
        Ok(())
    }

    async fn all_color(&self, color: Rgb) -> Result<(), ScanError> {
        self.record(Command::All(color));
        Ok(())
    }
}

/// Records every report; optionally raises the stop flag after `stop_after` reports.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub reports: Vec<(ScreenId, DetectionReport)>,
    pub clears: usize,
    pub stop_after: Option<(usize, watch::Sender<bool>)>,
}

impl ScanSink for RecordingSink {
    async fn report(&mut self, screen: &ScreenId, report: &DetectionReport) {
        self.reports.push((screen.clone(), *report));
        if let Some((after, stop)) = &self.stop_after {
            if self.reports.len() >= *after {
                let _ = stop.send(true);
            }
        }
    }

    async fn clear_positions(&mut self) {
        self.clears += 1;
    }
}

/// A canvas of one solid color, optionally changing color at `switch_at` seconds.
#[derive(Debug, Clone)]
pub struct SolidAnimation {
    pub before: Rgb,
    pub after: Rgb,
    pub switch_at: f64,
    pub renders: usize,
}

impl SolidAnimation {
    pub fn steady(color: Rgb) -> Self {
        Self {
            before: color,
            after: color,
            switch_at: f64::INFINITY,
            renders: 0,
        }
    }
}

impl AnimationSource for SolidAnimation {
    fn render(&mut self, seconds: f64, size: u32) -> RgbaImage {
        self.renders += 1;
        let c = if seconds < self.switch_at { self.before } else { self.after };
        RgbaImage::from_pixel(size, size, Rgba([c.r, c.g, c.b, 255]))
    }
}
