// THEORY:
// A `Frame` is one camera capture: width, height and a dense, row-major RGBA
// buffer. Like the other data containers of the engine it is "dumb" and
// immutable once built; it only knows how to hand out its pixels and how to be
// pooled with siblings of the same geometry.
//
// Averaging (`average_frames`) is the first line of noise reduction. Sensor
// noise is independent between captures taken tens of milliseconds apart, so a
// per-channel mean of a few frames flattens it before any differencing happens.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::error::ScanError;
use image::RgbaImage;

/// An immutable RGBA camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps a raw RGBA buffer. The buffer must hold exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ScanError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ScanError::BufferSize {
                width,
                height,
                len: data.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with a single color.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&[pixel.red, pixel.green, pixel.blue, pixel.alpha]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The pixel at `(x, y)`. Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Pixel::from(&self.data[i..i + CHANNELS])
    }

    /// Iterates pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data.chunks_exact(CHANNELS).map(Pixel::from)
    }

    pub fn same_geometry(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub(crate) fn check_geometry(&self, other: &Frame) -> Result<(), ScanError> {
        if self.same_geometry(other) {
            Ok(())
        } else {
            Err(ScanError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: other.width,
                height: other.height,
            })
        }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// Per-channel arithmetic mean of `frames`, rounded to the nearest integer.
///
/// All frames must share the first frame's geometry.
pub fn average_frames(frames: &[Frame]) -> Result<Frame, ScanError> {
    let first = frames.first().ok_or(ScanError::EmptyFrameSet)?;
    if frames.len() == 1 {
        return Ok(first.clone());
    }
    for frame in &frames[1..] {
        first.check_geometry(frame)?;
    }

    let count = frames.len() as u32;
    let mut sums = vec![0u32; first.data.len()];
    for frame in frames {
        for (sum, &byte) in sums.iter_mut().zip(&frame.data) {
            *sum += byte as u32;
        }
    }

    // Integer round-half-up: (sum + n/2) / n never exceeds 255.
    let data = sums
        .into_iter()
        .map(|sum| ((sum + count / 2) / count) as u8)
        .collect();

    Ok(Frame {
        width: first.width,
        height: first.height,
        data,
    })
}
