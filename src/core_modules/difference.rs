// THEORY:
// The difference stage turns a (reference, probe) pair of frames into a single
// question per pixel: "how much brighter did this spot get?"
//
// 1.  **Luminance Delta**: Each pixel is reduced to its Rec. 601 luminance and the
//     reference is subtracted from the probe. Only positive deltas survive; a spot
//     that got darker cannot be the screen we just turned on.
// 2.  **Separable Gaussian Blur**: Camera noise and LCD sub-pixel dithering make a
//     lit screen look speckled at the pixel level. A 1-D Gaussian is run along rows
//     and then along columns (equivalent to a 2-D Gaussian at a fraction of the
//     cost) with nearest-edge replication at the borders.
//
// The raw map is kept alongside the blurred one: the edge refiner wants the
// unblurred values, while thresholding and centroid weighting use the blurred.

use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::ScanError;

pub type Difference = f32;

/// Per-pixel non-negative luminance increase between two frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<Difference>,
}

impl DifferenceMap {
    pub fn new(width: u32, height: u32, values: Vec<Difference>) -> Self {
        debug_assert_eq!(values.len(), width as usize * height as usize);
        Self {
            width,
            height,
            values,
        }
    }

    /// `max(0, luminance(probe) - luminance(reference))` for every pixel.
    pub fn compute(reference: &Frame, probe: &Frame) -> Result<Self, ScanError> {
        reference.check_geometry(probe)?;
        let values = reference
            .pixels()
            .zip(probe.pixels())
            .map(|(before, after): (Pixel, Pixel)| {
                (after.luminance() - before.luminance()).max(0.0) as Difference
            })
            .collect();
        Ok(Self::new(reference.width(), reference.height(), values))
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Difference {
        self.values[y as usize * self.width as usize + x as usize]
    }

    pub fn max_value(&self) -> Difference {
        self.values.iter().copied().fold(0.0, Difference::max)
    }

    /// Separable Gaussian blur with radius `radius`. A zero radius returns a copy.
    pub fn blurred(&self, radius: usize) -> DifferenceMap {
        if radius == 0 || self.values.is_empty() {
            return self.clone();
        }
        let kernel = gaussian_kernel(radius);
        let w = self.width as usize;
        let h = self.height as usize;

        // --- 1. Horizontal pass ---
        let mut horizontal = vec![0.0; self.values.len()];
        for y in 0..h {
            let row = &self.values[y * w..(y + 1) * w];
            for x in 0..w {
                horizontal[y * w + x] = convolve_at(&kernel, radius, x, w, |i| row[i]);
            }
        }

        // --- 2. Vertical pass ---
        let mut vertical = vec![0.0; self.values.len()];
        for x in 0..w {
            for y in 0..h {
                vertical[y * w + x] = convolve_at(&kernel, radius, y, h, |i| horizontal[i * w + x]);
            }
        }

        DifferenceMap::new(self.width, self.height, vertical)
    }
}

/// Normalized 1-D Gaussian of `2 * radius + 1` taps with `sigma = radius / 2`.
pub fn gaussian_kernel(radius: usize) -> Vec<f32> {
    if radius == 0 {
        return vec![1.0];
    }
    let sigma = radius as f32 / 2.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let r = radius as i64;
    let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// One output tap of a 1-D convolution over `len` samples, clamping indices at the edges.
#[inline]
fn convolve_at(
    kernel: &[f32],
    radius: usize,
    center: usize,
    len: usize,
    sample: impl Fn(usize) -> f32,
) -> f32 {
    let last = len as i64 - 1;
    kernel
        .iter()
        .enumerate()
        .map(|(k, weight)| {
            let idx = (center as i64 + k as i64 - radius as i64).clamp(0, last) as usize;
            weight * sample(idx)
        })
        .sum()
}
