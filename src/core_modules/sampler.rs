// THEORY:
// During playback each physical screen shows the color of "its" patch of the
// virtual animation canvas. The sampler reads that patch:
//
// - With a known area, every canvas pixel inside the denormalized rectangle is
//   averaged with a radial Gaussian weight, `exp(-d^2)`, where `d` is the pixel
//   center's distance from the rectangle center measured in half-extents (so
//   `d = 1` on the edge midpoints). The middle of the patch dominates, which
//   keeps a screen from flickering when an animation edge grazes its border.
// - With only a center point, the nearest single canvas pixel is used.
//
// The result is then dimmed by the global brightness factor. The computation is
// a pure function of its inputs: the same canvas always yields bit-identical
// colors, so the change filter downstream never sees phantom updates.

use crate::core_modules::geometry::{
    NormalizedPoint, NormalizedRect, point_from_unit_square, rect_from_unit_square,
};
use crate::core_modules::pixel::pixel::Rgb;
use image::RgbaImage;

/// Where a screen reads its color from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPlacement {
    pub center: NormalizedPoint,
    pub area: Option<NormalizedRect>,
}

/// Weighted color of `placement` on `canvas`, scaled by `brightness`.
pub fn sample_color(canvas: &RgbaImage, placement: &ScreenPlacement, brightness: f32) -> Rgb {
    let raw = placement
        .area
        .and_then(|area| sample_area(canvas, area))
        .unwrap_or_else(|| sample_point(canvas, placement.center));
    raw.scaled(brightness)
}

/// Radially weighted mean over the rectangle, or `None` when it covers no pixel.
pub fn sample_area(canvas: &RgbaImage, area: NormalizedRect) -> Option<Rgb> {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let rect = rect_from_unit_square(area, width, height);

    let x0 = rect.x.floor().max(0.0) as u32;
    let y0 = rect.y.floor().max(0.0) as u32;
    let x1 = ((rect.x + rect.width).ceil().max(0.0) as u32).min(width);
    let y1 = ((rect.y + rect.height).ceil().max(0.0) as u32).min(height);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let cx = rect.x + rect.width / 2.0;
    let cy = rect.y + rect.height / 2.0;
    let half_w = (rect.width / 2.0).max(f32::EPSILON);
    let half_h = (rect.height / 2.0).max(f32::EPSILON);

    let mut total = 0.0f64;
    let mut sums = [0.0f64; 3];
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = (x as f32 + 0.5 - cx) / half_w;
            let dy = (y as f32 + 0.5 - cy) / half_h;
            let weight = (-(dx * dx + dy * dy) as f64).exp();
            let px = canvas.get_pixel(x, y).0;
            sums[0] += px[0] as f64 * weight;
            sums[1] += px[1] as f64 * weight;
            sums[2] += px[2] as f64 * weight;
            total += weight;
        }
    }
    if total <= 0.0 {
        return None;
    }

    let channel = |sum: f64| (sum / total).round().clamp(0.0, 255.0) as u8;
    Some(Rgb::new(channel(sums[0]), channel(sums[1]), channel(sums[2])))
}

/// The canvas pixel nearest to `center`.
pub fn sample_point(canvas: &RgbaImage, center: NormalizedPoint) -> Rgb {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return Rgb::BLACK;
    }
    let p = point_from_unit_square(center, width, height);
    let pick = |v: f32, len: u32| (v.floor().max(0.0) as u32).min(len - 1);
    let px = canvas.get_pixel(pick(p.x, width), pick(p.y, height)).0;
    Rgb::new(px[0], px[1], px[2])
}
