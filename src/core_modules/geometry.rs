// THEORY:
// Camera frames come in whatever orientation the controller happened to be held
// in, while the animation canvas is a square. The geometry module bridges the two
// with an aspect-correct "unit square": the longer image side spans [0, 1] and
// the shorter side is centered inside it with equal padding on both ends, so a
// square screen stays square after normalization.
//
// `to_unit_square` and `from_unit_square` are exact inverses up to floating-point
// rounding. Clamping is a separate, explicit step applied when a detection is
// written out.

use serde::{Deserialize, Serialize};

/// A point in the aspect-corrected unit square.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

/// A rectangle in the aspect-corrected unit square, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

/// A point in raw image pixel space (sub-pixel precision).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

/// A rectangle in raw image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Allowed side lengths of a normalized detection area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaBounds {
    pub min: f32,
    pub max: f32,
}

/// Scale and padding that place a `width` x `height` image in the unit square.
struct UnitMapping {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl UnitMapping {
    fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let longest = w.max(h).max(1.0);
        // Shorter side fills `short / long` of the square; the rest is split evenly.
        Self {
            scale: longest,
            pad_x: (1.0 - w / longest) / 2.0,
            pad_y: (1.0 - h / longest) / 2.0,
        }
    }
}

pub fn point_to_unit_square(p: PixelPoint, width: u32, height: u32) -> NormalizedPoint {
    let m = UnitMapping::new(width, height);
    NormalizedPoint {
        x: p.x / m.scale + m.pad_x,
        y: p.y / m.scale + m.pad_y,
    }
}

pub fn point_from_unit_square(p: NormalizedPoint, width: u32, height: u32) -> PixelPoint {
    let m = UnitMapping::new(width, height);
    PixelPoint {
        x: (p.x - m.pad_x) * m.scale,
        y: (p.y - m.pad_y) * m.scale,
    }
}

pub fn rect_to_unit_square(r: PixelRect, width: u32, height: u32) -> NormalizedRect {
    let m = UnitMapping::new(width, height);
    NormalizedRect {
        x: r.x / m.scale + m.pad_x,
        y: r.y / m.scale + m.pad_y,
        width: r.width / m.scale,
        height: r.height / m.scale,
    }
}

pub fn rect_from_unit_square(r: NormalizedRect, width: u32, height: u32) -> PixelRect {
    let m = UnitMapping::new(width, height);
    PixelRect {
        x: (r.x - m.pad_x) * m.scale,
        y: (r.y - m.pad_y) * m.scale,
        width: r.width * m.scale,
        height: r.height * m.scale,
    }
}

/// Forces a rectangle into the unit square with side lengths inside `bounds`.
///
/// Sides are clamped first, then the origin is clamped so the rectangle does not
/// spill past the far edge. Non-finite inputs collapse to the nearest bound.
pub fn clamp_rect(r: NormalizedRect, bounds: AreaBounds) -> NormalizedRect {
    let side = |v: f32| {
        if v.is_nan() {
            bounds.min
        } else {
            v.clamp(bounds.min, bounds.max)
        }
    };
    let width = side(r.width);
    let height = side(r.height);
    let origin = |v: f32, size: f32| {
        let limit = (1.0 - size).max(0.0);
        if v.is_nan() { 0.0 } else { v.clamp(0.0, limit) }
    };
    NormalizedRect {
        x: origin(r.x, width),
        y: origin(r.y, height),
        width,
        height,
    }
}

pub fn clamp_point(p: NormalizedPoint) -> NormalizedPoint {
    let unit = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    NormalizedPoint {
        x: unit(p.x),
        y: unit(p.y),
    }
}
