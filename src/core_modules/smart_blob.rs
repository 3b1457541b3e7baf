// THEORY:
// The `SmartBlob` module holds the spatial data containers of the engine. A
// `Blob` is one maximal 4-connected island of lit mask pixels: the best guess for
// "the screen that is currently on". It is a stateless snapshot of a single probe
// and carries no memory of earlier scans.
//
// A `Blob` by itself is only a pixel set with a tight bounding box. The refiner
// turns it into a `BlobMeasurement`: a box pushed out to the true screen edges
// and a brightness-weighted center.

use crate::core_modules::geometry::{PixelPoint, PixelRect};

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Inclusive integer bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn around(p: Point) -> Self {
        Self {
            min_x: p.x,
            min_y: p.y,
            max_x: p.x,
            max_y: p.y,
        }
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Geometric center in continuous coordinates, where pixel `x` spans `[x, x + 1)`.
    pub fn center(&self) -> PixelPoint {
        PixelPoint {
            x: (self.min_x + self.max_x + 1) as f32 / 2.0,
            y: (self.min_y + self.max_y + 1) as f32 / 2.0,
        }
    }

    /// The box as a continuous rectangle covering whole pixels.
    pub fn to_pixel_rect(&self) -> PixelRect {
        PixelRect {
            x: self.min_x as f32,
            y: self.min_y as f32,
            width: self.width() as f32,
            height: self.height() as f32,
        }
    }

    /// Grows every side by `padding`, staying within a `width` x `height` image.
    pub fn padded(&self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            min_x: self.min_x.saturating_sub(padding),
            min_y: self.min_y.saturating_sub(padding),
            max_x: self.max_x.saturating_add(padding).min(width.saturating_sub(1)),
            max_y: self.max_y.saturating_add(padding).min(height.saturating_sub(1)),
        }
    }
}

/// One connected region of lit mask pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Every pixel of the region, in discovery order.
    pub pixels: Vec<Point>,
    /// Tight box around `pixels`.
    pub bounding_box: BoundingBox,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.pixels.len()
    }
}

/// A blob after edge refinement and centroid weighting, still in camera pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobMeasurement {
    pub bounding_box: BoundingBox,
    /// Brightness-weighted center in continuous coordinates (pixel centers at `x + 0.5`).
    pub centroid: PixelPoint,
    pub pixel_count: usize,
}
