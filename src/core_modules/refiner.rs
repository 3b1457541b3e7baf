// THEORY:
// Blur and morphology are good at deciding *whether* a screen is there but they
// round its corners and nibble its edges. The refiner recovers what they took:
//
// 1.  **Edge Recovery**: The blob's tight box is padded by a few pixels to form a
//     search window. Each side is then pushed outward on its own: scanning from
//     the outer edge of the window toward the blob, the first column (or row)
//     where any pixel inside the blob's span exceeds the edge threshold on the
//     *unblurred* difference becomes the new side. Sides never move inward.
// 2.  **Weighted Centroid**: The center is the average of all blob pixel centers
//     weighted by the blurred difference. A lit screen is rarely evenly bright
//     (vignetting, viewing angle), and weighting leans the center toward where the
//     eye perceives the screen to be. A blob with zero total weight falls back to
//     the geometric center of the refined box.

use crate::core_modules::difference::DifferenceMap;
use crate::core_modules::geometry::PixelPoint;
use crate::core_modules::smart_blob::{Blob, BlobMeasurement, BoundingBox};

/// Edge recovery parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSearch {
    pub padding: u32,
    pub threshold: f32,
}

/// Pushes each side of `blob`'s box outward to the outermost strong raw edge.
pub fn refine_bounding_box(blob: &Blob, raw: &DifferenceMap, search: EdgeSearch) -> BoundingBox {
    let tight = blob.bounding_box;
    let window = tight.padded(search.padding, raw.width, raw.height);
    let strong = |x: u32, y: u32| raw.get(x, y) > search.threshold;

    let column_hit = |x: u32| (tight.min_y..=tight.max_y).any(|y| strong(x, y));
    let row_hit = |y: u32| (tight.min_x..=tight.max_x).any(|x| strong(x, y));

    BoundingBox {
        min_x: (window.min_x..tight.min_x)
            .find(|&x| column_hit(x))
            .unwrap_or(tight.min_x),
        max_x: (tight.max_x + 1..=window.max_x)
            .rev()
            .find(|&x| column_hit(x))
            .unwrap_or(tight.max_x),
        min_y: (window.min_y..tight.min_y)
            .find(|&y| row_hit(y))
            .unwrap_or(tight.min_y),
        max_y: (tight.max_y + 1..=window.max_y)
            .rev()
            .find(|&y| row_hit(y))
            .unwrap_or(tight.max_y),
    }
}

/// Difference-weighted mean of the blob's pixel centers.
pub fn weighted_centroid(
    blob: &Blob,
    weights: &DifferenceMap,
    fallback: &BoundingBox,
) -> PixelPoint {
    let mut total = 0.0f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;

    for p in &blob.pixels {
        let w = weights.get(p.x, p.y) as f64;
        total += w;
        sum_x += (p.x as f64 + 0.5) * w;
        sum_y += (p.y as f64 + 0.5) * w;
    }

    if total <= 0.0 {
        return fallback.center();
    }
    PixelPoint {
        x: (sum_x / total) as f32,
        y: (sum_y / total) as f32,
    }
}

/// Refined box plus weighted centroid for one blob.
pub fn measure_blob(
    blob: &Blob,
    raw: &DifferenceMap,
    blurred: &DifferenceMap,
    search: EdgeSearch,
) -> BlobMeasurement {
    let bounding_box = refine_bounding_box(blob, raw, search);
    let centroid = weighted_centroid(blob, blurred, &bounding_box);
    BlobMeasurement {
        bounding_box,
        centroid,
        pixel_count: blob.size(),
    }
}
