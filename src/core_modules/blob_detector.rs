// THEORY:
// The `BlobDetector` is the spatial grouping stage. It walks the cleaned binary
// mask and answers: "which single island of light is the screen we flashed?"
//
// Key steps:
// 1.  **Seeding**: Every lit pixel not yet visited starts a new component.
// 2.  **Region Growing**: A breadth-first flood fill over the 4 direct neighbors
//     (no diagonals) collects the component. A shared `visited` grid guarantees
//     each pixel is claimed exactly once.
// 3.  **Selection**: All components are kept and the one with the most pixels
//     wins. Reflections and stray light produce smaller islands; the flashed
//     screen is assumed to dominate.
// 4.  **Stateless Utility**: Like the rest of the per-probe stages, the detector
//     has no memory between calls.

use crate::core_modules::smart_blob::{Blob, BoundingBox, Point};
use crate::core_modules::threshold::BinaryMask;

pub mod blob_detector {
    use super::*;
    use std::collections::VecDeque;

    /// Every 4-connected component of lit pixels, in scan order of their first pixel.
    pub fn find_blobs(mask: &BinaryMask) -> Vec<Blob> {
        let mut visited = vec![false; mask.data.len()];
        let mut blobs = Vec::new();

        for y in 0..mask.height {
            for x in 0..mask.width {
                let index = mask.index(x, y);
                if visited[index] || !mask.is_lit(x, y) {
                    continue;
                }
                blobs.push(grow_blob(mask, Point { x, y }, &mut visited));
            }
        }

        blobs
    }

    /// The component with the most pixels. Ties keep the one found first.
    pub fn largest_blob(mask: &BinaryMask) -> Option<Blob> {
        find_blobs(mask)
            .into_iter()
            .fold(None, |best: Option<Blob>, blob| match best {
                Some(b) if b.size() >= blob.size() => Some(b),
                _ => Some(blob),
            })
    }

    /// Breadth-first flood fill from `seed` over lit, unvisited 4-neighbors.
    fn grow_blob(mask: &BinaryMask, seed: Point, visited: &mut [bool]) -> Blob {
        let mut pixels = Vec::new();
        let mut bounding_box = BoundingBox::around(seed);
        let mut queue = VecDeque::from([seed]);
        visited[mask.index(seed.x, seed.y)] = true;

        let width = mask.width as i64;
        let height = mask.height as i64;

        while let Some(current) = queue.pop_front() {
            pixels.push(current);
            bounding_box.include(current);

            for (dx, dy) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                let nx = current.x as i64 + dx;
                let ny = current.y as i64 + dy;
                if nx < 0 || nx >= width || ny < 0 || ny >= height {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                let index = mask.index(nx, ny);
                if !visited[index] && mask.is_lit(nx, ny) {
                    visited[index] = true;
                    queue.push_back(Point { x: nx, y: ny });
                }
            }
        }

        Blob {
            pixels,
            bounding_box,
        }
    }
}
