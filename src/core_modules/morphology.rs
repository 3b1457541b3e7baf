// THEORY:
// Morphological closing (dilate, then erode) over the binary mask.
//
// Dilation lets every lit pixel claim its k x k neighborhood, which bridges the
// thin dark seams a bezel reflection or glare line cuts through a screen.
// Erosion then shaves the same margin back off, so the outline returns to its
// original size while the bridged seams stay closed. Windows are clamped at the
// image border (nearest-edge replication), matching the blur stage.
//
// Both passes are separable: a k x k max (or min) equals a horizontal k-wide max
// followed by a vertical one.

pub mod morphology {
    use crate::core_modules::threshold::BinaryMask;

    /// Each output pixel is the maximum of its k x k neighborhood.
    pub fn dilate(mask: &BinaryMask, kernel_size: usize) -> BinaryMask {
        apply(mask, kernel_size, u8::max)
    }

    /// Each output pixel is the minimum of its k x k neighborhood.
    pub fn erode(mask: &BinaryMask, kernel_size: usize) -> BinaryMask {
        apply(mask, kernel_size, u8::min)
    }

    /// Dilation followed by erosion.
    pub fn close(mask: &BinaryMask, kernel_size: usize) -> BinaryMask {
        erode(&dilate(mask, kernel_size), kernel_size)
    }

    fn apply(mask: &BinaryMask, kernel_size: usize, pick: fn(u8, u8) -> u8) -> BinaryMask {
        let half = kernel_size / 2;
        if half == 0 || mask.data.is_empty() {
            return mask.clone();
        }
        let w = mask.width as usize;
        let h = mask.height as usize;

        let mut horizontal = vec![0u8; mask.data.len()];
        for y in 0..h {
            for x in 0..w {
                horizontal[y * w + x] = window(x, half, w)
                    .map(|i| mask.data[y * w + i])
                    .reduce(pick)
                    .unwrap_or(0);
            }
        }

        let mut out = BinaryMask::new(mask.width, mask.height);
        for y in 0..h {
            for x in 0..w {
                out.data[y * w + x] = window(y, half, h)
                    .map(|j| horizontal[j * w + x])
                    .reduce(pick)
                    .unwrap_or(0);
            }
        }
        out
    }

    /// Indices `center - half ..= center + half`, clamped into `0..len`.
    fn window(center: usize, half: usize, len: usize) -> impl Iterator<Item = usize> {
        let last = len as i64 - 1;
        (-(half as i64)..=half as i64).map(move |d| (center as i64 + d).clamp(0, last) as usize)
    }
}
