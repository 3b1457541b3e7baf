// PNG dumps of frames, masks and difference maps for offline inspection.

pub mod image_helper {
    use crate::core_modules::difference::DifferenceMap;
    use crate::core_modules::threshold::BinaryMask;
    use image::ImageEncoder;
    use image::codecs::png::PngEncoder;
    use image::error::{ParameterError, ParameterErrorKind};
    use std::path::Path;

    fn write_png(
        path: &Path,
        width: u32,
        height: u32,
        buffer: &[u8],
        color: image::ExtendedColorType,
    ) -> Result<(), image::ImageError> {
        let expected =
            u64::from(color.bits_per_pixel()) / 8 * u64::from(width) * u64::from(height);
        if buffer.len() as u64 != expected {
            return Err(image::ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            )));
        }
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        PngEncoder::new(output).write_image(buffer, width, height, color)
    }

    /// Writes a tightly packed RGBA buffer.
    pub fn save_rgba(
        path: &Path,
        width: u32,
        height: u32,
        buffer: &[u8],
    ) -> Result<(), image::ImageError> {
        write_png(path, width, height, buffer, image::ExtendedColorType::Rgba8)
    }

    /// Writes a binary mask as an 8-bit grayscale image (lit = white).
    pub fn save_mask(path: &Path, mask: &BinaryMask) -> Result<(), image::ImageError> {
        write_png(path, mask.width, mask.height, &mask.data, image::ExtendedColorType::L8)
    }

    /// Writes a difference map stretched so its peak is white.
    pub fn save_difference(path: &Path, map: &DifferenceMap) -> Result<(), image::ImageError> {
        let peak = map.max_value();
        let scale = if peak > 0.0 { 255.0 / peak } else { 0.0 };
        let gray: Vec<u8> = map
            .values
            .iter()
            .map(|&v| (v * scale).round().clamp(0.0, 255.0) as u8)
            .collect();
        write_png(path, map.width, map.height, &gray, image::ExtendedColorType::L8)
    }
}
