// THEORY:
// A fixed brightness threshold breaks as soon as the room lights change or the
// camera picks a different exposure. Instead the threshold is learned from the
// probe's own difference statistics, the same trick the temporal layer of a
// motion detector uses to separate "normal" change from an anomaly:
//
//     threshold = max(min_threshold, min(mean + k * std_dev, peak_ratio * peak))
//
// Only pixels above a small noise floor contribute to the mean and standard
// deviation, otherwise the (huge) dark background would drag both toward zero.
// The peak cap keeps a uniformly saturated screen, whose core has almost no
// variance, from pushing the threshold above its own brightness. A
// `peak_ratio` of zero switches the cap off.

use crate::config::ScanConfig;
use crate::core_modules::difference::{Difference, DifferenceMap};

pub const LIT: u8 = 255;
pub const UNLIT: u8 = 0;

/// Parameters of the adaptive threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    pub min_threshold: f32,
    pub std_devs: f32,
    pub noise_floor: f32,
    pub peak_ratio: f32,
}

impl From<&ScanConfig> for ThresholdParams {
    fn from(config: &ScanConfig) -> Self {
        Self {
            min_threshold: config.min_threshold,
            std_devs: config.threshold_std_devs,
            noise_floor: config.noise_floor,
            peak_ratio: config.threshold_peak_ratio,
        }
    }
}

/// Derives the detection threshold from the statistics of `map`.
pub fn adaptive_threshold(map: &DifferenceMap, params: ThresholdParams) -> Difference {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut peak = 0.0f32;

    for &v in map.values.iter().filter(|&&v| v > params.noise_floor) {
        count += 1;
        sum += v as f64;
        sum_sq += (v as f64) * (v as f64);
        peak = peak.max(v);
    }

    if count == 0 {
        return params.min_threshold;
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    let statistical = (mean + params.std_devs as f64 * variance.sqrt()) as f32;
    let capped = if params.peak_ratio > 0.0 {
        statistical.min(params.peak_ratio * peak)
    } else {
        statistical
    };
    capped.max(params.min_threshold)
}

/// A width x height grid of `LIT` / `UNLIT` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![UNLIT; width as usize * height as usize],
        }
    }

    /// `LIT` wherever the map strictly exceeds `threshold`.
    pub fn from_threshold(map: &DifferenceMap, threshold: Difference) -> Self {
        Self {
            width: map.width,
            height: map.height,
            data: map
                .values
                .iter()
                .map(|&v| if v > threshold { LIT } else { UNLIT })
                .collect(),
        }
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        self.get(x, y) == LIT
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn lit_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == LIT).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ThresholdParams {
        ThresholdParams {
            min_threshold: 30.0,
            std_devs: 1.5,
            noise_floor: 5.0,
            peak_ratio: 0.5,
        }
    }

    #[test]
    fn empty_statistics_fall_back_to_minimum() {
        let map = DifferenceMap::new(4, 1, vec![0.0, 5.0, 3.0, 1.0]);
        assert_eq!(adaptive_threshold(&map, params()), 30.0);
    }

    #[test]
    fn statistics_ignore_noise_floor_pixels() {
        // Qualifying values: 40, 60 -> mean 50, std 10 -> 65; peak cap 30 -> min 30.
        let map = DifferenceMap::new(6, 1, vec![0.0, 0.0, 4.0, 5.0, 40.0, 60.0]);
        let no_cap = ThresholdParams {
            peak_ratio: 0.0,
            ..params()
        };
        assert!((adaptive_threshold(&map, no_cap) - 65.0).abs() < 1e-3);
        assert_eq!(adaptive_threshold(&map, params()), 30.0);
    }

    #[test]
    fn full_peak_ratio_still_caps_at_the_peak() {
        let map = DifferenceMap::new(6, 1, vec![0.0, 0.0, 4.0, 5.0, 40.0, 60.0]);
        let at_peak = ThresholdParams {
            peak_ratio: 1.0,
            ..params()
        };
        assert!((adaptive_threshold(&map, at_peak) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn uniform_bright_region_is_capped_below_its_value() {
        let map = DifferenceMap::new(4, 1, vec![0.0, 200.0, 200.0, 200.0]);
        let t = adaptive_threshold(&map, params());
        assert!((t - 100.0).abs() < 1e-3);
        let mask = BinaryMask::from_threshold(&map, t);
        assert_eq!(mask.lit_count(), 3);
    }

    #[test]
    fn mask_uses_strict_comparison() {
        let map = DifferenceMap::new(3, 1, vec![29.0, 30.0, 31.0]);
        let mask = BinaryMask::from_threshold(&map, 30.0);
        assert_eq!(mask.data, vec![UNLIT, UNLIT, LIT]);
        assert!(mask.is_lit(2, 0));
    }
}
