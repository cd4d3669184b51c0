//! Text-density based crop of trailing blank space

use image::{imageops, GrayImage};
use imageproc::contrast::otsu_level;
use serde::Serialize;

/// Smallest share of the page height ever kept
pub const MIN_CROP_PERCENT: u8 = 50;
/// Share of the ink that must stay inside the crop
const INK_COVERAGE: f64 = 0.95;

/// How much of the image height, from the top, to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropDecision {
    pub percent: u8,
}

impl CropDecision {
    pub const KEEP_ALL: Self = Self { percent: 100 };

    /// Clamp any percentage into the supported 50-100 range
    pub fn new(percent: u32) -> Self {
        Self {
            percent: percent.clamp(MIN_CROP_PERCENT as u32, 100) as u8,
        }
    }

    /// Combine an estimate with an operator floor; the floor always wins
    pub fn with_floor(self, floor: u8) -> Self {
        let floor = floor.clamp(MIN_CROP_PERCENT, 100);
        Self {
            percent: self.percent.max(floor).clamp(floor, 100),
        }
    }
}

/// Estimate how far down the page 95% of the ink extends.
///
/// The page is Otsu-binarized and inverted so ink counts as foreground.
/// Uniform and inkless pages keep everything.
pub fn estimate(gray: &GrayImage) -> CropDecision {
    let (width, height) = gray.dimensions();
    let raw = gray.as_raw();
    if raw.iter().all(|&v| v == raw[0]) {
        return CropDecision::KEEP_ALL;
    }

    let level = otsu_level(gray);
    let row_density: Vec<u64> = raw
        .chunks_exact(width as usize)
        .map(|row| row.iter().filter(|&&v| v <= level).count() as u64)
        .collect();

    let total: u64 = row_density.iter().sum();
    if total == 0 {
        return CropDecision::KEEP_ALL;
    }

    let target = INK_COVERAGE * total as f64;
    let mut cumulative = 0u64;
    let row = row_density
        .iter()
        .position(|&count| {
            cumulative += count;
            cumulative as f64 >= target
        })
        .unwrap_or(height as usize - 1);

    let percent = ((row as f64 + 1.0) * 100.0 / height as f64).ceil() as u32;
    let decision = CropDecision::new(percent);
    tracing::debug!(
        "Auto-crop decided: {}% (row {} of {})",
        decision.percent,
        row,
        height
    );
    decision
}

/// Keep the top `percent` of the image rows (at least one row)
pub fn apply(gray: GrayImage, decision: CropDecision) -> GrayImage {
    if decision.percent >= 100 {
        return gray;
    }
    let (width, height) = gray.dimensions();
    let keep = ((height as u64 * decision.percent as u64) / 100).clamp(1, height as u64) as u32;
    imageops::crop_imm(&gray, 0, 0, width, keep).to_image()
}
