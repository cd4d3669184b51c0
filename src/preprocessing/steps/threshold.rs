use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Neighbourhood size for the local threshold
const BLOCK_SIZE: u32 = 31;
/// Subtracted from the local mean; keeps flat paper white
const OFFSET: f32 = 15.0;

/// Apply Gaussian-weighted adaptive thresholding
///
/// A pixel is white when it is brighter than its Gaussian-weighted
/// neighbourhood mean minus `OFFSET`, black otherwise. Better than a single
/// global level for documents with uneven lighting.
pub fn apply(gray: &GrayImage) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, block_sigma(BLOCK_SIZE));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y).0[0] as f32;
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - OFFSET;
        if pixel > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Gaussian sigma whose kernel spans a block of the given odd size
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(&img);

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_handles_text_pattern() {
        // Dark text on light background
        let mut img = GrayImage::from_pixel(50, 20, Luma([240]));
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([20]));
        }

        let result = apply(&img);

        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 5).0[0], 255);
    }

    #[test]
    fn test_flat_page_stays_white() {
        let img = GrayImage::from_pixel(40, 40, Luma([90]));
        assert!(apply(&img).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_block_sigma() {
        assert!((block_sigma(31) - 5.0).abs() < 1e-5);
        assert!((block_sigma(3) - 0.8).abs() < 1e-5);
    }
}
