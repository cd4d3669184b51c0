//! Image quality metrics used to pick enhancement steps

use image::GrayImage;
use serde::Serialize;

/// Blur and contrast measurements of one grayscale image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// Variance of the Laplacian response; low means few sharp edges
    pub blur_score: f64,
    /// Standard deviation of intensities; low means a flat image
    pub contrast: f64,
}

impl QualityMetrics {
    pub fn measure(gray: &GrayImage) -> Self {
        Self {
            blur_score: blur_score(gray),
            contrast: contrast(gray),
        }
    }
}

/// Variance of the 4-neighbour Laplacian over the whole image.
///
/// Borders mirror without repeating the edge pixel (`dcb|abcd|cba`).
pub fn blur_score(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let raw = gray.as_raw();
    let at = |x: usize, y: usize| raw[y * w + x] as i32;

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 0..h {
        let up = reflect(y as isize - 1, h);
        let down = reflect(y as isize + 1, h);
        for x in 0..w {
            let left = reflect(x as isize - 1, w);
            let right = reflect(x as isize + 1, w);
            let response =
                (at(x, up) + at(x, down) + at(left, y) + at(right, y) - 4 * at(x, y)) as f64;
            sum += response;
            sum_sq += response * response;
        }
    }

    variance(sum, sum_sq, (w * h) as f64)
}

/// Population standard deviation of pixel intensities
pub fn contrast(gray: &GrayImage) -> f64 {
    let (sum, sum_sq) = gray.as_raw().iter().fold((0.0f64, 0.0f64), |(s, sq), &v| {
        let v = v as f64;
        (s + v, sq + v * v)
    });
    variance(sum, sum_sq, gray.as_raw().len() as f64).sqrt()
}

fn variance(sum: f64, sum_sq: f64, n: f64) -> f64 {
    if n == 0.0 {
        return 0.0;
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn reflect(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    if i < 0 {
        (-i) as usize
    } else if i > last {
        (2 * last - i) as usize
    } else {
        i as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_uniform_image_scores_zero() {
        let img = GrayImage::from_pixel(20, 20, Luma([90]));
        let metrics = QualityMetrics::measure(&img);
        assert_eq!(metrics.blur_score, 0.0);
        assert_eq!(metrics.contrast, 0.0);
    }

    #[test]
    fn test_contrast_of_two_level_image() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([0]) } else { Luma([200]) });
        assert!((contrast(&img) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_sharp_edges_score_higher_than_blurred() {
        let sharp = GrayImage::from_fn(40, 40, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Luma([20])
            } else {
                Luma([230])
            }
        });
        let blurred = imageproc::filter::gaussian_blur_f32(&sharp, 2.0);
        assert!(blur_score(&sharp) > blur_score(&blurred) * 4.0);
    }

    #[test]
    fn test_single_pixel_image_is_finite() {
        let img = GrayImage::from_pixel(1, 1, Luma([7]));
        let metrics = QualityMetrics::measure(&img);
        assert!(metrics.blur_score.is_finite());
        assert_eq!(metrics.contrast, 0.0);
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
    }
}
