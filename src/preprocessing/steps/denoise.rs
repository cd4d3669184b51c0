use image::{GrayImage, Luma};
use serde::Serialize;

/// Parameters of the non-local means filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DenoiseParams {
    /// Filter strength `h`; larger values remove more noise and more detail
    pub strength: f32,
    /// Side of the square patch compared between pixels (odd)
    pub template_window: u32,
    /// Side of the square area searched for similar patches (odd)
    pub search_window: u32,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            strength: 10.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

/// Edge-preserving non-local means denoising
///
/// Every pixel becomes a weighted mean of the pixels in its search window,
/// weighted by `exp(-d / h^2)` where `d` is the mean squared difference
/// between the two surrounding patches. Patch distances for one search
/// offset at a time come from an integral image, so cost does not grow with
/// the patch size. Samples outside the image repeat the nearest edge pixel.
pub fn apply(gray: &GrayImage, params: &DenoiseParams) -> GrayImage {
    if params.strength <= 0.0 {
        return gray.clone();
    }

    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let src = gray.as_raw();
    let template_radius = (params.template_window / 2) as isize;
    let search_radius = (params.search_window / 2) as isize;

    // exp(-d / h^2) for every integer mean distance
    let h2 = params.strength * params.strength;
    let weights: Vec<f32> = (0..=255 * 255)
        .map(|d| (-(d as f32) / h2).exp())
        .collect();

    let mut weight_sum = vec![0f32; w * h];
    let mut value_sum = vec![0f32; w * h];
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    let clamp_x = |x: isize| x.clamp(0, w as isize - 1) as usize;
    let clamp_y = |y: isize| y.clamp(0, h as isize - 1) as usize;

    for dy in -search_radius..=search_radius {
        for dx in -search_radius..=search_radius {
            // Integral image of squared differences against the shifted image
            for y in 0..h {
                let sy = clamp_y(y as isize + dy);
                let mut row_sum = 0u64;
                for x in 0..w {
                    let sx = clamp_x(x as isize + dx);
                    let diff = src[y * w + x] as i32 - src[sy * w + sx] as i32;
                    row_sum += (diff * diff) as u64;
                    integral[(y + 1) * (w + 1) + x + 1] = integral[y * (w + 1) + x + 1] + row_sum;
                }
            }

            for y in 0..h {
                let y0 = clamp_y(y as isize - template_radius);
                let y1 = clamp_y(y as isize + template_radius) + 1;
                let sy = clamp_y(y as isize + dy);
                for x in 0..w {
                    let x0 = clamp_x(x as isize - template_radius);
                    let x1 = clamp_x(x as isize + template_radius) + 1;
                    let ssd = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                        - integral[y0 * (w + 1) + x1]
                        - integral[y1 * (w + 1) + x0];
                    let count = ((x1 - x0) * (y1 - y0)) as u64;
                    let weight = weights[(ssd / count) as usize];

                    let sx = clamp_x(x as isize + dx);
                    weight_sum[y * w + x] += weight;
                    value_sum[y * w + x] += weight * src[sy * w + sx] as f32;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        // The zero offset always contributes weight 1, so the sum is positive
        let value = value_sum[i] / weight_sum[i];
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
