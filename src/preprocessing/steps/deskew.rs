use image::{imageops, DynamicImage, GrayImage, ImageBuffer, Pixel};
use imageproc::contrast::otsu_level;
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use serde::Serialize;

/// Estimates below this are treated as noise and left alone
pub const MIN_CORRECTION_DEGREES: f32 = 0.5;

/// What the deskew step decided for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "decision", content = "angle", rename_all = "snake_case")]
pub enum SkewOutcome {
    /// Blank page: nothing to measure
    NoForeground,
    /// Estimated angle too small to be worth a resample
    Negligible(f32),
    /// Estimated angle beyond the configured limit, orientation kept
    Unreliable(f32),
    /// Image was rotated by this many degrees
    Corrected(f32),
}

impl SkewOutcome {
    pub fn corrected(&self) -> bool {
        matches!(self, Self::Corrected(_))
    }
}

/// Correct small rotational skew of a page.
///
/// The angle comes from the minimum-area rectangle enclosing all ink pixels.
/// Corrections are only attempted for `0.5 <= |angle| <= max_degrees`; the
/// rotated image keeps its canvas size and replicates edge pixels into the
/// uncovered corners. Grayscale input stays grayscale, anything else is
/// rotated as RGB.
pub fn apply(image: DynamicImage, max_degrees: f32) -> (DynamicImage, SkewOutcome) {
    let Some(angle) = estimate_skew(&image.to_luma8()) else {
        tracing::debug!("No foreground pixels found, skipping deskew");
        return (image, SkewOutcome::NoForeground);
    };

    if angle.abs() < MIN_CORRECTION_DEGREES {
        tracing::debug!("No significant skew detected ({:.2} degrees)", angle);
        return (image, SkewOutcome::Negligible(angle));
    }

    if angle.abs() > max_degrees {
        tracing::info!(
            "Estimated skew {:.2} exceeds correction limit ({:.1} degrees), keeping orientation",
            angle,
            max_degrees
        );
        return (image, SkewOutcome::Unreliable(angle));
    }

    tracing::info!("Correcting skew of approximately {:.2} degrees", angle);
    let rotated = match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(rotate(&gray, angle)),
        other => DynamicImage::ImageRgb8(rotate(&other.to_rgb8(), angle)),
    };
    (rotated, SkewOutcome::Corrected(angle))
}

/// Estimate text skew in degrees, normalized to (-45, 45].
///
/// Positive angles mean content runs downward to the right. Returns `None`
/// when the Otsu-binarized, inverted page has no foreground at all.
pub fn estimate_skew(gray: &GrayImage) -> Option<f32> {
    let mut inverted = gray.clone();
    imageops::invert(&mut inverted);
    let level = otsu_level(&inverted);

    let points: Vec<Point<i32>> = inverted
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] > level)
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect();

    if points.is_empty() {
        return None;
    }

    let hull = convex_hull(&points[..]);
    Some(normalize_angle(min_area_rect_angle(&hull)))
}

/// Edge angle (degrees) of the minimum-area rectangle around a convex hull
///
/// Rotating calipers: the optimal rectangle is flush with one hull edge.
fn min_area_rect_angle(hull: &[Point<i32>]) -> f64 {
    match hull.len() {
        0 | 1 => return 0.0,
        2 => {
            let (a, b) = (hull[0], hull[1]);
            return ((b.y - a.y) as f64).atan2((b.x - a.x) as f64).to_degrees();
        }
        _ => {}
    }

    let mut best_area = f64::INFINITY;
    let mut best_angle = 0.0;

    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let (ex, ey) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
        let len = ex.hypot(ey);
        if len == 0.0 {
            continue;
        }
        let (ux, uy) = (ex / len, ey / len);

        let (mut min_u, mut max_u) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_v, mut max_v) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in hull {
            let (px, py) = (p.x as f64, p.y as f64);
            let u = px * ux + py * uy;
            let v = -px * uy + py * ux;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }

        let area = (max_u - min_u) * (max_v - min_v);
        if area < best_area {
            best_area = area;
            best_angle = uy.atan2(ux).to_degrees();
        }
    }

    best_angle
}

/// Fold any edge angle onto (-45, 45]; rectangle sides repeat every 90 degrees
fn normalize_angle(degrees: f64) -> f32 {
    let mut angle = degrees % 90.0;
    if angle > 45.0 {
        angle -= 90.0;
    } else if angle <= -45.0 {
        angle += 90.0;
    }
    angle as f32
}

/// Rotate about the image center, keeping the canvas size.
///
/// Content is turned by `-degrees` (a line at `+degrees` comes out
/// horizontal). Samples use bicubic interpolation (a = -0.75) and clamp to
/// the nearest edge pixel outside the source.
pub fn rotate<P>(image: &ImageBuffer<P, Vec<u8>>, degrees: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let stride = width as usize * channels;
    let src = image.as_raw();

    let (sin, cos) = (degrees as f64).to_radians().sin_cos();
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let sx = cx + cos * dx - sin * dy;
        let sy = cy + sin * dx + cos * dy;

        let x0 = sx.floor();
        let y0 = sy.floor();
        let wx = cubic_weights(sx - x0);
        let wy = cubic_weights(sy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let out_channels = pixel.channels_mut();
        for (c, out_value) in out_channels.iter_mut().enumerate().take(channels) {
            let mut acc = 0.0;
            for (j, weight_y) in wy.iter().enumerate() {
                let yy = (y0 - 1 + j as i64).clamp(0, max_y) as usize;
                let row = &src[yy * stride..(yy + 1) * stride];
                let mut row_acc = 0.0;
                for (i, weight_x) in wx.iter().enumerate() {
                    let xx = (x0 - 1 + i as i64).clamp(0, max_x) as usize;
                    row_acc += weight_x * row[xx * channels + c] as f64;
                }
                acc += weight_y * row_acc;
            }
            *out_value = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn cubic_weights(t: f64) -> [f64; 4] {
    const A: f64 = -0.75;
    let w0 = ((A * (t + 1.0) - 5.0 * A) * (t + 1.0) + 8.0 * A) * (t + 1.0) - 4.0 * A;
    let w1 = ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0;
    let w2 = ((A + 2.0) * (1.0 - t) - (A + 3.0)) * (1.0 - t) * (1.0 - t) + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    /// White page with a block of dark horizontal text lines
    pub(crate) fn text_block_page(width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));
        let left = width / 8;
        let right = width - width / 8;
        let mut top = height / 4;
        while top + 8 < height - height / 4 {
            for y in top..top + 8 {
                for x in left..right {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
            top += 24;
        }
        img
    }

    #[test]
    fn test_deskew_detects_zero_angle_for_straight_image() {
        let img = text_block_page(400, 300);
        let angle = estimate_skew(&img).unwrap();
        assert!(
            angle.abs() < MIN_CORRECTION_DEGREES,
            "Expected near-zero angle, got {} degrees",
            angle
        );
    }

    #[test]
    fn test_upright_page_is_left_unmodified() {
        let img = text_block_page(400, 300);
        let (result, outcome) = apply(DynamicImage::ImageLuma8(img.clone()), 15.0);
        assert!(matches!(outcome, SkewOutcome::Negligible(_)));
        assert_eq!(result.to_luma8(), img);
    }

    #[test]
    fn test_blank_page_has_no_foreground() {
        let img = GrayImage::from_pixel(50, 40, Luma([255]));
        assert_eq!(estimate_skew(&img), None);
        let (result, outcome) = apply(DynamicImage::ImageLuma8(img.clone()), 15.0);
        assert_eq!(outcome, SkewOutcome::NoForeground);
        assert_eq!(result.to_luma8(), img);
    }

    #[test]
    fn test_recovers_known_rotation() {
        let tilted = rotate(&text_block_page(400, 300), -5.0);
        let estimated = estimate_skew(&tilted).unwrap();
        assert!((estimated - 5.0).abs() < 1.0, "estimated {}", estimated);

        let (result, outcome) = apply(DynamicImage::ImageLuma8(tilted), 15.0);
        assert!(outcome.corrected());
        let residual = estimate_skew(&result.to_luma8()).unwrap();
        assert!(residual.abs() < 1.0, "residual skew {}", residual);
    }

    #[test]
    fn test_recovers_negative_rotation() {
        let tilted = rotate(&text_block_page(400, 300), 3.0);
        let (result, outcome) = apply(DynamicImage::ImageLuma8(tilted), 15.0);
        match outcome {
            SkewOutcome::Corrected(angle) => assert!((angle + 3.0).abs() < 1.0, "{}", angle),
            other => panic!("expected correction, got {:?}", other),
        }
        let residual = estimate_skew(&result.to_luma8()).unwrap();
        assert!(residual.abs() < 1.0, "residual skew {}", residual);
    }

    #[test]
    fn test_rejects_rotation_beyond_limit() {
        let tilted = rotate(&text_block_page(400, 300), -25.0);
        let (result, outcome) = apply(DynamicImage::ImageLuma8(tilted.clone()), 15.0);
        assert!(matches!(outcome, SkewOutcome::Unreliable(a) if a > 15.0));
        assert_eq!(result.to_luma8(), tilted);
    }

    #[test]
    fn test_deskew_preserves_dimensions_and_color() {
        let gray = rotate(&text_block_page(200, 120), -4.0);
        let color = RgbImage::from_fn(200, 120, |x, y| {
            let v = gray.get_pixel(x, y).0[0];
            Rgb([v, v, v])
        });
        let (result, outcome) = apply(DynamicImage::ImageRgb8(color), 15.0);
        assert!(outcome.corrected());
        assert_eq!(result.width(), 200);
        assert_eq!(result.height(), 120);
        assert!(result.as_rgb8().is_some());
    }

    #[test]
    fn test_rotation_replicates_border() {
        let img = GrayImage::from_pixel(60, 60, Luma([255]));
        let rotated = rotate(&img, 10.0);
        assert!(rotated.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_normalize_angle_folds_rectangle_sides() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(90.0), 0.0);
        assert_eq!(normalize_angle(-90.0), 0.0);
        assert!((normalize_angle(93.0) - 3.0).abs() < 1e-6);
        assert!((normalize_angle(-87.0) - 3.0).abs() < 1e-6);
        assert!((normalize_angle(45.0) - 45.0).abs() < 1e-6);
    }
}
