use image::{GrayImage, Luma};
use imageproc::filter::filter3x3;

/// Weight of the detail layer added back
const AMOUNT: f32 = 1.0;
/// 3x3 Gaussian, outer product of [1, 2, 1] / 4
const GAUSSIAN_3X3: [f32; 9] = [
    0.0625, 0.125, 0.0625, //
    0.125, 0.25, 0.125, //
    0.0625, 0.125, 0.0625,
];

/// Unsharp mask: `(1 + amount) * image - amount * blurred`, clamped to 0-255
/// Enhances edges to make text strokes more distinct
pub fn apply(gray: &GrayImage) -> GrayImage {
    let blurred: GrayImage = filter3x3(gray, &GAUSSIAN_3X3);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let original = gray.get_pixel(x, y).0[0] as f32;
        let soft = blurred.get_pixel(x, y).0[0] as f32;
        let sharpened = (1.0 + AMOUNT) * original - AMOUNT * soft;
        Luma([sharpened.round().clamp(0.0, 255.0) as u8])
    })
}
