use image::{GrayImage, Luma};

/// Normalize image contrast using min-max histogram stretching
/// Maps pixel values to use the full 0-255 range; a flat image has no range
/// to map and comes out all black
pub fn apply(gray: &GrayImage) -> GrayImage {
    let (min_val, max_val) = find_min_max(gray);

    if max_val <= min_val {
        return GrayImage::new(gray.width(), gray.height());
    }

    let range = (max_val - min_val) as f32;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate().skip(min_val as usize) {
        let stretched = (v as f32 - min_val as f32) / range * 255.0;
        *slot = stretched.round().min(255.0) as u8;
    }

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([lut[gray.get_pixel(x, y).0[0] as usize]])
    })
}

pub(crate) fn find_min_max(img: &GrayImage) -> (u8, u8) {
    img.pixels()
        .fold((255u8, 0u8), |(min, max), p| (min.min(p.0[0]), max.max(p.0[0])))
}
