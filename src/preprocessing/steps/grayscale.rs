use image::{DynamicImage, GrayImage};

/// Convert image to grayscale
/// Every step after this one works on a single-channel buffer
pub fn apply(image: DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray,
        other => other.to_luma8(),
    }
}
