use image::{DynamicImage, GenericImageView};

/// Compute the bounded size for an image, or `None` when it already fits.
///
/// Both sides are scaled by `max_dimension / max(width, height)` and rounded
/// to the nearest pixel, never below 1.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension {
        return None;
    }

    let scale = max_dimension as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    Some((new_width, new_height))
}

/// Downscale images whose longest side exceeds `max_dimension`
///
/// Uses the `image` crate's thumbnail sampler, which averages every source
/// pixel covered by a target pixel. Images within the bound are returned as-is.
pub fn apply(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    match target_dimensions(width, height, max_dimension) {
        Some((new_width, new_height)) => {
            tracing::info!(
                "Resizing image from {}x{} to {}x{}",
                width,
                height,
                new_width,
                new_height
            );
            image.thumbnail_exact(new_width, new_height)
        }
        None => image,
    }
}
