use image::{GrayImage, Luma};

/// Clip limit relative to a uniform histogram
pub const CLIP_LIMIT: f32 = 2.0;
/// Tiles per side
pub const TILE_GRID: u32 = 8;

/// Contrast Limited Adaptive Histogram Equalization
///
/// Each tile of an 8x8 grid gets its own equalization curve with histogram
/// bins clipped at `CLIP_LIMIT` times the uniform count; the excess is spread
/// evenly over all bins. Pixels blend the curves of the four nearest tile
/// centers bilinearly, so tile seams do not show.
pub fn apply(gray: &GrayImage) -> GrayImage {
    apply_with(gray, CLIP_LIMIT, TILE_GRID)
}

pub fn apply_with(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let tiles_x = grid.clamp(1, width);
    let tiles_y = grid.clamp(1, height);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = (tx * tile_w).min(width - 1);
            let y0 = (ty * tile_h).min(height - 1);
            let x1 = ((tx + 1) * tile_w).min(width);
            let y1 = ((ty + 1) * tile_h).min(height);
            luts.push(tile_lut(gray, x0, y0, x1, y1, clip_limit));
        }
    }
    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let (tx1, tx2, xa) = neighbours(x, tile_w, tiles_x);
        let (ty1, ty2, ya) = neighbours(y, tile_h, tiles_y);
        let v = gray.get_pixel(x, y).0[0] as usize;

        let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[v] as f32 * xa;
        let bottom = lut_at(tx1, ty2)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[v] as f32 * xa;
        let blended = top * (1.0 - ya) + bottom * ya;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Tile indices on either side of a pixel and the weight of the second one
fn neighbours(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    let base = f.floor();
    let weight = f - base;
    let last = tiles as i64 - 1;
    let first = (base as i64).clamp(0, last) as u32;
    let second = (base as i64 + 1).clamp(0, last) as u32;
    (first, second, weight)
}

fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = ((x1 - x0) * (y1 - y0)).max(1);
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (slot, count) in lut.iter_mut().zip(hist.iter()) {
        cumulative += count;
        *slot = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::steps::quality::contrast;

    fn low_contrast_page() -> GrayImage {
        GrayImage::from_fn(128, 96, |x, y| {
            let ink = (x / 6 + y / 5) % 3 == 0;
            Luma([if ink { 110 } else { 140 } + ((x * 7 + y * 13) % 9) as u8])
        })
    }

    #[test]
    fn test_clahe_raises_contrast_of_flat_image() {
        let img = low_contrast_page();
        let before = contrast(&img);
        let after = contrast(&apply(&img));
        assert!(after > before, "contrast {} -> {}", before, after);
    }

    #[test]
    fn test_clahe_preserves_dimensions() {
        let img = GrayImage::from_pixel(13, 5, Luma([80]));
        let result = apply(&img);
        assert_eq!(result.dimensions(), (13, 5));
    }

    #[test]
    fn test_clahe_keeps_intensity_order_within_tile() {
        let img = GrayImage::from_fn(16, 16, |x, _| Luma([100 + x as u8]));
        let result = apply_with(&img, 2.0, 1);
        for x in 1..16 {
            assert!(result.get_pixel(x, 0).0[0] >= result.get_pixel(x - 1, 0).0[0]);
        }
    }

    #[test]
    fn test_neighbours_clamp_at_edges() {
        assert_eq!(neighbours(0, 10, 4).0, 0);
        let (a, b, _) = neighbours(39, 10, 4);
        assert_eq!((a, b), (3, 3));
    }
}
