//! Individual preprocessing steps

pub mod clahe;
pub mod crop;
pub mod denoise;
pub mod deskew;
pub mod grayscale;
pub mod normalize;
pub mod quality;
pub mod resize;
pub mod sharpen;
pub mod threshold;
