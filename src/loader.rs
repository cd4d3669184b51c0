//! Input validation and decoding ahead of the preprocessing pipeline

use crate::config::Config;
use crate::error::{OcrError, PreprocessError};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};

/// Resolve a requested image path and check it against the configured limits.
///
/// The path must exist, be a regular file, fit within the size limit and,
/// when an allow-list is configured, live under one of the allowed
/// directories. Symlinks are resolved before the allow-list check.
pub fn validate_image_path(path: &Path, config: &Config) -> Result<PathBuf, OcrError> {
    let resolved = path
        .canonicalize()
        .map_err(|_| OcrError::InvalidPath(format!("image {} does not exist", path.display())))?;

    let metadata = std::fs::metadata(&resolved)
        .map_err(|e| OcrError::InvalidPath(format!("cannot read {}: {}", resolved.display(), e)))?;
    if !metadata.is_file() {
        return Err(OcrError::InvalidPath(format!(
            "{} is not a regular file",
            resolved.display()
        )));
    }

    if metadata.len() > config.max_image_size_bytes {
        return Err(OcrError::ImageTooLarge {
            size: metadata.len(),
            max: config.max_image_size_bytes,
        });
    }

    if !config.allowed_image_dirs.is_empty() {
        let allowed = config
            .allowed_image_dirs
            .iter()
            .filter_map(|dir| dir.canonicalize().ok())
            .any(|dir| resolved.starts_with(dir));
        if !allowed {
            return Err(OcrError::InvalidPath(
                "image is outside the allowed directories".to_string(),
            ));
        }
    }

    Ok(resolved)
}

/// Decode an image file into a non-empty raster
pub fn load_image(path: &Path) -> Result<DynamicImage, PreprocessError> {
    tracing::info!("Loading image from {}", path.display());
    let image = image::open(path).map_err(|e| {
        PreprocessError::InvalidImage(format!("{}: {}", path.display(), e))
    })?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessError::InvalidImage(format!(
            "{} has zero dimension",
            path.display()
        )));
    }
    Ok(image)
}
