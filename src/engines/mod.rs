//! Text recognition engine implementations
//!
//! Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

use crate::engine::TextRecognizer;
use crate::error::OcrError;
use std::sync::Arc;

/// Name of the engine `default_recognizer` builds
#[cfg(feature = "engine-ocrs")]
pub const DEFAULT_ENGINE: &str = "ocrs";

#[cfg(not(feature = "engine-ocrs"))]
pub const DEFAULT_ENGINE: &str = "none";

/// Initialize the default recognition engine for this build
#[cfg(feature = "engine-ocrs")]
pub fn default_recognizer() -> Result<Arc<dyn TextRecognizer>, OcrError> {
    tracing::info!("Initializing ocrs engine...");
    Ok(Arc::new(ocrs::OcrsEngine::new()?))
}

#[cfg(not(feature = "engine-ocrs"))]
pub fn default_recognizer() -> Result<Arc<dyn TextRecognizer>, OcrError> {
    Err(OcrError::InitializationError(
        "No OCR engines available. Build with --features engine-ocrs".to_string(),
    ))
}
