use crate::error::OcrError;
use image::GrayImage;
use std::sync::{Arc, OnceLock};

/// Trait that all text recognition engines must implement
///
/// Engines receive the preprocessed single-channel image and return plain
/// text; how they arrive at it stays behind this boundary.
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs")
    fn name(&self) -> &'static str;

    /// Whether the engine finished initializing and can take work
    fn is_ready(&self) -> bool;

    /// Recognize the text in a preprocessed image
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Recognizer that is installed after the server starts listening
///
/// Model loading can take a while on first start (downloads included), so
/// the server binds right away and reports `initializing` until an engine
/// is installed here.
pub struct LazyRecognizer {
    name: &'static str,
    inner: OnceLock<Arc<dyn TextRecognizer>>,
}

impl LazyRecognizer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: OnceLock::new(),
        }
    }

    /// Install the initialized engine. Returns false if one was already set.
    pub fn install(&self, recognizer: Arc<dyn TextRecognizer>) -> bool {
        self.inner.set(recognizer).is_ok()
    }
}

impl TextRecognizer for LazyRecognizer {
    fn name(&self) -> &'static str {
        self.inner.get().map_or(self.name, |engine| engine.name())
    }

    fn is_ready(&self) -> bool {
        self.inner.get().is_some_and(|engine| engine.is_ready())
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        self.inner.get().ok_or(OcrError::NotReady)?.recognize(image)
    }
}

/// Trim recognized segments and drop the empty ones
pub fn clean_segments<I, S>(segments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
