//! Document image preprocessing for OCR, and the HTTP service around it

pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod loader;
pub mod preprocessing;
pub mod server;

pub use engine::{LazyRecognizer, TextRecognizer};
pub use error::{OcrError, PreprocessError};
pub use preprocessing::{EnhancementMode, Pipeline, PipelineConfig, PreprocessingResult};
