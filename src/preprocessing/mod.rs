//! Adaptive image preprocessing for OCR
//!
//! Bounds image size, corrects skew, converts to grayscale, then repairs
//! low contrast, blur and noise either from measured quality metrics or from
//! fixed flags, and finally crops trailing blank space.

pub mod pipeline;
pub mod steps;

pub use pipeline::{
    plan_enhancements, Enhancement, EnhancementMode, Pipeline, PipelineConfig,
    PreprocessingReport, PreprocessingResult, StepTiming,
};
pub use steps::crop::CropDecision;
pub use steps::denoise::DenoiseParams;
pub use steps::deskew::SkewOutcome;
pub use steps::quality::QualityMetrics;
