use crate::error::PreprocessError;
use image::{DynamicImage, GenericImageView, GrayImage};
use serde::Serialize;
use std::time::Instant;

use super::steps;
use super::steps::crop::CropDecision;
use super::steps::denoise::DenoiseParams;
use super::steps::deskew::SkewOutcome;
use super::steps::quality::{self, QualityMetrics};

/// Contrast below this gets CLAHE
const CONTRAST_BOOST_BELOW: f64 = 60.0;
/// Blur score below this gets an unsharp mask
const SHARPEN_BELOW: f64 = 120.0;
/// Blur score below this gets denoised
const DENOISE_BELOW: f64 = 90.0;
/// Contrast (after any CLAHE) below this gets binarized
const BINARIZE_BELOW: f64 = 50.0;

/// How enhancement steps are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EnhancementMode {
    /// Pick steps per image from blur and contrast metrics, estimate the crop
    #[default]
    Autoconfig,
    /// Fixed steps: normalize, then the enabled extras, then the fixed crop
    Manual { denoise: bool, binarize: bool },
}

impl EnhancementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autoconfig => "autoconfig",
            Self::Manual { .. } => "manual",
        }
    }
}

/// Pipeline settings, read-only for the duration of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub mode: EnhancementMode,
    /// Longest side allowed before downscaling
    pub max_dimension: u32,
    /// Skew estimates beyond this many degrees are not corrected
    pub max_deskew_degrees: f32,
    pub denoise: DenoiseParams,
    /// Least share of the page height kept after cropping (50-100)
    pub crop_floor_percent: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: EnhancementMode::Autoconfig,
            max_dimension: 2500,
            max_deskew_degrees: 15.0,
            denoise: DenoiseParams::default(),
            crop_floor_percent: 100,
        }
    }
}

/// Enhancement applied to the grayscale image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enhancement {
    Normalize,
    Clahe,
    Sharpen,
    Denoise,
    Binarize,
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// What the pipeline measured and decided for one image
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingReport {
    pub mode: &'static str,
    pub original_dimensions: (u32, u32),
    pub resized_dimensions: (u32, u32),
    pub skew: SkewOutcome,
    /// Metrics of the grayscale image, autoconfig mode only
    pub metrics: Option<QualityMetrics>,
    /// Contrast re-measured after CLAHE, when CLAHE ran
    pub enhanced_contrast: Option<f64>,
    pub enhancements: Vec<Enhancement>,
    pub crop_percent: u8,
    pub final_dimensions: (u32, u32),
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Preprocessed image plus the report
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    pub image: GrayImage,
    pub report: PreprocessingReport,
}

/// Preprocessing pipeline: resize, deskew, grayscale, enhance, crop
///
/// Holds nothing but its configuration, so one instance can serve any number
/// of threads at once.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process an image according to the configured mode
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, PreprocessError> {
        let start = Instant::now();
        let mut timings = Vec::new();

        let original_dimensions = image.dimensions();
        if original_dimensions.0 == 0 || original_dimensions.1 == 0 {
            return Err(PreprocessError::InvalidImage(format!(
                "image has zero dimension ({}x{})",
                original_dimensions.0, original_dimensions.1
            )));
        }
        tracing::debug!(
            "Original dimensions: {}x{}",
            original_dimensions.0,
            original_dimensions.1
        );

        let max_dimension = self.config.max_dimension;
        let image = timed("resize", &mut timings, || {
            steps::resize::apply(image, max_dimension)
        });
        let resized_dimensions = image.dimensions();

        let max_degrees = self.config.max_deskew_degrees;
        let (image, skew) = timed("deskew", &mut timings, || {
            steps::deskew::apply(image, max_degrees)
        });

        let gray = timed("grayscale", &mut timings, || steps::grayscale::apply(image));

        let enhanced = match self.config.mode {
            EnhancementMode::Autoconfig => self.autoconfig(gray, &mut timings),
            EnhancementMode::Manual { denoise, binarize } => {
                self.manual(gray, denoise, binarize, &mut timings)
            }
        };

        let crop = enhanced.crop;
        if crop.percent < 100 {
            tracing::info!(
                "Cropping to top {}% ({}, floor {}%)",
                crop.percent,
                self.config.mode.as_str(),
                self.config.crop_floor_percent
            );
        }
        let image = timed("crop", &mut timings, || steps::crop::apply(enhanced.image, crop));
        let final_dimensions = image.dimensions();
        tracing::debug!(
            "Preprocessing complete, final dimensions: {}x{}",
            final_dimensions.0,
            final_dimensions.1
        );

        Ok(PreprocessingResult {
            image,
            report: PreprocessingReport {
                mode: self.config.mode.as_str(),
                original_dimensions,
                resized_dimensions,
                skew,
                metrics: enhanced.metrics,
                enhanced_contrast: enhanced.enhanced_contrast,
                enhancements: enhanced.applied,
                crop_percent: crop.percent,
                final_dimensions,
                total_time_ms: start.elapsed().as_millis() as u64,
                steps: timings,
            },
        })
    }

    /// Metrics-driven enhancement.
    ///
    /// Sharpen and denoise compare the blur score measured before any
    /// enhancement; binarize compares the contrast as re-measured after CLAHE.
    fn autoconfig(&self, gray: GrayImage, timings: &mut Vec<StepTiming>) -> Enhanced {
        let metrics = timed("analyze", timings, || QualityMetrics::measure(&gray));
        tracing::debug!(
            "Metrics: blur={:.1}, contrast={:.1}",
            metrics.blur_score,
            metrics.contrast
        );

        let mut gray = gray;
        let mut enhanced_contrast = None;
        if needs_contrast_boost(&metrics) {
            gray = timed("clahe", timings, || steps::clahe::apply(&gray));
            let contrast = quality::contrast(&gray);
            enhanced_contrast = Some(contrast);
            tracing::debug!("Applied CLAHE, contrast now {:.1}", contrast);
        }

        let applied = plan_enhancements(&metrics, enhanced_contrast);
        for step in &applied {
            match step {
                Enhancement::Sharpen => {
                    gray = timed("sharpen", timings, || steps::sharpen::apply(&gray));
                }
                Enhancement::Denoise => {
                    let params = self.config.denoise;
                    gray = timed("denoise", timings, || steps::denoise::apply(&gray, &params));
                }
                Enhancement::Binarize => {
                    gray = timed("threshold", timings, || steps::threshold::apply(&gray));
                }
                // CLAHE ran above; normalize is manual-only
                Enhancement::Clahe | Enhancement::Normalize => {}
            }
        }

        let estimate = timed("crop_estimate", timings, || steps::crop::estimate(&gray));
        let crop = estimate.with_floor(self.config.crop_floor_percent);

        Enhanced {
            image: gray,
            metrics: Some(metrics),
            enhanced_contrast,
            applied,
            crop,
        }
    }

    fn manual(
        &self,
        gray: GrayImage,
        denoise: bool,
        binarize: bool,
        timings: &mut Vec<StepTiming>,
    ) -> Enhanced {
        let mut gray = timed("normalize", timings, || steps::normalize::apply(&gray));
        let mut applied = vec![Enhancement::Normalize];

        if denoise {
            let params = self.config.denoise;
            gray = timed("denoise", timings, || steps::denoise::apply(&gray, &params));
            applied.push(Enhancement::Denoise);
        }

        if binarize {
            gray = timed("threshold", timings, || steps::threshold::apply(&gray));
            applied.push(Enhancement::Binarize);
        }

        Enhanced {
            image: gray,
            metrics: None,
            enhanced_contrast: None,
            applied,
            crop: CropDecision::new(self.config.crop_floor_percent as u32),
        }
    }
}

fn needs_contrast_boost(metrics: &QualityMetrics) -> bool {
    metrics.contrast < CONTRAST_BOOST_BELOW
}

/// Autoconfig decision table, in application order.
///
/// `enhanced_contrast` is the contrast re-measured after CLAHE; binarization
/// compares it when present and the original contrast otherwise. Sharpen and
/// denoise always compare the original blur score.
pub fn plan_enhancements(
    metrics: &QualityMetrics,
    enhanced_contrast: Option<f64>,
) -> Vec<Enhancement> {
    let mut plan = Vec::new();
    if needs_contrast_boost(metrics) {
        plan.push(Enhancement::Clahe);
    }
    if metrics.blur_score < SHARPEN_BELOW {
        plan.push(Enhancement::Sharpen);
    }
    if metrics.blur_score < DENOISE_BELOW {
        plan.push(Enhancement::Denoise);
    }
    if enhanced_contrast.unwrap_or(metrics.contrast) < BINARIZE_BELOW {
        plan.push(Enhancement::Binarize);
    }
    plan
}

/// Output of either enhancement branch
struct Enhanced {
    image: GrayImage,
    metrics: Option<QualityMetrics>,
    enhanced_contrast: Option<f64>,
    applied: Vec<Enhancement>,
    crop: CropDecision,
}

fn timed<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
where
    F: FnOnce() -> T,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}
