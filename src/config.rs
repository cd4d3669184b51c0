use crate::preprocessing::{DenoiseParams, EnhancementMode, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docprep-server")]
#[command(about = "Document image preprocessing and OCR server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum number of images processed at the same time
    #[arg(long, env = "OCR_MAX_CONCURRENT_REQUESTS", default_value = "3",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_concurrent_requests: u32,

    /// Maximum image file size in megabytes
    #[arg(long, env = "OCR_MAX_IMAGE_SIZE_MB", default_value = "10",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_image_size_mb: u64,

    /// Directories images may be read from, separated by ';' (empty: anywhere)
    #[arg(long, env = "OCR_ALLOWED_IMAGE_DIRS", value_delimiter = ';')]
    pub allowed_image_dirs: Vec<PathBuf>,

    /// Longest image side before downscaling
    #[arg(long, env = "OCR_MAX_IMAGE_DIMENSION", default_value = "2500",
          value_parser = clap::value_parser!(u32).range(500..))]
    pub max_image_dimension: u32,

    /// Largest skew angle (degrees) that will be corrected
    #[arg(long, env = "OCR_MAX_DESKEW_DEGREES", default_value = "15",
          value_parser = parse_deskew_degrees)]
    pub max_deskew_degrees: f32,

    /// Non-local means filter strength
    #[arg(long, env = "OCR_DENOISE_STRENGTH", default_value = "10.0",
          value_parser = parse_non_negative)]
    pub denoise_strength: f32,

    /// Non-local means patch size
    #[arg(long, env = "OCR_DENOISE_TEMPLATE_WINDOW", default_value = "7",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub denoise_template_window: u32,

    /// Non-local means search area size
    #[arg(long, env = "OCR_DENOISE_SEARCH_WINDOW", default_value = "21",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub denoise_search_window: u32,

    /// Use the fixed manual steps instead of per-image autoconfiguration
    #[arg(long, env = "OCR_DISABLE_AUTOCONFIG")]
    pub no_autoconfig: bool,

    /// Denoise every image (manual mode only)
    #[arg(long, env = "OCR_ENABLE_DENOISE")]
    pub enable_denoise: bool,

    /// Binarize every image (manual mode only)
    #[arg(long, env = "OCR_ENABLE_BINARIZE")]
    pub enable_binarize: bool,

    /// Share of the image height kept, from the top (50-100)
    #[arg(long, env = "OCR_CROP_HEIGHT_PERCENT", default_value = "100",
          value_parser = clap::value_parser!(u8).range(50..=100))]
    pub crop_height_percent: u8,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

fn parse_deskew_degrees(s: &str) -> Result<f32, String> {
    let degrees: f32 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=45.0).contains(&degrees) {
        Ok(degrees)
    } else {
        Err(format!("{} is not within 0-45 degrees", degrees))
    }
}

fn parse_non_negative(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{}", e))?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("{} must not be negative", value))
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_concurrent_requests: usize,
    pub max_image_size_bytes: u64,
    pub allowed_image_dirs: Vec<PathBuf>,
    pub pipeline: PipelineConfig,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mode = if args.no_autoconfig {
            EnhancementMode::Manual {
                denoise: args.enable_denoise,
                binarize: args.enable_binarize,
            }
        } else {
            EnhancementMode::Autoconfig
        };

        Self {
            host: args.host,
            port: args.port,
            max_concurrent_requests: args.max_concurrent_requests as usize,
            max_image_size_bytes: args.max_image_size_mb.saturating_mul(1024 * 1024),
            allowed_image_dirs: args
                .allowed_image_dirs
                .into_iter()
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect(),
            pipeline: PipelineConfig {
                mode,
                max_dimension: args.max_image_dimension,
                max_deskew_degrees: args.max_deskew_degrees,
                denoise: DenoiseParams {
                    strength: args.denoise_strength,
                    template_window: args.denoise_template_window,
                    search_window: args.denoise_search_window,
                },
                crop_floor_percent: args.crop_height_percent,
            },
        }
    }
}
