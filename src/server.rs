use crate::config::Config;
use crate::engine::{LazyRecognizer, TextRecognizer};
use crate::engines;
use crate::error::OcrError;
use crate::loader;
use crate::preprocessing::{Pipeline, PreprocessingReport};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<Config>,
    /// Bounds how many images are decoded and processed at once
    pub permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            pipeline: Arc::new(Pipeline::new(config.pipeline.clone())),
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            config: Arc::new(config),
        }
    }
}

/// OCR request: an image already present on the server
#[derive(Debug, Deserialize)]
pub struct OcrRequest {
    pub image_path: String,
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub text: String,
    pub elapsed_seconds: f64,
    pub engine: String,
    pub preprocessing: PreprocessingReport,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub engine: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
///
/// The listener is bound before the engine loads; `/health` reports
/// `initializing` and `/ocr` answers 503 until the engine is installed.
/// Failing to initialize the engine stops the server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let recognizer = Arc::new(LazyRecognizer::new(engines::DEFAULT_ENGINE));
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(config, recognizer.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    let serve = async { axum::serve(listener, app).await.map_err(anyhow::Error::from) };
    let warmup = async {
        let engine = tokio::task::spawn_blocking(engines::default_recognizer)
            .await
            .map_err(|e| OcrError::InitializationError(e.to_string()))??;
        recognizer.install(engine);
        tracing::info!("OCR engine ready: {}", recognizer.name());
        Ok::<_, anyhow::Error>(())
    };
    tokio::try_join!(serve, warmup)?;

    Ok(())
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    payload: Result<Json<OcrRequest>, JsonRejection>,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();
    let Json(request) = payload.map_err(|e| OcrError::InvalidRequest(e.body_text()))?;

    if !state.recognizer.is_ready() {
        return Err(OcrError::NotReady);
    }

    let path = loader::validate_image_path(Path::new(&request.image_path), &state.config)?;
    tracing::info!("OCR request received for {}", path.display());

    let permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| OcrError::Internal(format!("Concurrency limiter closed: {}", e)))?;

    let pipeline = state.pipeline.clone();
    let recognizer = state.recognizer.clone();
    let (text, report) = tokio::task::spawn_blocking(move || -> Result<_, OcrError> {
        let _permit = permit;
        let image = loader::load_image(&path)?;
        let result = pipeline.process(image)?;
        tracing::info!(
            "Preprocessed {}x{} -> {}x{} in {}ms",
            result.report.original_dimensions.0,
            result.report.original_dimensions.1,
            result.image.width(),
            result.image.height(),
            result.report.total_time_ms
        );
        let text = recognizer.recognize(&result.image)?;
        Ok((text, result.report))
    })
    .await
    .map_err(|e| OcrError::Internal(format!("Processing task failed: {}", e)))??;

    let elapsed = start.elapsed().as_secs_f64();
    tracing::info!(
        "OCR completed in {:.2}s, text length: {}",
        elapsed,
        text.len()
    );

    Ok(Json(OcrResponse {
        text,
        elapsed_seconds: (elapsed * 1000.0).round() / 1000.0,
        engine: state.recognizer.name().to_string(),
        preprocessing: report,
    }))
}

/// Handle health check requests
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.recognizer.is_ready() {
        "healthy"
    } else {
        "initializing"
    };
    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.recognizer.name().to_string(),
    })
}
