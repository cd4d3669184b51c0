use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use clap::Parser;
use docprep::config::{Args, Config};
use docprep::server::{router, AppState};
use docprep::{LazyRecognizer, OcrError, TextRecognizer};
use image::{GrayImage, Luma};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records the size of every image it is handed
#[derive(Default)]
struct StubRecognizer {
    seen: Mutex<Vec<(u32, u32)>>,
}

impl TextRecognizer for StubRecognizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        self.seen.lock().unwrap().push(image.dimensions());
        Ok("Hello World".to_string())
    }
}

fn test_config(allowed: &[&Path]) -> Config {
    let mut config = Config::from(Args::parse_from(["docprep-server"]));
    config.allowed_image_dirs = allowed.iter().map(|p| p.to_path_buf()).collect();
    config
}

async fn post_ocr(state: AppState, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/ocr")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn ocr_body(path: &Path) -> String {
    serde_json::json!({ "image_path": path }).to_string()
}

fn write_page(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("page.png");
    let page = GrayImage::from_fn(120, 80, |x, y| {
        if (20..60).contains(&y) && y % 10 < 4 && (10..110).contains(&x) {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    page.save(&path).unwrap();
    path
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = AppState::new(test_config(&[]), Arc::new(StubRecognizer::default()));
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["engine"], "stub");
    assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_health_reports_initializing_until_engine_installed() {
    let lazy = Arc::new(LazyRecognizer::new("ocrs"));
    let state = AppState::new(test_config(&[]), lazy.clone());
    let health = || Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = router(state.clone()).oneshot(health()).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "initializing");
    assert_eq!(json["engine"], "ocrs");

    lazy.install(Arc::new(StubRecognizer::default()));

    let response = router(state).oneshot(health()).await.unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["engine"], "stub");
}

#[tokio::test]
async fn test_ocr_before_engine_ready_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_page(dir.path());
    let state = AppState::new(test_config(&[]), Arc::new(LazyRecognizer::new("ocrs")));

    let (status, json) = post_ocr(state, ocr_body(&path)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "ENGINE_NOT_READY");
}

#[tokio::test]
async fn test_ocr_preprocesses_then_recognizes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_page(dir.path());
    let recognizer = Arc::new(StubRecognizer::default());
    let state = AppState::new(test_config(&[dir.path()]), recognizer.clone());

    let (status, json) = post_ocr(state, ocr_body(&path)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["text"], "Hello World");
    assert_eq!(json["engine"], "stub");
    assert_eq!(json["preprocessing"]["mode"], "autoconfig");
    assert_eq!(json["preprocessing"]["original_dimensions"][0], 120);
    assert!(json["elapsed_seconds"].as_f64().unwrap() >= 0.0);

    let seen = recognizer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 120);
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(test_config(&[]), Arc::new(StubRecognizer::default()));

    let (status, json) = post_ocr(state, ocr_body(&dir.path().join("missing.png"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_PATH");
}

#[tokio::test]
async fn test_image_outside_allowed_dirs_is_rejected() {
    let allowed = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let path = write_page(other.path());
    let recognizer = Arc::new(StubRecognizer::default());
    let state = AppState::new(test_config(&[allowed.path()]), recognizer.clone());

    let (status, json) = post_ocr(state, ocr_body(&path)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_PATH");
    assert!(recognizer.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_image_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"definitely not an image").unwrap();
    let state = AppState::new(test_config(&[]), Arc::new(StubRecognizer::default()));

    let (status, json) = post_ocr(state, ocr_body(&path)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_IMAGE");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let state = AppState::new(test_config(&[]), Arc::new(StubRecognizer::default()));

    let (status, json) = post_ocr(state, "{\"path\": 3}".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");
}
