use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// The only error the preprocessing core raises.
///
/// Every transform after decoding is total; degenerate inputs (blank pages,
/// unreliable skew estimates) fall back to a no-op instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("Could not decode image: {0}")]
    InvalidImage(String),
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to recognize text: {0}")]
    RecognitionError(String),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("Invalid image path: {0}")]
    InvalidPath(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: u64, max: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("OCR engine is still initializing")]
    NotReady,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            OcrError::RecognitionError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_ERROR")
            }
            OcrError::Preprocess(PreprocessError::InvalidImage(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_IMAGE")
            }
            OcrError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "INVALID_PATH"),
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "ENGINE_NOT_READY"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
