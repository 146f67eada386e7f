/// Error types for the HTTP surface.

use crate::pipeline::PipelineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    InputTooSmall { len: usize, min: usize },
    ImageDecode(String),
    Inference(String),
    BadRequest(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InputTooSmall { len, min } => {
                write!(f, "Empty or too-small image: {len} bytes (minimum {min})")
            }
            AppError::ImageDecode(msg) => write!(f, "Invalid image data: {msg}"),
            AppError::Inference(msg) => write!(f, "Inference error: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InputTooSmall { .. } | AppError::ImageDecode(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Inference(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {err}"))
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InputTooSmall { len, min } => AppError::InputTooSmall { len, min },
            PipelineError::Decode(msg) => AppError::ImageDecode(msg),
            PipelineError::Inference(msg) => AppError::Inference(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server faults keep their detail in the log only.
        let message = match &self {
            AppError::Inference(detail) => {
                tracing::error!(%detail, "inference failed");
                "Inference failed".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                "Internal server error".to_string()
            }
            client_fault => {
                tracing::warn!(status = status.as_u16(), "{client_fault}");
                client_fault.to_string()
            }
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
