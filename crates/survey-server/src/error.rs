//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::features::responses::commands::SubmitResponseError;
use crate::features::responses::queries::ExportCsvError;
use crate::store::StoreError;

/// Result type alias for server operations
pub type ServerResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<SubmitResponseError> for AppError {
    fn from(err: SubmitResponseError) -> Self {
        match err {
            SubmitResponseError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<ExportCsvError> for AppError {
    fn from(err: ExportCsvError) -> Self {
        match err {
            ExportCsvError::List(e) => AppError::Store(e),
            ExportCsvError::Csv(e) => AppError::Internal(format!("CSV encoding failed: {}", e)),
            ExportCsvError::Io(e) => AppError::Internal(format!("CSV encoding failed: {}", e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
