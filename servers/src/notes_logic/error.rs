//! # Application Error
//!
//! Maps orchestrator failures onto HTTP responses with JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lib_notes::StoreError;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by the HTTP handlers.
#[derive(Debug)]
pub struct AppError(pub StoreError);

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::BufferUnavailable(_) | StoreError::DurableRead(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            StoreError::DurableWrite { .. }
            | StoreError::Broadcast(_)
            | StoreError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            StoreError::Validation(_) => {
                warn!("Rejected submission: {}", self.0);
                "Invalid task text"
            }
            StoreError::DurableWrite { .. } => {
                error!("Durable write error: {}", self.0);
                "Note stored in buffer, but archiving failed"
            }
            StoreError::BufferUnavailable(_) => {
                error!("Buffer tier error: {}", self.0);
                "Buffer store is unavailable"
            }
            StoreError::DurableRead(_) => {
                error!("Durable read error: {}", self.0);
                "Archive store is unavailable"
            }
            StoreError::Broadcast(_) | StoreError::Config(_) => {
                error!("Internal error: {}", self.0);
                "Internal server error"
            }
        };
        let body = json!({
            "error": message,
            "error_type": self.0.kind(),
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
