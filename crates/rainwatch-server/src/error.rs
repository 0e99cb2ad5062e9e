//! Error types for the HTTP layer.
//!
//! [`ApiError`] converts core failures into JSON responses via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rainwatch_core::{ClockError, StoreError};

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The clock failed while processing a sensor signal.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// The history store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");

        let body = match &self {
            Self::Clock(_) => serde_json::json!({
                "error": "Internal server error",
            }),
            Self::Storage(e) => serde_json::json!({
                "error": "Database error",
                "details": e.to_string(),
            }),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}
