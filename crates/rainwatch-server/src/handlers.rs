//! REST endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/rain` | Sensor reading (`{"isRaining": 0 or 1}`) |
//! | `GET` | `/history` | Stored episodes, newest first |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rainwatch_core::RainSignal;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /rain`.
///
/// Values other than `0` and `1` are rejected by the JSON extractor with
/// `422 Unprocessable Entity` before reaching the tracker.
#[derive(Debug, serde::Deserialize)]
pub struct RainReport {
    /// Current sensor reading.
    #[serde(rename = "isRaining")]
    pub is_raining: RainSignal,
}

/// Feed one sensor reading into the episode tracker.
///
/// # Route
///
/// `POST /rain`
pub async fn post_rain(
    State(state): State<Arc<AppState>>,
    Json(report): Json<RainReport>,
) -> Result<impl IntoResponse, ApiError> {
    let raining = report.is_raining.is_raining();
    tracing::debug!(raining, "Sensor reading received");
    state.tracker.on_signal(raining).await?;
    Ok((StatusCode::OK, "OK"))
}

/// Return every stored episode, newest first.
///
/// # Route
///
/// `GET /history`
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Fetching rain history");
    let entries = state.store.history().await?;
    tracing::info!(count = entries.len(), "Fetched rain history");
    Ok(Json(entries))
}
