//! Axum router construction.
//!
//! Assembles the sensor ingest route, the history pass-through, and the
//! observer `WebSocket` into a single [`Router`] with permissive CORS so
//! browser dashboards on other origins can connect.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` and `GET /ws` -- observer `WebSocket`
/// - `POST /rain` -- sensor reading
/// - `GET /history` -- stored episodes
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws::ws_observer))
        .route("/ws", get(ws::ws_observer))
        .route("/rain", post(handlers::post_rain))
        .route("/history", get(handlers::get_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
