//! Integration tests for the Rainwatch HTTP endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, except for the shutdown test which binds an
//! ephemeral port.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use rainwatch_core::clock::sensor_offset;
use rainwatch_core::{
    Clock, EpisodeRecord, EpisodeStore, EpisodeTracker, HistoryEntry, ManualClock, MemoryStore,
    StoreError,
};
use rainwatch_server::{AppState, ServerConfig, build_router, serve_until};
use serde_json::Value;
use tower::ServiceExt;

/// A store whose writes succeed and whose reads always fail.
struct FailingHistory;

#[async_trait]
impl EpisodeStore for FailingHistory {
    async fn save(&self, _record: &EpisodeRecord) -> Result<(), StoreError> {
        Ok(())
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(StoreError::Backend(
            "relation \"rain_history\" does not exist".to_owned(),
        ))
    }
}

struct TestApp {
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
}

fn make_test_app() -> TestApp {
    let start = sensor_offset()
        .unwrap()
        .with_ymd_and_hms(2025, 2, 10, 17, 45, 0)
        .unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let store = Arc::new(MemoryStore::new());
    let tracker = EpisodeTracker::new(
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&store) as Arc<dyn EpisodeStore>,
        Duration::from_secs(1),
    );
    let state = Arc::new(AppState::new(
        tracker,
        Arc::clone(&store) as Arc<dyn EpisodeStore>,
    ));
    TestApp {
        state,
        store,
        clock,
    }
}

fn rain_request(body: &str) -> Request<Body> {
    Request::post("/rain")
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn post_rain(state: &Arc<AppState>, body: &str) -> StatusCode {
    build_router(Arc::clone(state))
        .oneshot(rain_request(body))
        .await
        .unwrap()
        .status()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_rows(store: &MemoryStore, rows: usize) {
    for _ in 0..200 {
        if store.len() >= rows {
            return;
        }
        tokio::task::yield_now().await;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_rain_signal_starts_episode() {
    let app = make_test_app();

    assert_eq!(post_rain(&app.state, r#"{"isRaining":1}"#).await, StatusCode::OK);
    assert!(app.state.tracker.is_raining().await);
    assert!(app.state.tracker.is_ticking().await);
}

#[tokio::test]
async fn test_repeated_rain_signals_are_accepted_noops() {
    let app = make_test_app();

    for _ in 0..3 {
        assert_eq!(post_rain(&app.state, r#"{"isRaining":1}"#).await, StatusCode::OK);
    }
    assert!(app.state.tracker.is_raining().await);
}

#[tokio::test]
async fn test_stop_without_start_is_accepted_noop() {
    let app = make_test_app();

    assert_eq!(post_rain(&app.state, r#"{"isRaining":0}"#).await, StatusCode::OK);
    assert!(!app.state.tracker.is_raining().await);
    tokio::task::yield_now().await;
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_out_of_range_signal_is_rejected() {
    let app = make_test_app();

    let status = post_rain(&app.state, r#"{"isRaining":2}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!app.state.tracker.is_raining().await);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = make_test_app();

    let status = post_rain(&app.state, "not json").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_full_episode_is_stored_and_listed() {
    let app = make_test_app();

    post_rain(&app.state, r#"{"isRaining":1}"#).await;
    app.clock.advance_secs(95);
    post_rain(&app.state, r#"{"isRaining":0}"#).await;
    wait_for_rows(&app.store, 1).await;

    assert!(!app.state.tracker.is_ticking().await);
    assert_eq!(app.state.tracker.current_duration().await, 0);

    let response = build_router(Arc::clone(&app.state))
        .oneshot(Request::get("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["start_time"], "10/02/2025 17:45:00");
    assert_eq!(rows[0]["end_time"], "10/02/2025 17:46:35");
    assert_eq!(rows[0]["duration"], 95);
}

#[tokio::test]
async fn test_storage_outage_does_not_affect_live_state() {
    let app = make_test_app();
    app.store.set_failing(true);

    post_rain(&app.state, r#"{"isRaining":1}"#).await;
    assert_eq!(post_rain(&app.state, r#"{"isRaining":0}"#).await, StatusCode::OK);
    assert!(!app.state.tracker.is_raining().await);

    assert_eq!(post_rain(&app.state, r#"{"isRaining":1}"#).await, StatusCode::OK);
    assert!(app.state.tracker.is_raining().await);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_clock_failure_returns_internal_error() {
    let app = make_test_app();
    app.clock.set_failing(true);

    let response = build_router(Arc::clone(&app.state))
        .oneshot(rain_request(r#"{"isRaining":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Internal server error");

    app.clock.set_failing(false);
    assert_eq!(post_rain(&app.state, r#"{"isRaining":1}"#).await, StatusCode::OK);
    assert!(app.state.tracker.is_raining().await);
}

#[tokio::test]
async fn test_history_database_error() {
    let app = make_test_app();
    let state = Arc::new(AppState::new(
        Arc::clone(&app.state.tracker),
        Arc::new(FailingHistory),
    ));

    let response = build_router(state)
        .oneshot(Request::get("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Database error");
    assert!(json["details"].as_str().unwrap().contains("rain_history"));
}

#[tokio::test]
async fn test_plain_get_on_ws_route_is_not_upgraded() {
    let app = make_test_app();

    let response = build_router(Arc::clone(&app.state))
        .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(!response.status().is_success());
}

#[tokio::test]
async fn test_shutdown_disarms_timer() {
    let app = make_test_app();
    post_rain(&app.state, r#"{"isRaining":1}"#).await;
    assert!(app.state.tracker.is_ticking().await);

    let config = ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        database_url: "postgresql://unused".to_owned(),
        db_max_connections: 1,
        tick_interval: Duration::from_secs(1),
    };
    serve_until(&config, Arc::clone(&app.state), async {})
        .await
        .unwrap();

    assert!(!app.state.tracker.is_ticking().await);
    assert!(app.state.tracker.is_raining().await);

    // Requests still draining after shutdown must not restart the timer.
    assert_eq!(post_rain(&app.state, r#"{"isRaining":0}"#).await, StatusCode::OK);
    assert_eq!(post_rain(&app.state, r#"{"isRaining":1}"#).await, StatusCode::OK);
    assert!(app.state.tracker.is_raining().await);
    assert!(!app.state.tracker.is_ticking().await);
}
