//! Shared application state for the HTTP and `WebSocket` handlers.

use std::sync::Arc;

use rainwatch_core::{EpisodeStore, EpisodeTracker};

/// Capacity of each observer's outbound frame queue.
///
/// A `WebSocket` client that falls this many frames behind misses frames
/// until it catches up; every tick carries the full duration, so nothing
/// is lost for good.
pub const OBSERVER_QUEUE_CAPACITY: usize = 32;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The single owner of live rain state.
    pub tracker: Arc<EpisodeTracker>,
    /// Storage used for the history pass-through.
    pub store: Arc<dyn EpisodeStore>,
}

impl AppState {
    /// Create application state around a tracker and its store.
    pub const fn new(tracker: Arc<EpisodeTracker>, store: Arc<dyn EpisodeStore>) -> Self {
        Self { tracker, store }
    }
}
