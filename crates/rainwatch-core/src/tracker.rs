//! The episode tracker: one object, one lock, every event.
//!
//! [`EpisodeTracker`] owns the state machine, the broadcast timer, and
//! the observer registry behind a single [`tokio::sync::Mutex`]. Signal
//! handling, timer ticks, and observer connect/disconnect each take that
//! lock for their whole duration, so no two events ever interleave on the
//! shared state. Storage I/O happens on a spawned task and never holds the
//! lock.
//!
//! The timer task only holds a [`Weak`] reference back to the tracker, so
//! dropping the last [`Arc`] tears everything down. Once
//! [`EpisodeTracker::shutdown`] has run the timer stays disarmed; signals
//! that drain in afterwards still move the state machine.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::{self, Clock, ClockError};
use crate::episode::{EpisodeEvent, EpisodeMachine};
use crate::fanout::{Observer, ObserverId, ObserverRegistry};
use crate::messages::LiveMessage;
use crate::store::{self, EpisodeStore};
use crate::ticker::BroadcastLoop;

/// Default cadence of live duration updates.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct TrackerState {
    machine: EpisodeMachine,
    ticker: BroadcastLoop,
    observers: ObserverRegistry,
    shutting_down: bool,
}

/// Serialized owner of all live rain state.
pub struct EpisodeTracker {
    state: Mutex<TrackerState>,
    store: Arc<dyn EpisodeStore>,
}

impl EpisodeTracker {
    /// Create an idle tracker with no observers.
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn EpisodeStore>,
        tick_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(TrackerState {
                machine: EpisodeMachine::new(clock),
                ticker: BroadcastLoop::new(tick_interval),
                observers: ObserverRegistry::new(),
                shutting_down: false,
            }),
            store,
        })
    }

    /// Process one sensor reading.
    ///
    /// On a start edge the duration timer is armed and the start frame is
    /// broadcast. On an end edge the timer is disarmed, the completed
    /// record is dispatched to storage, and the end frame is broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] if an edge fired but the clock failed. No
    /// state changes in that case.
    pub async fn on_signal(
        self: &Arc<Self>,
        raining: bool,
    ) -> Result<Option<EpisodeEvent>, ClockError> {
        let mut state = self.state.lock().await;
        let event = state.machine.on_signal(raining)?;

        match &event {
            Some(EpisodeEvent::Started { started_at }) => {
                if state.shutting_down {
                    debug!("Shutdown in progress, duration timer left disarmed");
                } else {
                    let tracker = Arc::downgrade(self);
                    state.ticker.arm(move || tick_weak(tracker.clone()));
                }
                let report = state.observers.broadcast(&LiveMessage::raining(started_at, 0));
                info!(
                    started_at = %clock::format_display(started_at),
                    observers = report.delivered,
                    "Rain started"
                );
            }
            Some(EpisodeEvent::Ended(episode)) => {
                state.ticker.disarm();
                store::dispatch(Arc::clone(&self.store), episode.to_record());
                let report = state.observers.broadcast(&LiveMessage::stopped(episode));
                info!(
                    started_at = %clock::format_display(&episode.started_at),
                    ended_at = %clock::format_display(&episode.ended_at),
                    duration = episode.duration_secs,
                    observers = report.delivered,
                    "Rain stopped"
                );
            }
            None => debug!(raining, "Signal did not change episode state"),
        }

        Ok(event)
    }

    /// Broadcast one duration update if an episode is active.
    ///
    /// Returns the duration sent, or `None` when idle.
    pub async fn tick(&self) -> Option<u64> {
        let mut state = self.state.lock().await;
        let started_at = state.machine.started_at()?;
        let duration = state.machine.current_duration();
        let report = state
            .observers
            .broadcast(&LiveMessage::duration_update(&started_at, duration));
        debug!(duration, delivered = report.delivered, "Duration update broadcast");
        Some(duration)
    }

    /// Seconds since the active episode began, or 0 when idle.
    pub async fn current_duration(&self) -> u64 {
        self.state.lock().await.machine.current_duration()
    }

    /// Register an observer. A late joiner immediately receives the
    /// current episode status.
    pub async fn register(&self, observer: Box<dyn Observer>) -> ObserverId {
        let mut state = self.state.lock().await;
        let id = state.observers.register(observer);
        if let Some(started_at) = state.machine.started_at() {
            let snapshot = LiveMessage::raining(&started_at, state.machine.current_duration());
            state.observers.send_to(id, &snapshot);
        }
        id
    }

    /// Remove an observer. Removing an unknown observer is a no-op.
    pub async fn unregister(&self, id: ObserverId) -> bool {
        self.state.lock().await.observers.unregister(id)
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.state.lock().await.observers.len()
    }

    /// Whether the duration timer is running.
    pub async fn is_ticking(&self) -> bool {
        self.state.lock().await.ticker.is_armed()
    }

    /// Whether an episode is in progress.
    pub async fn is_raining(&self) -> bool {
        self.state.lock().await.machine.is_active()
    }

    /// Disarm the duration timer ahead of process shutdown. The timer is
    /// never re-armed afterwards.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.shutting_down = true;
        if state.ticker.disarm() {
            info!("Duration broadcast loop stopped for shutdown");
        }
    }
}

impl std::fmt::Debug for EpisodeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeTracker").finish_non_exhaustive()
    }
}

async fn tick_weak(tracker: Weak<EpisodeTracker>) {
    if let Some(tracker) = tracker.upgrade() {
        tracker.tick().await;
    }
}
