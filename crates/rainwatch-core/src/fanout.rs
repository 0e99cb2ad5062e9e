//! Observer registry and per-observer fan-out.
//!
//! Every connected observer sits behind the [`Observer`] trait. In the
//! server an observer is a [`ChannelObserver`]: a bounded queue drained by
//! the observer's `WebSocket` task, so delivery never blocks the caller.
//!
//! Delivery is independent per observer. A closed observer is skipped and
//! pruned. A failed delivery is logged and not retried; the next tick
//! carries a freshly computed duration, so a missed frame self-corrects.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::messages::LiveMessage;

/// Identifier handed out on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a single delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The observer's transport is gone.
    #[error("observer channel closed")]
    Closed,

    /// The observer is not keeping up; this frame was dropped.
    #[error("observer queue full")]
    Full,
}

/// A live listener that receives serialized frames.
pub trait Observer: Send + Sync {
    /// Whether the transport is still open. Closed observers are skipped.
    fn is_open(&self) -> bool;

    /// Hand one JSON frame to the observer without blocking.
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError>;
}

/// Observer backed by a bounded [`mpsc`] queue.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<String>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end its transport drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.to_owned()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Outcome of one [`ObserverRegistry::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Observers that accepted the frame.
    pub delivered: usize,
    /// Observers skipped because their transport was closed.
    pub skipped: usize,
    /// Observers whose delivery failed.
    pub failed: usize,
}

/// The set of currently connected observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: BTreeMap<ObserverId, Box<dyn Observer>>,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer and return its identifier.
    pub fn register(&mut self, observer: Box<dyn Observer>) -> ObserverId {
        let id = ObserverId::new();
        self.observers.insert(id, observer);
        debug!(observer = %id, total = self.observers.len(), "Observer registered");
        id
    }

    /// Remove an observer. Returns `false` if it was already gone.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            debug!(observer = %id, total = self.observers.len(), "Observer unregistered");
        }
        removed
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Send a frame to one observer. Returns whether it was accepted.
    pub fn send_to(&self, id: ObserverId, message: &LiveMessage) -> bool {
        let Some(observer) = self.observers.get(&id) else {
            return false;
        };
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(observer = %id, error = %e, "Failed to serialize live message");
                return false;
            }
        };
        if !observer.is_open() {
            return false;
        }
        match observer.deliver(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!(observer = %id, error = %e, "Failed to send message to observer");
                false
            }
        }
    }

    /// Deliver a frame to every registered observer.
    ///
    /// The frame is serialized once. Closed observers are skipped and
    /// pruned, observers whose channel turned out closed mid-send are
    /// pruned too. Never fails: every problem is logged and counted in the
    /// returned [`FanoutReport`].
    pub fn broadcast(&mut self, message: &LiveMessage) -> FanoutReport {
        let mut report = FanoutReport::default();
        if self.observers.is_empty() {
            return report;
        }

        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to serialize live message, broadcast skipped");
                return report;
            }
        };

        let mut dead = Vec::new();
        for (id, observer) in &self.observers {
            if !observer.is_open() {
                report.skipped = report.skipped.saturating_add(1);
                dead.push(*id);
                continue;
            }
            match observer.deliver(&frame) {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(e) => {
                    warn!(observer = %id, error = %e, "Failed to broadcast to observer");
                    report.failed = report.failed.saturating_add(1);
                    if e == DeliveryError::Closed {
                        dead.push(*id);
                    }
                }
            }
        }

        for id in dead {
            self.unregister(id);
        }
        report
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
