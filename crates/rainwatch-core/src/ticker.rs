//! Fixed-cadence live duration timer.
//!
//! [`BroadcastLoop`] owns at most one background task. Arming an armed
//! loop and disarming a disarmed loop are both no-ops. The first tick
//! fires one full period after arming.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A single re-armable interval timer.
#[derive(Debug)]
pub struct BroadcastLoop {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl BroadcastLoop {
    /// Create a disarmed loop that will tick every `period`.
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    /// Whether a timer task is currently running.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start calling `on_tick` every period. Returns `false` if already armed.
    ///
    /// `on_tick` handles its own failures; the loop keeps going no matter
    /// what a tick does.
    pub fn arm<F, Fut>(&mut self, mut on_tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_armed() {
            debug!("Broadcast loop already armed");
            return false;
        }

        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                on_tick().await;
            }
        }));
        debug!(period = ?period, "Broadcast loop armed");
        true
    }

    /// Stop the timer. Returns `false` if it was not armed.
    pub fn disarm(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!("Broadcast loop disarmed");
                true
            }
            None => false,
        }
    }
}

impl Drop for BroadcastLoop {
    fn drop(&mut self) {
        self.disarm();
    }
}
